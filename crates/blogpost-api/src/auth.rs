use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::info;

use blogpost_types::api::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::{AuthToken, Session};
use crate::{credentials, session, views};

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let account = credentials::register(&state.db, &req.username, &req.email, &req.password)?;
    let token = session::issue(&state.db, &account)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(AuthResponse {
            token,
            account: views::account(&account),
        })),
    ))
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let account = credentials::verify(&state.db, &req.username, &req.password)?;
    let token = session::issue(&state.db, &account)?;
    info!("Account {} logged in", account.id);

    Ok(Json(ApiResponse::ok(AuthResponse {
        token,
        account: views::account(&account),
    })))
}

/// POST /api/logout. Needs a token header, but an already-dead token still
/// succeeds so that logging out twice is harmless.
pub async fn logout(
    State(state): State<AppState>,
    token: AuthToken,
) -> Result<impl IntoResponse, ApiError> {
    let token = token.as_deref().ok_or(ApiError::Unauthenticated)?;
    session::revoke(&state.db, token)?;
    Ok(Json(ApiResponse::message("Logged out")))
}

/// GET /api/me
pub async fn me(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(ApiResponse::ok(views::account(&session.account)))
}
