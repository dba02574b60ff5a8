use axum::{
    Extension, Json,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;

use blogpost_types::api::ApiResponse;

use crate::AppState;
use crate::error::ApiError;
use crate::forms::{EditForm, PostForm};
use crate::middleware::{AuthToken, Session};
use crate::{gate, posts, views};

type IdPath = WithRejection<Path<i64>, ApiError>;

/// GET /api/blogs, newest first.
pub async fn list_blogs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = posts::list(&state.db)?;
    Ok(Json(ApiResponse::ok(views::posts(rows))))
}

/// GET /api/blog/{id}
pub async fn get_blog(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts::get(&state.db, id)?;
    Ok(Json(ApiResponse::ok(views::post(post))))
}

/// GET /api/users/{id}/blogs
pub async fn list_user_blogs(
    State(state): State<AppState>,
    WithRejection(Path(owner_id), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.get_account_by_id(owner_id)?.is_none() {
        return Err(ApiError::NotFound("Account"));
    }
    let rows = posts::list_by_owner(&state.db, owner_id)?;
    Ok(Json(ApiResponse::ok(views::posts(rows))))
}

/// POST /api/submit: multipart `title`, `body`, optional `file`.
/// The owner is always the authenticated caller.
pub async fn submit_blog(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let form = PostForm::from_multipart(multipart).await?;
    let post = posts::create_from_form(&state, session.account.id, form).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(views::post(post)))))
}

/// PUT /api/blog/{id}/edit
///
/// The body is only read once the caller has passed the gate.
pub async fn edit_blog(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
    token: AuthToken,
    req: Request,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts::get(&state.db, id)?;
    gate::authorize_mutation(&state.db, token.as_deref(), &post, state.features)?;

    let EditForm(form) = EditForm::from_request(req, &state).await?;
    let updated = posts::update(&state, &post, form).await?;
    Ok(Json(ApiResponse::ok(views::post(updated))))
}

/// DELETE /api/blog/{id}
pub async fn delete_blog(
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
    token: AuthToken,
) -> Result<impl IntoResponse, ApiError> {
    let post = posts::get(&state.db, id)?;
    gate::authorize_mutation(&state.db, token.as_deref(), &post, state.features)?;

    posts::delete(&state, &post).await?;
    Ok(Json(ApiResponse::message("Post deleted")))
}
