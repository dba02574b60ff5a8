use axum::{Json, extract::State, response::IntoResponse};

use blogpost_types::api::{ApiResponse, NavLink, Navbar, Welcome};

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::AuthToken;
use crate::session;

/// GET /api/data
pub async fn welcome() -> impl IntoResponse {
    Json(ApiResponse::ok(Welcome {
        message: "Welcome To Blog Post Application!".to_string(),
    }))
}

/// GET /api/navbar. Signed-in callers get Logout instead of Login/Register.
pub async fn navbar(State(state): State<AppState>, token: AuthToken) -> impl IntoResponse {
    let signed_in = session::resolve(&state.db, token.as_deref()).is_ok();
    Json(ApiResponse::ok(Navbar {
        links: nav_links(signed_in),
    }))
}

fn nav_links(signed_in: bool) -> Vec<NavLink> {
    let mut links = vec![
        ("Home", "/"),
        ("List Blogs", "/listblogs"),
        ("Create Blog", "/createblog"),
    ];
    if signed_in {
        links.push(("Logout", "/logout"));
    } else {
        links.push(("Login", "/login"));
        links.push(("Register", "/register"));
    }

    links
        .into_iter()
        .map(|(name, url)| NavLink {
            name: name.to_string(),
            url: url.to_string(),
        })
        .collect()
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(serde_json::json!({ "status": "ok" })))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route")
}
