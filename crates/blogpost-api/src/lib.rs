pub mod auth;
pub mod blogs;
pub mod credentials;
pub mod error;
pub mod forms;
pub mod gate;
pub mod meta;
pub mod middleware;
pub mod posts;
pub mod session;
pub mod storage;
pub mod views;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use blogpost_db::Database;

use crate::middleware::require_auth;
use crate::storage::Storage;

/// Where stored images are served from.
pub const UPLOADS_ROUTE: &str = "/static/uploads";

/// Room for the non-file multipart fields on top of the image size limit.
const BODY_OVERHEAD: usize = 1024 * 1024;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub features: Features,
}

/// Runtime switches for optional behavior.
#[derive(Debug, Clone, Copy)]
pub struct Features {
    /// Accept image attachments on submit and edit.
    pub uploads_enabled: bool,
    /// Only a post's owner may edit or delete it. When off, any signed-in account may.
    pub enforce_ownership: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            uploads_enabled: true,
            enforce_ownership: true,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(meta::health))
        .route("/api/data", get(meta::welcome))
        .route("/api/navbar", get(meta::navbar))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/blogs", get(blogs::list_blogs))
        .route("/api/blog/{id}", get(blogs::get_blog).delete(blogs::delete_blog))
        .route("/api/blog/{id}/edit", put(blogs::edit_blog))
        .route("/api/users/{id}/blogs", get(blogs::list_user_blogs));

    let protected_routes = Router::new()
        .route("/api/me", get(auth::me))
        .route("/api/submit", post(blogs::submit_blog))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(state.storage.dir()))
        .fallback(meta::not_found)
        .layer(DefaultBodyLimit::max(state.storage.max_bytes() + BODY_OVERHEAD))
        .with_state(state)
}
