use axum::{
    Json,
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use blogpost_db::DbError;
use blogpost_types::api::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("Email is already registered")]
    DuplicateEmail,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("You do not own this post")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Upload could not be written or removed. The detail is logged, not returned.
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateUsername | Self::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::InvalidToken | Self::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client. Server-side failures get a fixed message.
    fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Failed to store uploaded file".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(ApiResponse::error(self.public_message()))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate { column } if column == "username" => Self::DuplicateUsername,
            DbError::Duplicate { column } if column == "email" => Self::DuplicateEmail,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DuplicateUsername.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DuplicateEmail.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Post").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Storage("disk full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::Internal("no such table: posts".into());
        assert_eq!(err.public_message(), "Internal server error");

        let err = ApiError::Storage("/var/uploads: permission denied".into());
        assert!(!err.public_message().contains("/var/uploads"));
    }

    #[test]
    fn duplicate_columns_map_to_named_errors() {
        let err: ApiError = DbError::Duplicate {
            column: "username".into(),
        }
        .into();
        assert!(matches!(err, ApiError::DuplicateUsername));

        let err: ApiError = DbError::Duplicate {
            column: "email".into(),
        }
        .into();
        assert!(matches!(err, ApiError::DuplicateEmail));

        let err: ApiError = DbError::LockPoisoned.into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
