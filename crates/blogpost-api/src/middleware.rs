use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use blogpost_db::AccountRow;

use crate::AppState;
use crate::error::ApiError;
use crate::gate;

/// The authenticated caller, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct Session {
    pub account: AccountRow,
}

/// Session token from the `Authorization` header.
///
/// The header carries the raw token. A `Bearer` scheme, in any case, is
/// tolerated and stripped; a bare scheme carries no token.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

/// Optional raw token, for handlers that run the gate themselves.
pub struct AuthToken(pub Option<String>);

impl AuthToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(token_from_headers(&parts.headers).map(str::to_string)))
    }
}

/// Resolve the session token and attach the [`Session`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(req.headers()).ok_or(ApiError::Unauthenticated)?;
    let account = gate::authenticate(&state.db, Some(token))?;

    req.extensions_mut().insert(Session { account });
    Ok(next.run(req).await)
}
