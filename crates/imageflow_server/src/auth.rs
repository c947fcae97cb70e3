//! Bearer API key check for management routes.

use crate::error::HttpError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Pull the key out of `Authorization: Bearer <key>`.
///
/// The scheme is matched case-insensitively and any run of whitespace may
/// separate it from the key.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.get(..6)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let rest = &value[6..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Reject requests without a valid API key.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let Some(token) = extract_bearer_token(req.headers()).map(str::to_string) else {
        tracing::debug!("Rejected {} {}: missing bearer token", req.method(), req.uri().path());
        return Err(HttpError::Unauthorized);
    };
    if !state.db.api_keys.validate(&token).await? {
        tracing::warn!("Rejected {} {}: unknown API key", req.method(), req.uri().path());
        return Err(HttpError::Unauthorized);
    }
    Ok(next.run(req).await)
}
