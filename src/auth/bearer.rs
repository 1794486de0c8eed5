//! Header contract for bearer authentication and refresh requests.

use axum::http::{HeaderMap, header};

/// Scheme prefix of the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Header carrying the refresh token on refresh requests.
pub const REFRESH_HEADER: &str = "refresh";

/// Header carrying the target user id on refresh requests.
pub const USER_ID_HEADER: &str = "userid";

/// Extract the bearer token from the `Authorization` header.
/// Missing header, wrong scheme or empty token all yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Read a header as trimmed, non-empty text.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    (!value.is_empty()).then_some(value)
}
