//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Errors surfaced by credential authentication, the refresh flow and the
/// authorization extractors.
#[derive(Debug)]
pub enum AuthError {
    /// The user id or username does not resolve to an account
    UnknownUser,
    /// Password does not match the stored hash
    InvalidCredentials,
    /// Refresh token is expired, malformed or signed with another key
    ExpiredRefreshToken,
    /// Refresh was requested while the access token is still valid
    AccessTokenNotExpired,
    /// No valid bearer token on a route that requires one
    NotAuthenticated,
    /// Authenticated, but lacking the authority the route requires
    InsufficientRole,
    DatabaseError,
    HashingError,
    TokenIssueError,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::UnknownUser
            | AuthError::InvalidCredentials
            | AuthError::ExpiredRefreshToken
            | AuthError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AuthError::AccessTokenNotExpired => StatusCode::BAD_REQUEST,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::DatabaseError | AuthError::HashingError | AuthError::TokenIssueError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::UnknownUser => "User not found",
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::ExpiredRefreshToken => "Refresh token has expired",
            AuthError::AccessTokenNotExpired => "Access token has not expired",
            AuthError::NotAuthenticated => "Not authenticated",
            AuthError::InsufficientRole => "Insufficient permissions",
            AuthError::DatabaseError => "Database error",
            AuthError::HashingError => "Failed to verify credentials",
            AuthError::TokenIssueError => "Failed to generate token",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
