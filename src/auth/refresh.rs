//! Access token renewal.

use tracing::{debug, error, info};

use super::errors::AuthError;
use super::state::HasAuthBackend;

/// Issue a new access token for `user_id` once its previous access token has
/// lapsed, provided the refresh token is still valid.
///
/// The refresh token carries no subject, so the caller-supplied `user_id` is
/// trusted as-is. Authorities in the new token come from the user's current
/// roles. The refresh token is not rotated.
pub async fn refresh_access_token<S>(
    state: &S,
    access_token: Option<&str>,
    refresh_token: Option<&str>,
    user_id: i64,
) -> Result<String, AuthError>
where
    S: HasAuthBackend + Sync,
{
    let identity = state
        .db()
        .users()
        .find_identity(user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to get user");
            AuthError::DatabaseError
        })?
        .ok_or(AuthError::UnknownUser)?;

    let jwt = state.jwt();

    if access_token.is_some_and(|token| jwt.is_valid(token)) {
        debug!(user_id, "Refresh requested while access token is still valid");
        return Err(AuthError::AccessTokenNotExpired);
    }

    if !refresh_token.is_some_and(|token| jwt.is_valid(token)) {
        return Err(AuthError::ExpiredRefreshToken);
    }

    let token = jwt
        .mint_access_only(identity.user_id, &identity.authority_claim())
        .map_err(|e| {
            error!(user_id, error = %e, "Failed to create access token");
            AuthError::TokenIssueError
        })?;

    info!(user_id, "Access token refreshed");
    Ok(token)
}
