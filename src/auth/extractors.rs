//! Axum extractors for authentication and authorization.
//!
//! Authentication (`authenticate_request`, `OptionalAuth`) never rejects a
//! request for a missing or invalid token; it only produces an anonymous
//! context. Rejection belongs to the authorization layer (`Auth<R>`), which
//! inspects that context.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use tracing::{debug, error, warn};

use super::bearer::bearer_token;
use super::errors::AuthError;
use super::state::HasAuthBackend;
use super::types::{ADMIN_AUTHORITY, AuthenticatedContext};

/// Resolve the bearer token of a request into an authenticated context.
///
/// Returns `Ok(None)` when there is no token or it does not validate. Fails
/// only when a valid token names a user that no longer exists, or when the
/// user store is unreachable.
pub async fn authenticate_request<S>(
    headers: &HeaderMap,
    state: &S,
) -> Result<Option<AuthenticatedContext>, AuthError>
where
    S: HasAuthBackend + Sync,
{
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    let claims = match state.jwt().validate(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(reason = %e, "Bearer token rejected");
            return Ok(None);
        }
    };

    // Refresh tokens verify too, but carry neither claim.
    let (Some(subject), Some(auth_claim)) = (claims.sub, claims.auth) else {
        debug!("Bearer token has no subject or authorities");
        return Ok(None);
    };

    let Ok(user_id) = subject.parse::<i64>() else {
        debug!(subject = %subject, "Bearer token subject is not a user id");
        return Ok(None);
    };

    let identity = state
        .db()
        .users()
        .find_identity(user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to get user");
            AuthError::DatabaseError
        })?
        .ok_or_else(|| {
            warn!(user_id, "Token subject no longer exists");
            AuthError::UnknownUser
        })?;

    Ok(Some(AuthenticatedContext::new(identity, &auth_claim)))
}

/// Authentication extractor. Never rejects for a missing or invalid token;
/// yields `None` for anonymous requests.
pub struct OptionalAuth(pub Option<AuthenticatedContext>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(&parts.headers, state)
            .await
            .map(OptionalAuth)
    }
}

/// Authorization rule checked by `Auth<R>`.
pub trait RoleConstraint {
    fn allows(context: &AuthenticatedContext) -> bool;
}

/// Any authenticated user.
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_context: &AuthenticatedContext) -> bool {
        true
    }
}

/// Users currently holding `ROLE_ADMIN`.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(context: &AuthenticatedContext) -> bool {
        context.has_authority(ADMIN_AUTHORITY)
    }
}

/// Authorization extractor: rejects anonymous requests with 401 and requests
/// whose user does not satisfy `R` with 403.
pub struct Auth<R = AnyRole> {
    pub context: AuthenticatedContext,
    _constraint: PhantomData<fn() -> R>,
}

impl<S, R> FromRequestParts<S> for Auth<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = authenticate_request(&parts.headers, state)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        if !R::allows(&context) {
            debug!(user_id = context.user_id(), "Insufficient role");
            return Err(AuthError::InsufficientRole);
        }

        Ok(Auth {
            context,
            _constraint: PhantomData,
        })
    }
}
