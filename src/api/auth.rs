//! Sign-up, login, token refresh and logout.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::error::{ApiError, ResultExt};
use crate::auth::{
    AuthError, CredentialHasher, OptionalAuth, REFRESH_HEADER, USER_ID_HEADER, authenticate,
    bearer_token, hash_password, header_str, refresh_access_token,
};
use crate::db::{DEFAULT_ROLE, Database};
use crate::impl_has_auth_backend;
use crate::jwt::{JwtConfig, TokenPair};

const MAX_USERNAME_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;
// bcrypt only looks at the first 72 bytes.
const MAX_PASSWORD_LEN: usize = 72;

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub hasher: Arc<dyn CredentialHasher>,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", delete(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    user_id: i64,
    username: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(flatten)]
    tokens: TokenPair,
    user_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }

    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password cannot exceed 72 bytes"));
    }
    Ok(())
}

fn create_user_error(e: sqlx::Error) -> ApiError {
    if e
        .as_database_error()
        .is_some_and(|d| d.is_unique_violation())
    {
        return ApiError::conflict("Username is already taken");
    }
    ApiError::db_error("Failed to create user", e)
}

async fn sign_up(
    State(state): State<AuthState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    validate_username(username)?;
    validate_password(&payload.password)?;

    let available = state
        .db
        .users()
        .is_username_available(username)
        .await
        .db_err("Failed to check username availability")?;

    if !available {
        return Err(ApiError::conflict("Username is already taken"));
    }

    let password_hash = hash_password(state.hasher.clone(), payload.password)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            ApiError::internal("Failed to create user")
        })?;

    // A concurrent sign-up can still take the name between the check and the insert
    let user_id = state
        .db
        .users()
        .create(username, &password_hash, &[DEFAULT_ROLE])
        .await
        .map_err(create_user_error)?;

    info!(user_id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id,
            username: username.to_string(),
        }),
    ))
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = authenticate(
        &state.db.users(),
        state.hasher.clone(),
        payload.username.trim(),
        &payload.password,
    )
    .await
    .map_err(|e| match e {
        // Don't reveal which usernames exist
        AuthError::UnknownUser => AuthError::InvalidCredentials,
        other => other,
    })?;

    let tokens = state
        .jwt
        .mint_pair(identity.user_id, &identity.authority_claim())
        .map_err(|e| {
            error!(user_id = identity.user_id, error = %e, "Failed to create token pair");
            AuthError::TokenIssueError
        })?;

    info!(user_id = identity.user_id, "User logged in");

    Ok(Json(LoginResponse {
        tokens,
        user_id: identity.user_id,
    }))
}

async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = header_str(&headers, USER_ID_HEADER)
        .ok_or_else(|| ApiError::bad_request("Missing userId header"))?
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request("Invalid userId header"))?;

    let access_token = refresh_access_token(
        &state,
        bearer_token(&headers),
        header_str(&headers, REFRESH_HEADER),
        user_id,
    )
    .await?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Tokens are stateless; the client discards them. Always succeeds.
async fn logout(auth: Result<OptionalAuth, AuthError>) -> StatusCode {
    if let Ok(OptionalAuth(Some(context))) = auth {
        info!(user_id = context.user_id(), "User logged out");
    }
    StatusCode::OK
}
