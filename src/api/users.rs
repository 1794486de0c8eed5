//! Account endpoints for the authenticated user, plus the admin listing.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, Auth, AuthError};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(current_user).delete(withdraw))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserResponse {
    user_id: i64,
    username: String,
    roles: BTreeSet<String>,
    authorities: BTreeSet<String>,
}

async fn current_user(auth: Auth) -> impl IntoResponse {
    let context = auth.context;
    Json(CurrentUserResponse {
        user_id: context.identity.user_id,
        username: context.identity.username,
        roles: context.identity.roles,
        authorities: context.authorities,
    })
}

/// Delete the caller's account. Outstanding tokens stop resolving.
async fn withdraw(
    State(state): State<UsersState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = auth.context.user_id();

    let deleted = state
        .db
        .users()
        .delete(user_id)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(AuthError::UnknownUser.into());
    }

    info!(user_id, "User withdrew");
    Ok(StatusCode::NO_CONTENT)
}

/// List all users.
async fn list_users(
    State(state): State<UsersState>,
    _auth: Auth<AdminOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;

    Ok(Json(users))
}
