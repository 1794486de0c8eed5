mod auth;
mod error;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::CredentialHasher;
use crate::db::Database;
use crate::jwt::JwtConfig;

pub use auth::AuthState;
pub use error::{ApiError, ResultExt};
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    hasher: Arc<dyn CredentialHasher>,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
        hasher,
    };

    let users_state = users::UsersState { db, jwt };

    Router::new()
        .nest("/auth", auth::router(auth_state))
        .nest("/api/users", users::router(users_state))
}
