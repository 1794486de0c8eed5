//! Username/password verification.

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use super::errors::AuthError;
use super::types::Identity;
use crate::db::UserStore;

/// One-way password hashing.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, raw: &str) -> Result<String, HashError>;
    /// Constant-time comparison of `raw` against a stored hash.
    fn verify(&self, raw: &str, encoded: &str) -> Result<bool, HashError>;
}

#[derive(Debug)]
pub struct HashError(String);

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password hashing failed: {}", self.0)
    }
}

impl std::error::Error for HashError {}

/// bcrypt-backed hasher.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, raw: &str) -> Result<String, HashError> {
        bcrypt::hash(raw, self.cost).map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, raw: &str, encoded: &str) -> Result<bool, HashError> {
        bcrypt::verify(raw, encoded).map_err(|e| HashError(e.to_string()))
    }
}

/// Hash a password on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(
    hasher: Arc<dyn CredentialHasher>,
    raw: String,
) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hasher.hash(&raw))
        .await
        .map_err(|e| HashError(e.to_string()))?
}

/// Verify a password on the blocking pool.
pub async fn verify_password(
    hasher: Arc<dyn CredentialHasher>,
    raw: String,
    encoded: String,
) -> Result<bool, HashError> {
    tokio::task::spawn_blocking(move || hasher.verify(&raw, &encoded))
        .await
        .map_err(|e| HashError(e.to_string()))?
}

/// Verify a username/password pair and return the matching identity.
pub async fn authenticate(
    users: &UserStore,
    hasher: Arc<dyn CredentialHasher>,
    username: &str,
    password: &str,
) -> Result<Identity, AuthError> {
    let user = users
        .get_by_username(username)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to get user");
            AuthError::DatabaseError
        })?
        .ok_or(AuthError::UnknownUser)?;

    let matches = verify_password(hasher, password.to_string(), user.password_hash.clone())
        .await
        .map_err(|e| {
            error!(user_id = user.id, error = %e, "Failed to verify password");
            AuthError::HashingError
        })?;

    if !matches {
        warn!(user_id = user.id, "Password mismatch");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user.into())
}
