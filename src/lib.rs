pub mod api;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod db;
pub mod jwt;

use api::create_api_router;
use auth::BcryptHasher;
use axum::Router;
use clock::TimeSource;
use db::Database;
use jwt::{JwtConfig, SigningKey};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing and verifying tokens
    pub signing_key: SigningKey,
    /// Clock used for token issue and expiry checks
    pub time_source: Arc<dyn TimeSource>,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::with_time_source(
        &config.signing_key,
        config.time_source.clone(),
    ));
    let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));

    create_api_router(config.db.clone(), jwt, hasher)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}
