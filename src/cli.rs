//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::clock::SystemTimeSource;
use crate::db::{ADMIN_ROLE, Database};
use crate::jwt::SigningKey;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Tollgate",
    about = "Stateless bearer-token authentication service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "tollgate.db")]
    pub database: String,

    /// Path to file containing the base64 JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// bcrypt work factor for new password hashes
    #[arg(long, default_value_t = bcrypt::DEFAULT_COST, value_parser = clap::value_parser!(u32).range(4..=31))]
    pub bcrypt_cost: u32,

    /// Grant the ADMIN role to an existing user on startup
    #[arg(long, value_name = "USERNAME")]
    pub grant_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the signing key from environment variable or file.
/// Returns None and logs an error if the key cannot be loaded.
pub fn load_signing_key(jwt_secret_file: Option<&str>) -> Option<SigningKey> {
    if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        decode_signing_key(&secret)
    } else if let Some(path) = jwt_secret_file {
        load_signing_key_file(path)
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        None
    }
}

/// Read a base64 secret from a file. Does not consult the environment.
pub fn load_signing_key_file(path: &str) -> Option<SigningKey> {
    match std::fs::read_to_string(path) {
        Ok(content) => decode_signing_key(&content),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to read JWT secret file");
            None
        }
    }
}

/// Decode a base64 secret, warning when it is shorter than recommended.
pub fn decode_signing_key(secret: &str) -> Option<SigningKey> {
    let key = match SigningKey::from_base64(secret) {
        Ok(key) => key,
        Err(e) => {
            error!(error = %e, "Invalid JWT secret");
            return None;
        }
    };

    if key.len() < MIN_JWT_SECRET_LENGTH {
        warn!(
            "JWT secret decodes to fewer than {} bytes. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
    }

    Some(key)
}

/// Handle the --grant-admin flag. Exits if the user does not exist.
pub async fn handle_grant_admin(db: &Database, username: &str) {
    let user = match db.users().get_by_username(username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            error!(username = %username, "Cannot grant admin: user not found");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Failed to get user");
            std::process::exit(1);
        }
    };

    match db.users().add_role(user.id, ADMIN_ROLE).await {
        Ok(true) => info!(user_id = user.id, "Granted admin role"),
        Ok(false) => info!(user_id = user.id, "User is already an admin"),
        Err(e) => {
            error!(error = %e, "Failed to grant admin role");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(db: Database, signing_key: SigningKey, bcrypt_cost: u32) -> ServerConfig {
    ServerConfig {
        db,
        signing_key,
        time_source: Arc::new(SystemTimeSource),
        bcrypt_cost,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
