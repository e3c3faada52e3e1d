//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::auth::{DEFAULT_PASSWORD_COST, IpExtractor, hash_password};
use crate::db::{Database, ROLE_ADMIN, ROLE_USER};
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

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
    name = "rotoken",
    about = "JWT authentication server with refresh token rotation"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "rotoken.db")]
    pub database: String,

    /// Path to file containing the base64 JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in milliseconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_MS", default_value = "1800000")]
    pub access_token_ttl_ms: u64,

    /// Refresh token lifetime in milliseconds
    #[arg(long, env = "REFRESH_TOKEN_TTL_MS", default_value = "1209600000")]
    pub refresh_token_ttl_ms: u64,

    /// Omit the Secure attribute on the refresh cookie (for plain HTTP development)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Revoke the active refresh token when an already used one is presented
    #[arg(long, env = "REVOKE_ON_REUSE")]
    pub revoke_on_reuse: bool,

    /// Extra path served without bearer authentication (repeatable)
    #[arg(long = "public-path", value_parser = validate_public_path)]
    pub public_paths: Vec<String>,

    /// Read the client IP from this header (requires running behind a proxy)
    #[arg(long, env = "IP_HEADER", value_enum)]
    pub ip_header: Option<IpExtractor>,

    /// bcrypt work factor for new passwords
    #[arg(long, env = "PASSWORD_COST", default_value_t = DEFAULT_PASSWORD_COST,
        value_parser = clap::value_parser!(u32).range(4..=31))]
    pub password_cost: u32,

    /// Create an admin user (password from ADMIN_PASSWORD) or grant admin to an existing one
    #[arg(long, value_name = "USERNAME")]
    pub create_admin: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn validate_public_path(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("Public path must start with '/': {}", s));
    }

    if s.len() > 1 && s.ends_with('/') {
        return Err(format!("Public path must not end with '/': {}", s));
    }

    if s.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Public path contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Decode a base64 secret and check its length.
pub fn decode_jwt_secret(encoded: &str) -> Result<Vec<u8>, String> {
    let secret = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("JWT secret is not valid base64: {}", e))?;

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(format!(
            "JWT secret is shorter than {} bytes. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        ));
    }

    Ok(secret)
}

/// Load the JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<Vec<u8>> {
    let encoded = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    match decode_jwt_secret(&encoded) {
        Ok(secret) => Some(secret),
        Err(e) => {
            error!("{}", e);
            None
        }
    }
}

/// Build the token codec from the secret and configured lifetimes.
/// Returns None and logs an error if the lifetimes are invalid.
pub fn build_jwt_config(
    secret: &[u8],
    access_token_ttl_ms: u64,
    refresh_token_ttl_ms: u64,
) -> Option<JwtConfig> {
    match JwtConfig::new(
        secret,
        Duration::from_millis(access_token_ttl_ms),
        Duration::from_millis(refresh_token_ttl_ms),
    ) {
        Ok(config) => Some(config),
        Err(e) => {
            error!(error = %e, "Invalid token lifetimes");
            None
        }
    }
}

/// Handle the --create-admin flag: create the admin, or grant admin to an existing user.
pub async fn handle_create_admin(db: &Database, username: &str, password_cost: u32) {
    match db.users().get_by_username(username).await {
        Ok(Some(existing)) => match db.users().grant_role(existing.id, ROLE_ADMIN).await {
            Ok(true) => info!(username = %username, "Granted admin role to existing user"),
            Ok(false) => info!(username = %username, "User is already an admin"),
            Err(e) => {
                error!(error = %e, "Failed to grant admin role");
                std::process::exit(1);
            }
        },
        Ok(None) => {
            let Ok(password) = std::env::var("ADMIN_PASSWORD") else {
                error!("ADMIN_PASSWORD environment variable is required to create an admin");
                std::process::exit(1);
            };
            // SAFETY: We're single-threaded at this point during startup,
            // and no other code is reading this environment variable.
            unsafe { std::env::remove_var("ADMIN_PASSWORD") };

            let hash = match hash_password(password, password_cost).await {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            match db
                .users()
                .create_with_roles(username, &hash, username, &[ROLE_USER, ROLE_ADMIN])
                .await
            {
                Ok(id) => info!(user_id = id, username = %username, "Admin user created"),
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing user");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt: JwtConfig) -> ServerConfig {
    ServerConfig {
        db,
        jwt: Arc::new(jwt),
        secure_cookies: !args.insecure_cookies,
        revoke_on_reuse: args.revoke_on_reuse,
        public_paths: args.public_paths.clone(),
        password_cost: args.password_cost,
        rate_limit: RateLimitConfig::new(args.ip_header),
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
