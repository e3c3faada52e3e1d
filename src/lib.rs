pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod rate_limit;

use api::create_api_router;
use auth::{RequestAuthenticator, ServerSettings, TokenService, authenticate_request};
use axum::{Router, middleware};
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token codec holding the signing key and token lifetimes
    pub jwt: Arc<JwtConfig>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Revoke the active refresh token when an old one is replayed
    pub revoke_on_reuse: bool,
    /// Paths served without looking at the bearer token, on top of the defaults
    pub public_paths: Vec<String>,
    /// bcrypt work factor for new passwords
    pub password_cost: u32,
    /// Per-IP limits for login and signup
    pub rate_limit: RateLimitConfig,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let tokens = TokenService::new(config.db.clone(), config.jwt.clone())
        .with_revoke_on_reuse(config.revoke_on_reuse);

    let settings = Arc::new(ServerSettings {
        secure_cookies: config.secure_cookies,
    });

    let authenticator = RequestAuthenticator::new(config.jwt.clone(), &config.public_paths);

    create_api_router(
        tokens,
        settings,
        Arc::new(config.rate_limit.clone()),
        config.password_cost,
    )
    .layer(middleware::from_fn_with_state(
        authenticator,
        authenticate_request,
    ))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database) {
    cleanup::run_cleanup(db).await;
    cleanup::spawn_cleanup_scheduler(db.clone());
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    // Run cleanup tasks on startup
    init_cleanup(&config.db).await;

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
