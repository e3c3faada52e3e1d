use std::net::SocketAddr;

use clap::Parser;
use rotoken::cli::{
    Args, build_config, build_jwt_config, handle_create_admin, init_logging, load_jwt_secret,
    open_database,
};
use rotoken::{create_app, init_cleanup};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(jwt) = build_jwt_config(
        &jwt_secret,
        args.access_token_ttl_ms,
        args.refresh_token_ttl_ms,
    ) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    if let Some(username) = args.create_admin.as_deref() {
        handle_create_admin(&db, username, args.password_cost).await;
    }

    init_cleanup(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let config = build_config(&args, db, jwt);
    let app = create_app(&config);

    match listener.local_addr() {
        Ok(local_addr) => info!(
            address = %local_addr,
            access_ttl_secs = config.jwt.access_ttl().as_secs(),
            refresh_ttl_secs = config.jwt.refresh_ttl().as_secs(),
            revoke_on_reuse = config.revoke_on_reuse,
            "Listening"
        ),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
