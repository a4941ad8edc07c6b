use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tgw_core::crypto::Crypter;
use tgw_events::DispatcherConfig;
use tgw_telegram::upstream::unconfigured::UnconfiguredClientFactory;
use tgw_telegram::TelegramConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tgw_api::background;
use tgw_api::config::{InfraConfig, ServerConfig};
use tgw_api::engine::{build_cache, Engine};
use tgw_api::router::build_app_router;
use tgw_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "tgw_api=debug,tgw_telegram=debug,tgw_events=info,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let infra = InfraConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = tgw_db::create_pool(&infra.database_url)
        .await
        .expect("Failed to connect to database");
    tgw_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tgw_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Cache and secrets ---
    let cache = build_cache(&infra);
    let crypter =
        Crypter::from_hex(&infra.encryption_key).expect("ENCRYPTION_KEY must be 64 hex characters");

    // --- Session engine ---
    let engine = Engine::start(
        pool.clone(),
        Arc::clone(&cache),
        Arc::new(UnconfiguredClientFactory),
        crypter,
        TelegramConfig::from_env(),
        DispatcherConfig::from_env(),
    );

    let cleanup_cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(background::token_cleanup::run(
        pool.clone(),
        cleanup_cancel.clone(),
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        sessions: Arc::clone(&engine.sessions),
        cache,
    };
    let app = build_app_router(state, &config);

    engine.resume_listening().await;

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let budget = Duration::from_secs(config.shutdown_timeout_secs);

    cleanup_cancel.cancel();
    let _ = tokio::time::timeout(budget, cleanup_handle).await;

    engine.shutdown(budget).await;

    tracing::info!("Graceful shutdown complete");
}

/// Resolve on SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
