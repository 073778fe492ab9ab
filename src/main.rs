mod cache;
mod config;
mod db;
mod error;
mod models;
mod routes;
mod upstream;

use cache::Orchestrator;
use config::AppConfig;
use db::PgStore;
use routes::AppState;
use tracing::info;
use upstream::UpstreamClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting City Explorer API...");

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    info!("Connected to database");

    if config.run_migrations {
        db::run_migrations(&pool).await?;
        info!("Database migrations applied");
    }

    let upstream = UpstreamClient::new(config.upstream.clone())?;
    let orchestrator = Orchestrator::new(PgStore::new(pool.clone()), config.ttl);
    let app = routes::router(AppState::new(orchestrator, upstream));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("App is up on {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Database pool closed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
