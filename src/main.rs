//! tweetvault API server
//!
//! Serves the tweet and annotation REST resources and keeps the static
//! snapshot files in sync with every write.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tweetvault::config::AppConfig;
use tweetvault::routes::{self, AppState};
use tweetvault::snapshots::{Materializer, SnapshotHook};
use tweetvault::{db, metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);
    tracing::info!("Starting tweetvault v{}", tweetvault::VERSION);

    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start Prometheus exporter")?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    let conn = db::connect(&config.database).await?;
    db::ensure_schema(&conn).await?;
    let repo = db::Repository::new(conn);

    tokio::fs::create_dir_all(&config.snapshots.dir)
        .await
        .with_context(|| format!("Failed to create {}", config.snapshots.dir.display()))?;
    let hook: Arc<dyn SnapshotHook> =
        Arc::new(Materializer::new(repo.clone(), config.snapshots.dir.clone()));

    let state = AppState {
        config: Arc::new(config.clone()),
        repo,
        hook,
    };
    let app = routes::create_router(state);

    let addr = SocketAddr::new(
        config.server.host.parse().context("Invalid server.host")?,
        config.server.port,
    );
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, starting shutdown..."),
    }
}
