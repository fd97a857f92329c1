//! Bulk loader entry point
//!
//! Imports every export file from the configured directory, then publishes
//! the recent-tweets snapshot once if anything was inserted.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tweetvault::config::AppConfig;
use tweetvault::snapshots::Materializer;
use tweetvault::{db, loader, metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.observability.log_level))
        .init();

    metrics::register_metrics();

    let conn = db::connect(&config.database).await?;
    db::ensure_schema(&conn).await?;
    let repo = db::Repository::new(conn);

    let stats = loader::run(&repo, &config.import.dir)
        .await
        .with_context(|| format!("Import from {} failed", config.import.dir.display()))?;

    tracing::info!(
        files = stats.files,
        records = stats.records,
        inserted = stats.inserted,
        skipped = stats.skipped,
        "Import finished"
    );

    if stats.inserted > 0 {
        tokio::fs::create_dir_all(&config.snapshots.dir).await?;
        Materializer::new(repo, config.snapshots.dir.clone())
            .publish_recent_tweets()
            .await?;
    }

    Ok(())
}
