//! Database layer
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection setup and schema bootstrap

pub mod models;
mod repository;

pub use repository::{AnnotationChanges, NewTweet, Repository, TweetChanges};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::info;

/// Connect to the database described by the configuration
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(&config.url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);

    let conn = Database::connect(opts)
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Failed to connect to database: {}", e),
        })?;

    info!("Database connection established");
    Ok(conn)
}

/// Create the tables (with their foreign-key actions) when absent.
///
/// Stands in for a migration tool; the schema is derived from the entity
/// definitions, so it works against both Postgres and SQLite URLs.
/// Creation order matters: referenced tables first.
pub async fn ensure_schema(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(models::UserEntity),
        schema.create_table_from_entity(models::TweetEntity),
        schema.create_table_from_entity(models::AnnotationEntity),
    ];

    for stmt in statements.iter_mut() {
        stmt.if_not_exists();
        conn.execute(backend.build(&*stmt)).await?;
    }

    Ok(())
}
