//! tweetvault core library
//!
//! Shared code for the API server and the bulk loader:
//! - Database entities and repository
//! - Wire-shape projections for the API and snapshot files
//! - Snapshot materialization hook
//! - Bulk import of tweet export files
//! - Configuration, errors, metrics

pub mod config;
pub mod db;
pub mod errors;
pub mod loader;
pub mod metrics;
pub mod routes;
pub mod snapshots;
pub mod views;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use snapshots::{Materializer, SnapshotHook};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
