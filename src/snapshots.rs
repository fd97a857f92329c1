//! Snapshot materialization
//!
//! After a successful tweet or annotation write, the API layer notifies a
//! [`SnapshotHook`]. The filesystem implementation recomputes the derived
//! JSON file for that entity type from current store state and overwrites it
//! in full. The hook is a trait so tests can substitute a recording or no-op
//! implementation.

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::views::{AnnotationSnapshotView, TweetView};

/// File name of the recent-tweets snapshot
pub const RECENT_TWEETS_FILE: &str = "recent-tweets.json";

/// File name of the annotations snapshot
pub const ANNOTATIONS_FILE: &str = "annotations.json";

/// How many tweets the recent-tweets snapshot holds
pub const RECENT_TWEET_LIMIT: u64 = 50;

/// Post-write notification interface.
///
/// Invoked synchronously inside the triggering request: the write is already
/// committed when a hook runs, so a hook failure surfaces to the client but
/// never rolls the write back.
#[async_trait]
pub trait SnapshotHook: Send + Sync {
    async fn tweets_changed(&self) -> Result<()>;
    async fn annotations_changed(&self) -> Result<()>;
}

/// Hook that drops every notification
pub struct NoopHook;

#[async_trait]
impl SnapshotHook for NoopHook {
    async fn tweets_changed(&self) -> Result<()> {
        Ok(())
    }

    async fn annotations_changed(&self) -> Result<()> {
        Ok(())
    }
}

/// Rewrites the two snapshot files from current store state.
///
/// Reads are committed-at-query-time: a write landing between the query and
/// the file overwrite is picked up by the next trigger. Writes are whole-file
/// replacements; under concurrent triggers the last writer wins.
pub struct Materializer {
    repo: Repository,
    dir: PathBuf,
}

impl Materializer {
    pub fn new(repo: Repository, dir: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            dir: dir.into(),
        }
    }

    /// Rewrite `recent-tweets.json` with the 50 most recent tweets,
    /// newest first
    pub async fn publish_recent_tweets(&self) -> Result<()> {
        let tweets = self.repo.recent_tweets(RECENT_TWEET_LIMIT).await?;
        let views: Vec<TweetView> = tweets.iter().map(TweetView::from).collect();

        self.write_file(RECENT_TWEETS_FILE, &views).await?;
        metrics::record_snapshot("recent_tweets");
        tracing::debug!(count = views.len(), "Published recent-tweets snapshot");
        Ok(())
    }

    /// Rewrite `annotations.json` with every annotation, tweets embedded
    /// and authors referenced by id
    pub async fn publish_annotations(&self) -> Result<()> {
        let rows = self.repo.annotations_with_refs().await?;
        let views: Vec<AnnotationSnapshotView> = rows
            .iter()
            .map(|(annotation, tweet, _)| AnnotationSnapshotView::new(annotation, tweet))
            .collect();

        self.write_file(ANNOTATIONS_FILE, &views).await?;
        metrics::record_snapshot("annotations");
        tracing::debug!(count = views.len(), "Published annotations snapshot");
        Ok(())
    }

    async fn write_file<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let body = serde_json::to_vec(value)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| AppError::Snapshot {
                path: path.display().to_string(),
                source,
            })
    }
}

#[async_trait]
impl SnapshotHook for Materializer {
    async fn tweets_changed(&self) -> Result<()> {
        self.publish_recent_tweets().await
    }

    async fn annotations_changed(&self) -> Result<()> {
        self.publish_annotations().await
    }
}
