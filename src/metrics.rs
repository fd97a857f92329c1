//! Metrics and observability utilities
//!
//! Prometheus-style counters with standardized naming.

use metrics::{counter, describe_counter, Unit};

/// Metrics prefix for all tweetvault metrics
pub const METRICS_PREFIX: &str = "tweetvault";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_tweet_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Tweet rows created, updated, or deleted through the API"
    );

    describe_counter!(
        format!("{}_annotation_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Annotation rows created, updated, or deleted through the API"
    );

    describe_counter!(
        format!("{}_snapshot_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Snapshot files rewritten"
    );

    describe_counter!(
        format!("{}_imported_rows_total", METRICS_PREFIX),
        Unit::Count,
        "Tweet rows inserted by the bulk loader"
    );

    tracing::info!("Metrics registered");
}

/// Record a write on an API resource
pub fn record_write(entity: &'static str, action: &'static str) {
    counter!(
        format!("{}_{}_writes_total", METRICS_PREFIX, entity),
        "action" => action
    )
    .increment(1);
}

/// Record a snapshot file rewrite
pub fn record_snapshot(snapshot: &'static str) {
    counter!(
        format!("{}_snapshot_writes_total", METRICS_PREFIX),
        "snapshot" => snapshot
    )
    .increment(1);
}

/// Record rows inserted by the bulk loader
pub fn record_imported(rows: u64) {
    counter!(format!("{}_imported_rows_total", METRICS_PREFIX)).increment(rows);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_does_not_panic() {
        // No recorder installed here; calls must still be safe.
        record_write("tweet", "create");
        record_snapshot("recent_tweets");
        record_imported(3);
    }
}
