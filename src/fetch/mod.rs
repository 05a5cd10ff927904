// src/fetch/mod.rs
pub mod bcb;
pub mod cache;
pub mod market;
pub mod snapshot;

use anyhow::Result;
use chrono::NaiveDate;
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

use crate::series::RawObservation;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_rows_total", "Raw rows returned by source fetchers.");
        describe_counter!(
            "fetch_rows_dropped_total",
            "Rows dropped for unparseable date/value."
        );
        describe_counter!("fetch_errors_total", "Source fetch/parse errors.");
        describe_counter!("bcb_cache_hits_total", "Central-bank cache key hits.");
        describe_counter!("bcb_cache_misses_total", "Central-bank cache key misses.");
        describe_counter!(
            "bcb_retry_attempts_total",
            "Failed central-bank attempts that were retried."
        );
        describe_counter!(
            "bcb_retry_exhausted_total",
            "Central-bank fetches degraded to empty after retry exhaustion."
        );
        describe_gauge!(
            "process_last_run_ts",
            "Unix ts when an indicator was last processed."
        );
    });
}

/// A source of raw observations for a date range. Failures are
/// explicit `Err`s here; the processor is the layer that collapses
/// them to empty series.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawObservation>>;
    fn name(&self) -> &'static str;
}
