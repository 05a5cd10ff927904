//! # Indicator processor
//! Orchestrates one indicator resolution: picks the fetcher from the
//! registry, applies the source's unit conversion, resamples to a
//! monthly cadence (last observation wins), and compounds the
//! trailing-12-month accumulation for inflation indices.
//!
//! The outer contract is fail-soft: `process` never errors. A broken
//! upstream degrades that indicator to an empty series so the
//! side-by-side comparison stays answerable.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use metrics::gauge;

use crate::fetch::cache::RetryingCache;
use crate::fetch::{ensure_metrics_described, SourceFetcher};
use crate::indicator::{IndicatorDescriptor, IndicatorKey, SnapshotFile, SourceKind};
use crate::series::{
    accumulate_trailing_12m, resample_monthly_last, sort_dedup_last, IndicatorSeries,
    RawObservation,
};

/// Fixed 30-day month approximation for the lookback window. This is
/// an intentional simplification, not calendar arithmetic.
const DAYS_PER_MONTH: i64 = 30;

/// Extra lookback that seeds the rolling window of accumulation
/// indicators so the first reported point has 12 trailing months.
const ACCUMULATION_SEED_DAYS: i64 = 365;

pub struct IndicatorProcessor {
    bcb: Arc<RetryingCache>,
    market: Arc<dyn SourceFetcher>,
    snapshots: HashMap<SnapshotFile, Arc<dyn SourceFetcher>>,
    bigmac: Arc<dyn SourceFetcher>,
}

impl IndicatorProcessor {
    pub fn new(
        bcb: Arc<RetryingCache>,
        market: Arc<dyn SourceFetcher>,
        snapshots: HashMap<SnapshotFile, Arc<dyn SourceFetcher>>,
        bigmac: Arc<dyn SourceFetcher>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            bcb,
            market,
            snapshots,
            bigmac,
        }
    }

    /// Resolve `key` over the trailing `lookback_months` window ending
    /// today. Never errors: any unrecoverable condition (including an
    /// indicator with zero valid rows) comes back as an empty series.
    pub async fn process(&self, key: IndicatorKey, lookback_months: u32) -> IndicatorSeries {
        let today = Utc::now().date_naive();
        match self.process_at(key, lookback_months, today).await {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!(error = ?e, indicator = %key, "processing degraded to empty series");
                IndicatorSeries::empty()
            }
        }
    }

    /// Same as [`process`](Self::process) with an injected "today",
    /// so tests pin the window.
    pub async fn process_at(
        &self,
        key: IndicatorKey,
        lookback_months: u32,
        today: NaiveDate,
    ) -> Result<IndicatorSeries> {
        let desc = key.descriptor();
        let lookback = lookback_months.max(1) as i64;
        let end = today;
        let requested_start = today - Duration::days(lookback * DAYS_PER_MONTH);

        gauge!("process_last_run_ts").set(Utc::now().timestamp() as f64);

        if desc.monthly_passthrough {
            // Already-monthly sources: sort, convert units, return as-is.
            let mut obs = self.fetch_raw(desc, requested_start, end).await;
            sort_dedup_last(&mut obs);
            apply_scale(&mut obs, desc.scale);
            return Ok(IndicatorSeries::from_observations(obs));
        }

        let fetch_start = if desc.accumulate_12m {
            requested_start - Duration::days(ACCUMULATION_SEED_DAYS)
        } else {
            requested_start
        };

        let mut obs = self.fetch_raw(desc, fetch_start, end).await;
        sort_dedup_last(&mut obs);

        if desc.accumulate_12m {
            // The rolling window counts observations, so a calendar
            // gap stretches a "12-month" window over more months.
            // Surface it instead of reporting it silently.
            let gaps = obs
                .windows(2)
                .filter(|w| months_between(w[0].date, w[1].date) > 1)
                .count();
            if gaps > 0 {
                tracing::warn!(
                    indicator = %key,
                    gaps,
                    "monthly series has internal gaps; accumulated windows span extra months"
                );
            }
            obs = accumulate_trailing_12m(&obs);
        }

        let mut obs = resample_monthly_last(obs);
        apply_scale(&mut obs, desc.scale);
        obs.retain(|o| o.value.is_finite());
        // Discard the seed rows that only fed the rolling window.
        obs.retain(|o| o.date >= requested_start);

        Ok(IndicatorSeries::from_observations(obs))
    }

    /// Fail-soft fetch: errors are logged with the source name and
    /// collapse to no data here, at the processor boundary.
    async fn fetch_raw(
        &self,
        desc: &IndicatorDescriptor,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<RawObservation> {
        let fetched = match desc.source {
            SourceKind::CentralBank { series } => {
                // Cached payloads are shared read-only; copy out.
                return self.bcb.get(series, start, end).await.as_ref().clone();
            }
            SourceKind::MarketIndex { .. } => self.market.fetch(start, end).await,
            SourceKind::Snapshot { file } => match self.snapshots.get(&file) {
                Some(f) => f.fetch(start, end).await,
                None => Err(anyhow::anyhow!("no fetcher wired for {:?}", file)),
            },
            SourceKind::BigMac => self.bigmac.fetch(start, end).await,
        };

        match fetched {
            Ok(obs) => obs,
            Err(e) => {
                tracing::warn!(error = ?e, indicator = %desc.key, "source unavailable");
                metrics::counter!("fetch_errors_total").increment(1);
                Vec::new()
            }
        }
    }
}

fn months_between(a: NaiveDate, b: NaiveDate) -> i32 {
    use chrono::Datelike;
    (b.year() - a.year()) * 12 + (b.month() as i32 - a.month() as i32)
}

fn apply_scale(obs: &mut [RawObservation], scale: Option<f64>) {
    if let Some(factor) = scale {
        for o in obs.iter_mut() {
            o.value *= factor;
        }
    }
}

/// Wire the production fetcher set from configuration. Kept here so
/// the binary and the HTTP state share one assembly path.
pub fn build_processor(cfg: &crate::config::ServiceConfig) -> Result<IndicatorProcessor> {
    use crate::fetch::bcb::BcbClient;
    use crate::fetch::cache::RetryPolicy;
    use crate::fetch::market::MarketIndexFetcher;
    use crate::fetch::snapshot::{BigMacFetcher, SnapshotFetcher, SnapshotSource};

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(cfg.http_timeout_secs))
        .build()
        .context("building http client")?;

    let bcb = Arc::new(RetryingCache::new(
        Arc::new(BcbClient::new(cfg.bcb_base_url.clone(), client.clone())),
        cfg.cache_capacity,
        RetryPolicy {
            attempts: cfg.retry_attempts,
            delay: std::time::Duration::from_millis(cfg.retry_delay_ms),
        },
    ));

    let market: Arc<dyn SourceFetcher> = Arc::new(MarketIndexFetcher::new(
        cfg.market_base_url.clone(),
        cfg.market_symbol.clone(),
        client.clone(),
    ));

    let mut snapshots: HashMap<SnapshotFile, Arc<dyn SourceFetcher>> = HashMap::new();
    for file in SnapshotFile::ALL {
        let source = SnapshotSource::Http {
            url: format!("{}/{}", cfg.snapshot_base_url, file.file_name()),
            client: client.clone(),
        };
        let name = match file {
            SnapshotFile::CestaBasica => "cesta",
            SnapshotFile::Fipezap => "fipezap",
            SnapshotFile::Gasolina => "gasolina",
            SnapshotFile::Energia => "energia",
        };
        snapshots.insert(file, Arc::new(SnapshotFetcher::new(name, source)));
    }

    let bigmac: Arc<dyn SourceFetcher> = Arc::new(BigMacFetcher::new(SnapshotSource::Http {
        url: cfg.bigmac_url.clone(),
        client,
    }));

    Ok(IndicatorProcessor::new(bcb, market, snapshots, bigmac))
}
