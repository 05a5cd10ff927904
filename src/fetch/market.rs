//! Market-index fetcher: daily closes for a named symbol from a
//! chart-style JSON API (parallel arrays of unix timestamps and
//! quotes). Holidays and weekends are simply absent; null closes on
//! half-sessions are skipped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use metrics::counter;
use serde::Deserialize;

use crate::fetch::SourceFetcher;
use crate::series::RawObservation;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct MarketIndexFetcher {
    base_url: String,
    symbol: String,
    client: reqwest::Client,
}

impl MarketIndexFetcher {
    pub fn new(
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            symbol: symbol.into(),
            client,
        }
    }

    fn observations(body: ChartResponse) -> Vec<RawObservation> {
        let Some(result) = body.chart.result.into_iter().next() else {
            return Vec::new();
        };
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(result.timestamp.len());
        let mut dropped = 0usize;
        for (ts, close) in result.timestamp.iter().zip(quote.close.iter()) {
            match (DateTime::from_timestamp(*ts, 0), close) {
                (Some(dt), Some(v)) if v.is_finite() => {
                    out.push(RawObservation::new(dt.date_naive(), *v));
                }
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "market rows without a usable close");
            counter!("fetch_rows_dropped_total").increment(dropped as u64);
        }
        counter!("fetch_rows_total").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for MarketIndexFetcher {
    /// Daily closes over `[start, end)`, end-exclusive like the
    /// upstream chart API.
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawObservation>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, self.symbol);
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = end
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        let body: ChartResponse = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ])
            .send()
            .await
            .context("market chart get")?
            .error_for_status()
            .context("market chart status")?
            .json()
            .await
            .context("market chart json")?;

        Ok(Self::observations(body))
    }

    fn name(&self) -> &'static str {
        "market-index"
    }
}
