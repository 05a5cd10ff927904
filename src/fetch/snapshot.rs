//! Snapshot fetchers: versioned CSV files refreshed out-of-band by the
//! scraper scripts, standing in for live feeds. A snapshot is read
//! either over HTTP (the published raw file) or from a local path
//! (tests, offline runs).

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use serde::Deserialize;

use crate::fetch::bcb::parse_comma_decimal;
use crate::fetch::SourceFetcher;
use crate::series::{forward_fill_month_starts, sort_dedup_last, RawObservation};

/// Where a snapshot lives. Mirrors the provider fixture/http split so
/// tests never need a socket.
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    Http { url: String, client: reqwest::Client },
    Path(PathBuf),
}

impl SnapshotSource {
    async fn read(&self) -> Result<String> {
        let content = match self {
            SnapshotSource::Http { url, client } => client
                .get(url)
                .send()
                .await
                .with_context(|| format!("snapshot get {url}"))?
                .error_for_status()
                .with_context(|| format!("snapshot status {url}"))?
                .text()
                .await
                .with_context(|| format!("snapshot body {url}"))?,
            SnapshotSource::Path(p) => tokio::fs::read_to_string(p)
                .await
                .with_context(|| format!("snapshot read {}", p.display()))?,
        };
        if content.trim().is_empty() {
            bail!("snapshot is empty");
        }
        Ok(content)
    }
}

/// `data,valor` row of the maintained snapshots. `valor` may be
/// comma-decimal in some sources.
#[derive(Debug, Deserialize)]
struct SnapshotRow {
    data: String,
    valor: String,
}

pub struct SnapshotFetcher {
    name: &'static str,
    source: SnapshotSource,
}

impl SnapshotFetcher {
    pub fn new(name: &'static str, source: SnapshotSource) -> Self {
        Self { name, source }
    }

    fn parse(&self, content: &str) -> Vec<RawObservation> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut out = Vec::new();
        let mut dropped = 0usize;
        for record in reader.deserialize::<SnapshotRow>() {
            let Ok(row) = record else {
                dropped += 1;
                continue;
            };
            match (parse_snapshot_date(&row.data), parse_comma_decimal(&row.valor)) {
                (Some(date), Some(value)) => out.push(RawObservation::new(date, value)),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(snapshot = self.name, dropped, "snapshot rows dropped");
            counter!("fetch_rows_dropped_total").increment(dropped as u64);
        }
        counter!("fetch_rows_total").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceFetcher for SnapshotFetcher {
    /// Rows within `[start, end]` inclusive, ascending.
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawObservation>> {
        let content = self.source.read().await?;
        let mut obs = self.parse(&content);
        obs.retain(|o| o.date >= start && o.date <= end);
        sort_dedup_last(&mut obs);
        Ok(obs)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Relevant columns of the Economist full-index CSV; the remaining
/// columns are ignored.
#[derive(Debug, Deserialize)]
struct BigMacRow {
    date: String,
    iso_a3: String,
    local_price: String,
}

pub struct BigMacFetcher {
    source: SnapshotSource,
}

impl BigMacFetcher {
    pub fn new(source: SnapshotSource) -> Self {
        Self { source }
    }

    fn parse_brazil(content: &str) -> Vec<RawObservation> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut out = Vec::new();
        let mut dropped = 0usize;
        for record in reader.deserialize::<BigMacRow>() {
            let Ok(row) = record else {
                dropped += 1;
                continue;
            };
            if row.iso_a3 != "BRA" {
                continue;
            }
            match (parse_snapshot_date(&row.date), parse_comma_decimal(&row.local_price)) {
                (Some(date), Some(value)) => out.push(RawObservation::new(date, value)),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(snapshot = "bigmac", dropped, "snapshot rows dropped");
            counter!("fetch_rows_dropped_total").increment(dropped as u64);
        }
        out
    }
}

#[async_trait]
impl SourceFetcher for BigMacFetcher {
    /// Brazil rows within `[start, end]`, forward-filled onto the
    /// month-start grid so the semiannual survey charts as a monthly
    /// series.
    async fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawObservation>> {
        let content = self.source.read().await?;
        let mut obs = Self::parse_brazil(&content);
        sort_dedup_last(&mut obs);
        obs.retain(|o| o.date >= start && o.date <= end);
        let filled = forward_fill_month_starts(&obs, start, end);
        counter!("fetch_rows_total").increment(filled.len() as u64);
        Ok(filled)
    }

    fn name(&self) -> &'static str {
        "bigmac"
    }
}

fn parse_snapshot_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn snapshot_parse_tolerates_comma_decimals_and_bad_rows() {
        let fetcher = SnapshotFetcher::new(
            "cesta",
            SnapshotSource::Path(PathBuf::from("unused")),
        );
        let csv = "data,valor\n2024-01-01,777.90\n2024-02-01,\"781,45\"\nnot-a-date,1\n2024-03-01,abc\n";
        let obs = fetcher.parse(csv);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0], RawObservation::new(d(2024, 1, 1), 777.90));
        assert_eq!(obs[1], RawObservation::new(d(2024, 2, 1), 781.45));
    }

    #[test]
    fn bigmac_parse_keeps_brazil_only() {
        let csv = "date,iso_a3,currency_code,local_price\n\
                   2024-01-01,BRA,BRL,24.9\n\
                   2024-01-01,USA,USD,5.69\n\
                   2024-07-01,BRA,BRL,25.9\n";
        let obs = BigMacFetcher::parse_brazil(csv);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].value, 24.9);
        assert_eq!(obs[1].value, 25.9);
    }

    #[test]
    fn snapshot_dates_accept_iso_and_br_formats() {
        assert_eq!(parse_snapshot_date("2024-05-01"), Some(d(2024, 5, 1)));
        assert_eq!(parse_snapshot_date("01/05/2024"), Some(d(2024, 5, 1)));
        assert_eq!(parse_snapshot_date("2024/05/01"), None);
    }
}
