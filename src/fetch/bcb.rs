//! Central-bank SGS client. Numbered series arrive as
//! `{ "data": "dd/mm/yyyy", "valor": "comma-decimal" }` rows; values
//! are normalized to dot-decimal before parsing and bad rows are
//! dropped individually.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use serde::Deserialize;

use crate::series::RawObservation;

pub const DEFAULT_BASE_URL: &str = "https://api.bcb.gov.br/dados/serie";

const BR_DATE_FMT: &str = "%d/%m/%Y";

#[derive(Debug, Deserialize)]
struct SgsRow {
    data: String,
    valor: String,
}

/// The narrow seam the retrying cache wraps. Tests stub this to
/// exercise retry/memoization without a network.
#[async_trait]
pub trait SeriesFetch: Send + Sync {
    async fn fetch_series(
        &self,
        series: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>>;
}

pub struct BcbClient {
    base_url: String,
    client: reqwest::Client,
}

impl BcbClient {
    /// `client` must carry a request timeout; see `AppState::from_config`.
    pub fn new(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl SeriesFetch for BcbClient {
    async fn fetch_series(
        &self,
        series: u32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>> {
        let url = format!("{}/bcdata.sgs.{}/dados", self.base_url, series);
        let rows: Vec<SgsRow> = self
            .client
            .get(&url)
            .query(&[
                ("formato", "json"),
                ("dataInicial", &format_br_date(start)),
                ("dataFinal", &format_br_date(end)),
            ])
            .send()
            .await
            .with_context(|| format!("bcb sgs {series} get"))?
            .error_for_status()
            .with_context(|| format!("bcb sgs {series} status"))?
            .json()
            .await
            .with_context(|| format!("bcb sgs {series} json"))?;

        Ok(parse_rows(rows))
    }
}

/// SGS request/response dates are `dd/mm/yyyy`.
pub fn format_br_date(d: NaiveDate) -> String {
    d.format(BR_DATE_FMT).to_string()
}

/// Accepts both `1234,56` and `1234.56`.
pub fn parse_comma_decimal(s: &str) -> Option<f64> {
    let normalized = s.trim().replace(',', ".");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_rows(rows: Vec<SgsRow>) -> Vec<RawObservation> {
    let mut out = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;
    for row in rows {
        let date = NaiveDate::parse_from_str(&row.data, BR_DATE_FMT).ok();
        let value = parse_comma_decimal(&row.valor);
        match (date, value) {
            (Some(date), Some(value)) => out.push(RawObservation::new(date, value)),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "bcb rows dropped during parse");
        counter!("fetch_rows_dropped_total").increment(dropped as u64);
    }
    counter!("fetch_rows_total").increment(out.len() as u64);
    out
}
