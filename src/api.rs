use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::ServiceConfig;
use crate::indicator::IndicatorKey;
use crate::processor::{build_processor, IndicatorProcessor};
use crate::series::IndicatorSeries;

const DEFAULT_INDICATOR_1: &str = "selic";
const DEFAULT_INDICATOR_2: &str = "ipca";
const DEFAULT_PERIOD_MONTHS: u32 = 12;

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<IndicatorProcessor>,
}

impl AppState {
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        Ok(Self {
            processor: Arc::new(build_processor(cfg)?),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/dados", get(dados))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct DadosQuery {
    indicador1: Option<String>,
    indicador2: Option<String>,
    periodo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DadosResponse {
    pub datas: Vec<String>,
    pub valores1: Vec<f64>,
    pub valores2: Vec<f64>,
    pub indicador1: String,
    pub indicador2: String,
}

/// The single query endpoint: two indicators over a trailing window.
/// Always HTTP 200; anything unresolvable becomes empty arrays so the
/// chart front-end can render whatever did resolve.
async fn dados(State(state): State<AppState>, Query(q): Query<DadosQuery>) -> Json<DadosResponse> {
    let ind1 = q.indicador1.unwrap_or_else(|| DEFAULT_INDICATOR_1.to_string());
    let ind2 = q.indicador2.unwrap_or_else(|| DEFAULT_INDICATOR_2.to_string());
    let periodo = q
        .periodo
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_PERIOD_MONTHS)
        .max(1);

    let series1 = resolve(&state, &ind1, periodo).await;
    let series2 = resolve(&state, &ind2, periodo).await;

    // The chart plots both series against the first indicator's dates.
    Json(DadosResponse {
        datas: series1.iso_dates(),
        valores1: series1.values,
        valores2: series2.values,
        indicador1: ind1.to_uppercase(),
        indicador2: ind2.to_uppercase(),
    })
}

async fn resolve(state: &AppState, raw_key: &str, periodo: u32) -> IndicatorSeries {
    match IndicatorKey::parse(raw_key) {
        Some(key) => state.processor.process(key, periodo).await,
        None => {
            tracing::warn!(indicator = raw_key, "unknown indicator requested");
            IndicatorSeries::empty()
        }
    }
}
