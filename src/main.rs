//! Indicator Comparison Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use comparador_indicadores::metrics::Metrics;
use comparador_indicadores::{api, ServiceConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("comparador_indicadores=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = ServiceConfig::load_default()?;
    let metrics = Metrics::init(cfg.cache_capacity);

    let state = api::AppState::from_config(&cfg)?;
    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    tracing::info!(addr = %cfg.bind_addr, "serving indicator comparison API");
    axum::serve(listener, app).await?;

    Ok(())
}
