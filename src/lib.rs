// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod fetch;
pub mod indicator;
pub mod metrics;
pub mod processor;
pub mod series;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::ServiceConfig;
pub use crate::indicator::{IndicatorDescriptor, IndicatorKey, SnapshotFile, SourceKind};
pub use crate::processor::IndicatorProcessor;
pub use crate::series::{IndicatorSeries, RawObservation};
