//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus metrics export, a metrics decorator for the
//! store port, and health check endpoints (/live, /ready) via axum 0.7.

pub mod health;
pub mod instrumented;
pub mod prometheus;

pub use health::{HealthServer, HealthState};
pub use instrumented::InstrumentedStore;
pub use prometheus::MetricsRegistry;
