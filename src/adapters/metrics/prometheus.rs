//! Prometheus Metrics Registry - Roster Sync Observability
//!
//! Registers and exposes Prometheus metrics for store traffic, live
//! subscriptions and today's attendance counts.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::domain::stats::AttendanceStats;

/// Centralized Prometheus metrics.
///
/// All metrics follow the naming convention `hoopslab_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Store operations by operation and outcome (`ok` / `error`).
    pub store_ops: IntCounterVec,
    /// Store operation latency histogram (milliseconds).
    pub store_latency_ms: HistogramVec,
    /// Attached live subscriptions.
    pub live_subscriptions: IntGauge,
    /// Players currently on the roster.
    pub roster_size: IntGauge,
    /// Today's attendance by status (`present`, `late`, `absent`, `unmarked`).
    pub attendance_today: IntGaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let store_ops = IntCounterVec::new(
            Opts::new("hoopslab_store_operations_total", "Remote store operations"),
            &["op", "outcome"],
        )?;

        let store_latency_ms = HistogramVec::new(
            HistogramOpts::new(
                "hoopslab_store_latency_ms",
                "Remote store operation latency in milliseconds",
            )
            .buckets(vec![5.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0]),
            &["op"],
        )?;

        let live_subscriptions = IntGauge::new(
            "hoopslab_live_subscriptions",
            "Attached live subscriptions",
        )?;

        let roster_size = IntGauge::new("hoopslab_roster_size", "Players on the roster")?;

        let attendance_today = IntGaugeVec::new(
            Opts::new("hoopslab_attendance_today", "Today's attendance by status"),
            &["status"],
        )?;

        registry.register(Box::new(store_ops.clone()))?;
        registry.register(Box::new(store_latency_ms.clone()))?;
        registry.register(Box::new(live_subscriptions.clone()))?;
        registry.register(Box::new(roster_size.clone()))?;
        registry.register(Box::new(attendance_today.clone()))?;

        Ok(Self {
            registry,
            store_ops,
            store_latency_ms,
            live_subscriptions,
            roster_size,
            attendance_today,
        })
    }

    /// Record one finished store operation.
    pub fn observe_store_op(&self, op: &str, ok: bool, elapsed_ms: f64) {
        let outcome = if ok { "ok" } else { "error" };
        self.store_ops.with_label_values(&[op, outcome]).inc();
        self.store_latency_ms.with_label_values(&[op]).observe(elapsed_ms);
    }

    /// Publish today's counts.
    pub fn set_today(&self, stats: &AttendanceStats) {
        let counts = [
            ("present", stats.present),
            ("late", stats.late),
            ("absent", stats.absent),
            ("unmarked", stats.unmarked()),
        ];
        for (status, count) in counts {
            self.attendance_today
                .with_label_values(&[status])
                .set(i64::try_from(count).unwrap_or(i64::MAX));
        }
        self.roster_size
            .set(i64::try_from(stats.total).unwrap_or(i64::MAX));
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Serve Prometheus metrics on the configured bind address.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn serve(
        self: Arc<Self>,
        bind_address: String,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let metrics = Arc::clone(&self);

        let app = Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&metrics);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body),
                        Err(e) => {
                            warn!(error = %e, "Failed to encode metrics");
                            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
                        }
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!(address = %bind_address, "Prometheus metrics server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}
