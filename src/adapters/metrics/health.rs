//! Health Check Server - Liveness and Readiness Probes
//!
//! Exposes /live and /ready endpoints via axum 0.7. Readiness requires
//! the roster subscription to have delivered its first snapshot and the
//! store to be reachable.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::broadcast;
use tracing::{info, instrument};

/// Shared health state polled by readiness probes.
#[derive(Debug, Default)]
pub struct HealthState {
    /// Whether the roster has loaded at least once.
    pub roster_loaded: AtomicBool,
    /// Whether the last store health check succeeded.
    pub store_healthy: AtomicBool,
    /// Cleared during graceful shutdown.
    pub accepting: AtomicBool,
}

impl HealthState {
    /// Create a new health state: nothing loaded yet, accepting traffic.
    pub fn new() -> Self {
        Self {
            roster_loaded: AtomicBool::new(false),
            store_healthy: AtomicBool::new(true),
            accepting: AtomicBool::new(true),
        }
    }

    /// Check if the daemon is ready to serve.
    pub fn is_ready(&self) -> bool {
        self.roster_loaded.load(Ordering::Relaxed)
            && self.store_healthy.load(Ordering::Relaxed)
            && self.accepting.load(Ordering::Relaxed)
    }
}

/// Axum-based health check HTTP server.
pub struct HealthServer {
    /// Health state shared with all components.
    state: Arc<HealthState>,
    /// Bind port (default 8080 from config).
    port: u16,
}

impl HealthServer {
    /// Create a new health server.
    pub const fn new(state: Arc<HealthState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Routes served by the health server.
    pub fn router(state: Arc<HealthState>) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .with_state(state)
    }

    /// Start the health check server in the background.
    #[instrument(skip(self, shutdown_rx))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = Self::router(Arc::clone(&self.state));

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(address = %addr, "Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: returns 200 only once the roster is live.
    async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
        if state.is_ready() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_requires_loaded_roster() {
        let state = HealthState::new();
        assert!(!state.is_ready());
        state.roster_loaded.store(true, Ordering::Relaxed);
        assert!(state.is_ready());
        state.accepting.store(false, Ordering::Relaxed);
        assert!(!state.is_ready());
    }
}
