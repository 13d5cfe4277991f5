//! Hoops Lab Roster - Sync Daemon Entry Point
//!
//! Keeps a live copy of the team roster and today's practice attendance,
//! logs the aggregated statistics on every change, and exposes health and
//! Prometheus endpoints. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate (HOOPSLAB_AUTH_TOKEN overrides the token)
//! 2. Init tracing (JSON structured logging)
//! 3. Create metrics registry and health state
//! 4. Connect the realtime store (REST + SSE, or in-memory when offline)
//! 5. Check the asset storage configuration
//! 6. Spawn health server (/live + /ready) and metrics server (/metrics)
//! 7. Spawn store health probe
//! 8. Open the roster and today's practice session
//! 9. Log stats on every roster or attendance change; roll over at midnight
//! 10. Wait for SIGINT → graceful shutdown (detach listeners → stop servers)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use hoopslab_roster::adapters::assets::{FirebaseStorage, StorageConfig};
use hoopslab_roster::adapters::metrics::{
    HealthServer, HealthState, InstrumentedStore, MetricsRegistry,
};
use hoopslab_roster::adapters::store::{MemoryStore, RestStore, RestStoreConfig};
use hoopslab_roster::config::{self, AppConfig};
use hoopslab_roster::domain::{DateKey, aggregate};
use hoopslab_roster::ports::RemoteStore;
use hoopslab_roster::usecases::{AttendanceRepository, PracticeSession, RosterRepository};

/// Interval between store reachability checks.
const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Interval between checks for a new calendar day.
const DAY_ROLLOVER_CHECK: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from config.toml ──────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        offline = config.app.offline,
        "Starting roster sync daemon"
    );

    // ── 3. Metrics registry, health state, shutdown channel ─
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let health = Arc::new(HealthState::new());

    // ── 4. Connect the realtime store ───────────────────────
    let store: Arc<dyn RemoteStore> = Arc::new(InstrumentedStore::new(
        connect_store(&config)?,
        Arc::clone(&metrics),
    ));

    // ── 5. Check asset storage configuration ────────────────
    check_assets(&config)?;

    // ── 6. Spawn health and metrics servers ─────────────────
    let health_server = HealthServer::new(Arc::clone(&health), config.metrics.health_port);
    let health_handle = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        async move {
            if let Err(e) = health_server.run(shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }
    });

    let metrics_handle = if config.metrics.enabled {
        let shutdown = shutdown_tx.subscribe();
        let registry = Arc::clone(&metrics);
        let bind_address = config.metrics.bind_address.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = registry.serve(bind_address, shutdown).await {
                error!(error = %e, "Metrics server failed");
            }
        }))
    } else {
        None
    };

    // ── 7. Spawn store health probe ─────────────────────────
    let probe_handle = tokio::spawn(probe_store(
        Arc::clone(&store),
        Arc::clone(&health),
        shutdown_tx.subscribe(),
    ));

    // ── 8. Open roster and today's practice session ─────────
    let roster = RosterRepository::open(Arc::clone(&store))
        .await
        .context("Failed to open roster")?;
    health.roster_loaded.store(true, Ordering::Relaxed);
    metrics.roster_size.set(gauge_value(roster.len()));

    let attendance = AttendanceRepository::new(Arc::clone(&store));
    let mut session = PracticeSession::today(&attendance)
        .await
        .context("Failed to open today's attendance")?;
    report_today(&session, roster.len(), &metrics);

    info!("Roster and attendance are live, daemon is running");

    // ── 9. Follow changes until SIGINT ──────────────────────
    let mut roster_rx = roster.watch();
    let mut rollover = tokio::time::interval(DAY_ROLLOVER_CHECK);
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("SIGINT received, initiating graceful shutdown");
                break;
            }
            changed = roster_rx.changed() => {
                if changed.is_err() {
                    error!("Roster listener stopped");
                    break;
                }
                let players = roster_rx.borrow_and_update().len();
                metrics.roster_size.set(gauge_value(players));
                info!(players, "Roster changed");
                report_today(&session, players, &metrics);
            }
            refreshed = session.refresh() => match refreshed {
                Ok(_) => report_today(&session, roster.len(), &metrics),
                Err(e) => {
                    error!(error = %e, "Attendance listener stopped");
                    break;
                }
            },
            _ = rollover.tick() => {
                let today = DateKey::today();
                if today != session.date() {
                    info!(date = %today, "New practice day");
                    match PracticeSession::open(&attendance, today).await {
                        Ok(next) => {
                            std::mem::replace(&mut session, next).close();
                            report_today(&session, roster.len(), &metrics);
                        }
                        Err(e) => warn!(error = %e, "Failed to open the new day, retrying"),
                    }
                }
            }
        }
    }

    // ── 10. Graceful shutdown ───────────────────────────────

    // 1. Readiness probe → 503
    health.accepting.store(false, Ordering::Relaxed);

    // 2. Detach every live listener
    session.close();
    roster.close();
    info!("Live listeners detached");

    // 3. Stop servers and background tasks
    let _ = shutdown_tx.send(());
    let _ = tokio::time::timeout(Duration::from_secs(5), probe_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), health_handle).await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Build the store adapter selected by the configuration.
fn connect_store(config: &AppConfig) -> Result<Arc<dyn RemoteStore>> {
    if config.app.offline {
        warn!("Offline mode, using the in-memory store, nothing is shared");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = RestStore::new(RestStoreConfig {
        base_url: config.store.database_url.clone(),
        auth_token: config.store.auth_token.clone(),
        timeout: Duration::from_secs(config.store.timeout_seconds),
        ..RestStoreConfig::default()
    })
    .context("Failed to create store client")?;
    info!(database = %config.store.database_url, "Realtime store configured");
    Ok(Arc::new(store))
}

/// Build the asset storage client once so a bad bucket or URL fails at
/// startup. The daemon only syncs, uploads come from roster clients.
fn check_assets(config: &AppConfig) -> Result<()> {
    if config.app.offline {
        return Ok(());
    }

    FirebaseStorage::new(StorageConfig {
        base_url: config.assets.base_url.clone(),
        bucket: config.assets.bucket.clone(),
        auth_token: config.store.auth_token.clone(),
        timeout: Duration::from_secs(config.assets.timeout_seconds),
    })
    .context("Failed to create asset storage client")?;
    info!(bucket = %config.assets.bucket, "Asset storage configured");
    Ok(())
}

/// Log and publish today's stored counts.
fn report_today(session: &PracticeSession, roster_size: usize, metrics: &MetricsRegistry) {
    let stats = aggregate(session.stored(), roster_size);
    metrics.set_today(&stats);
    info!(
        date = %session.date(),
        present = stats.present,
        late = stats.late,
        absent = stats.absent,
        unmarked = stats.unmarked(),
        total = stats.total,
        "Today's attendance"
    );
}

/// Periodically check that the store is reachable.
async fn probe_store(
    store: Arc<dyn RemoteStore>,
    health: Arc<HealthState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(HEALTH_PROBE_INTERVAL);
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                let healthy = store.is_healthy().await;
                let was = health.store_healthy.swap(healthy, Ordering::Relaxed);
                if was != healthy {
                    if healthy {
                        info!("Store reachable again");
                    } else {
                        warn!("Store unreachable");
                    }
                }
            }
        }
    }
}

fn gauge_value(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
