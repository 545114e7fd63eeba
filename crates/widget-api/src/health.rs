//! Background monitors: independent long-lived tasks with their own ticker,
//! each communicating with the request dispatcher only through a shared,
//! lock-protected cell on [`crate::state::AppState`]. Each has its own
//! lifecycle tied to a shutdown signal from `main`.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::state::{AppState, HealthStatus};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(15);
const METRICS_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(10);

/// Handles to the two background monitors, used by `main` to request
/// shutdown and join within the shutdown grace period.
pub struct Monitors {
    shutdown_tx: watch::Sender<bool>,
    health_task: tokio::task::JoinHandle<()>,
    metrics_task: tokio::task::JoinHandle<()>,
}

impl Monitors {
    pub fn spawn(state: AppState) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let health_task = tokio::spawn(connection_health_loop(state.clone(), shutdown_rx.clone()));
        let metrics_task = tokio::spawn(metrics_snapshot_loop(state, shutdown_rx));

        Self {
            shutdown_tx,
            health_task,
            metrics_task,
        }
    }

    /// Signals both monitors to stop and waits up to `grace_period` for them
    /// to join. A monitor that doesn't exit in time is abandoned rather than
    /// blocking shutdown indefinitely.
    pub async fn shutdown(self, grace_period: Duration) {
        let _ = self.shutdown_tx.send(true);

        let joined = tokio::time::timeout(grace_period, async {
            let _ = self.health_task.await;
            let _ = self.metrics_task.await;
        })
        .await;

        if joined.is_err() {
            warn!("background monitors did not exit within the shutdown grace period");
        } else {
            info!("background monitors shut down cleanly");
        }
    }
}

async fn connection_health_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(HEALTH_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let probe = state.probe_redis().await;
                if let Ok(mut guard) = state.redis_health.write() {
                    *guard = HealthStatus { up: probe };
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn metrics_snapshot_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(METRICS_SNAPSHOT_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = state.metrics.snapshot();
                tracing::debug!(
                    widgets_created = snapshot.widgets_created,
                    submissions_appended = snapshot.submissions_appended,
                    events_recorded = snapshot.events_recorded,
                    requests_admitted = snapshot.requests_admitted,
                    requests_rate_limited = snapshot.requests_rate_limited,
                    "metrics snapshot"
                );
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
