//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend in the pool
//! - Flip backend liveness based on probe results

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::probe::{Prober, TcpProber};
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::metrics;

/// Outcome of one probe cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub alive: usize,
    pub dead: usize,
}

pub struct HealthMonitor<P = TcpProber> {
    pool: Arc<BackendPool>,
    prober: Arc<P>,
    config: HealthCheckConfig,
}

impl HealthMonitor<TcpProber> {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        Self::with_prober(pool, TcpProber, config)
    }
}

impl<P: Prober> HealthMonitor<P> {
    pub fn with_prober(pool: Arc<BackendPool>, prober: P, config: HealthCheckConfig) -> Self {
        Self {
            pool,
            prober: Arc::new(prober),
            config,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            timeout_ms = self.config.timeout_ms,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.check_all().await;
                    tracing::debug!(alive = report.alive, dead = report.dead, "Health check cycle complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend concurrently. The cycle takes as long as the
    /// slowest probe, which is bounded by the probe timeout.
    ///
    /// Each probe runs in its own task and applies its own result, so a
    /// cycle abandoned midway still updates the backends it probed.
    pub async fn check_all(&self) -> HealthReport {
        let timeout = self.config.timeout();
        let probes = self.pool.backends().into_iter().map(|backend| {
            let prober = self.prober.clone();
            tokio::spawn(async move {
                let alive = prober.probe(backend.address(), timeout).await;
                apply_probe_result(&backend, alive);
                alive
            })
        });

        let mut report = HealthReport::default();
        for result in join_all(probes.collect::<Vec<_>>()).await {
            match result {
                Ok(true) => report.alive += 1,
                Ok(false) => report.dead += 1,
                Err(e) => tracing::error!(error = %e, "Health probe task failed"),
            }
        }
        report
    }
}

fn apply_probe_result(backend: &Backend, alive: bool) {
    let address = backend.address();
    let status = if alive { "up" } else { "down" };
    if backend.set_alive(alive) {
        if alive {
            tracing::info!(address = %address, status, "Backend recovered");
        } else {
            tracing::warn!(address = %address, status, "Backend unreachable, marked dead");
        }
    } else {
        tracing::debug!(address = %address, status, "Backend status unchanged");
    }
    metrics::record_backend_health(address, alive);
}
