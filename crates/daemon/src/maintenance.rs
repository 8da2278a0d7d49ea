// SPDX-License-Identifier: MIT

//! Maintenance Ticker: periodic health sweep, connection-timeout sweep, and
//! supervisor maintenance, plus a durable snapshot of every managed process
//! record. Runs independently of the Command Processor, on its own
//! fixed-interval timer.

use std::sync::Arc;
use std::time::Duration;

use ghost_core::{Clock, ProcessStatus};
use ghost_storage::Store;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::registry::ConnectionRegistry;
use crate::supervisor::ProcessSupervisor;

pub struct MaintenanceTicker<C: Clock> {
    registry: Arc<ConnectionRegistry<C>>,
    supervisor: Arc<ProcessSupervisor<C>>,
    store: Arc<dyn Store>,
    connection_timeout: Duration,
    health_latency_budget: Duration,
    tick_interval: Duration,
    checkpoint_interval: Duration,
}

impl<C: Clock + 'static> MaintenanceTicker<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ConnectionRegistry<C>>,
        supervisor: Arc<ProcessSupervisor<C>>,
        store: Arc<dyn Store>,
        connection_timeout: Duration,
        health_latency_budget: Duration,
        tick_interval: Duration,
        checkpoint_interval: Duration,
    ) -> Self {
        Self { registry, supervisor, store, connection_timeout, health_latency_budget, tick_interval, checkpoint_interval }
    }

    /// One maintenance pass: health sweep, registry sweep, and supervisor
    /// maintenance, always; a durable snapshot of every managed record, only
    /// every `checkpoint_interval`. `elapsed_since_last_checkpoint` lets
    /// tests drive the checkpoint path without waiting on real time.
    pub async fn on_tick(&self, elapsed_since_last_checkpoint: Duration) {
        self.health_sweep().await;
        self.registry.sweep(self.connection_timeout).await;

        if elapsed_since_last_checkpoint >= self.checkpoint_interval {
            self.snapshot_processes().await;
        }
    }

    /// Health sweep over every managed record: a Running record is demoted
    /// to Warning when its heartbeat is stale past `health_latency_budget`
    /// or its pid/status is incoherent. Records that are already
    /// Warning/Failed/Crashed are then offered to the supervisor for
    /// restart, subject to the record's own auto-restart policy.
    async fn health_sweep(&self) {
        for record in self.supervisor.all_statuses().await {
            let id = record.id.clone();

            if record.status == ProcessStatus::Running {
                let incoherent = !record.pid_invariant_holds();
                let stale = match self.registry.get(&id).await {
                    Some(conn) => {
                        let age_ms = self.registry.clock_now().saturating_sub(conn.last_seen);
                        age_ms > self.health_latency_budget.as_millis() as u64
                    }
                    None => false,
                };

                if incoherent || stale {
                    self.supervisor.mark_warning(&id).await;
                }
                continue;
            }

            if record.status == ProcessStatus::Warning && record.auto_restart() {
                let supervisor = Arc::clone(&self.supervisor);
                let restart_id = id;
                tokio::spawn(async move {
                    if let Err(e) = supervisor.restart(&restart_id).await {
                        warn!(id = restart_id, error = %e, "maintenance restart after Warning failed");
                    }
                });
            }
        }
    }

    async fn snapshot_processes(&self) {
        for record in self.supervisor.all_statuses().await {
            if let Err(e) = self.store.save_process(&record).await {
                warn!(error = %e, process_id = %record.id, "failed to snapshot process record");
            }
        }
    }

    /// Runs until `cancel` fires. Cancellation is checked only between
    /// ticks, so a pass already in flight always finishes.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        let mut since_checkpoint = Duration::ZERO;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            since_checkpoint += self.tick_interval;
            self.on_tick(since_checkpoint).await;
            if since_checkpoint >= self.checkpoint_interval {
                since_checkpoint = Duration::ZERO;
            }
        }
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
