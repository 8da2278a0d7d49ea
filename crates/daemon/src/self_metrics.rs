// SPDX-License-Identifier: MIT

//! Self-metrics reporter: samples the daemon's own resource usage on a fixed
//! timer and publishes on `ghost:metrics:ghost-daemon`, mirroring what an
//! external app reports about itself via a heartbeat.

use std::sync::Arc;
use std::time::Duration;

use ghost_core::{Clock, MetricSample};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bus::Bus;
use crate::registry::{ConnectionRegistry, DAEMON_CONNECTION_ID};
use crate::sysinfo::{self, CpuUsageSampler};

pub struct SelfMetricsReporter<C: Clock> {
    bus: Arc<dyn Bus>,
    registry: Arc<ConnectionRegistry<C>>,
    clock: C,
    interval: Duration,
}

impl<C: Clock + 'static> SelfMetricsReporter<C> {
    pub fn new(bus: Arc<dyn Bus>, registry: Arc<ConnectionRegistry<C>>, clock: C, interval: Duration) -> Self {
        Self { bus, registry, clock, interval }
    }

    /// One sample-and-publish cycle; `cpu` carries cross-call state so the
    /// CPU percentage can be derived from consecutive tick counts.
    pub async fn sample_once(&self, cpu: &mut CpuUsageSampler) {
        let sample = MetricSample {
            process_id: DAEMON_CONNECTION_ID.to_string(),
            cpu_percentage: cpu.sample(),
            memory_bytes: (sysinfo::self_memory_mb().unwrap_or(0.0) * 1024.0 * 1024.0) as u64,
            thread_count: sysinfo::self_thread_count().unwrap_or(0),
            handle_count: sysinfo::self_fd_count().unwrap_or(0),
            app_type: "daemon".to_string(),
            timestamp: self.clock.epoch_ms(),
        };

        let topic = format!("ghost:metrics:{DAEMON_CONNECTION_ID}");
        let payload = match serde_json::to_value(&sample) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to serialize self metric sample");
                return;
            }
        };
        if let Err(e) = self.bus.publish(&topic, payload, None).await {
            warn!(error = %e, topic, "failed to publish self metrics");
        }
        if let Err(e) = self.registry.update_self_metrics(sample).await {
            warn!(error = %e, "failed to persist self metrics");
        }
    }

    /// Runs until `cancel` fires. Cancellation is checked only between
    /// ticks, so a sample already in flight always finishes.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut cpu = CpuUsageSampler::new();
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }
            self.sample_once(&mut cpu).await;
        }
    }
}

#[cfg(test)]
#[path = "self_metrics_tests.rs"]
mod tests;
