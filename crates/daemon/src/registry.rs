// SPDX-License-Identifier: MIT

//! In-memory view of every app the daemon knows about, managed or
//! self-registered. Mutations are owned exclusively by this module; the
//! Supervisor never writes `ConnectionRecord`s directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ghost_core::{Clock, ConnectionRecord, ConnectionStatus, MetricSample, SystemEvent, SystemEventType};
use ghost_storage::Store;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::bus::Bus;
use crate::error::DaemonError;

pub const DAEMON_CONNECTION_ID: &str = "ghost-daemon";

/// Authoritative registry of known apps. Guarded by one coarse lock over the
/// whole table; per-id fan-out work (bus publish, store writes) happens
/// after releasing it so unrelated ids are never blocked on a slow one.
pub struct ConnectionRegistry<C: Clock> {
    connections: Mutex<HashMap<String, ConnectionRecord>>,
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    clock: C,
}

impl<C: Clock> ConnectionRegistry<C> {
    pub fn new(bus: Arc<dyn Bus>, store: Arc<dyn Store>, clock: C) -> Self {
        Self { connections: Mutex::new(HashMap::new()), bus, store, clock }
    }

    async fn emit(&self, event_type: SystemEventType, process_id: &str) {
        let event = SystemEvent::new(event_type, process_id, self.clock.epoch_ms());
        if let Ok(payload) = serde_json::to_value(&event) {
            if let Err(e) = self.bus.publish("ghost:events", payload, None).await {
                warn!(error = %e, topic = "ghost:events", "failed to publish system event");
            }
        }
    }

    pub async fn register_connection(&self, record: ConnectionRecord) {
        let mut connections = self.connections.lock().await;
        connections.insert(record.id.clone(), record);
    }

    /// Auto-registers unknown ids with minimal metadata, else updates
    /// `status`/`lastSeen`. Emits `connection.connected` on a Disconnected→* transition.
    pub async fn upsert_from_heartbeat(&self, id: &str, status: &str, app_type: Option<&str>) {
        self.upsert(id, status, app_type, None, None).await;
    }

    /// Like [`Self::upsert_from_heartbeat`] but also records `lastMessage`.
    pub async fn upsert_from_health(&self, id: &str, status: &str, message: Option<String>, app_type: Option<&str>) {
        self.upsert(id, status, app_type, message, None).await;
    }

    /// Forces status to Running, stores `lastMetrics`, and forwards the
    /// sample to the State Store tagged with the record's app type.
    pub async fn upsert_from_metrics(&self, id: &str, sample: MetricSample) -> Result<(), DaemonError> {
        self.upsert(id, "Running", Some(sample.app_type.as_str()), None, Some(sample.clone())).await;
        self.store.save_metric(sample).await?;
        Ok(())
    }

    async fn upsert(
        &self,
        id: &str,
        status: &str,
        app_type: Option<&str>,
        message: Option<String>,
        metrics: Option<MetricSample>,
    ) {
        let now = self.clock.epoch_ms();
        let mut connections = self.connections.lock().await;

        let was_disconnected = match connections.get(id) {
            Some(existing) => {
                if now < existing.last_seen {
                    return;
                }
                existing.status == ConnectionStatus::Disconnected
            }
            None => false,
        };

        let entry = connections
            .entry(id.to_string())
            .or_insert_with(|| ConnectionRecord::new_minimal(id, app_type.unwrap_or("unknown"), now));

        entry.status = ConnectionStatus::from_str_value(status);
        entry.last_seen = now;
        if let Some(message) = message {
            entry.last_message = Some(message);
        }
        if let Some(sample) = metrics {
            entry.last_metrics = Some(sample);
        }
        if let Some(app_type) = app_type {
            entry.metadata.app_type = app_type.to_string();
        }
        drop(connections);

        if was_disconnected {
            self.emit(SystemEventType::ConnectionConnected, id).await;
        }
    }

    /// Records whose `lastSeen` is within `connection_timeout`.
    pub async fn list_active(&self, connection_timeout: Duration) -> Vec<ConnectionRecord> {
        let now = self.clock.epoch_ms();
        let cutoff = connection_timeout.as_millis() as u64;
        let connections = self.connections.lock().await;
        connections.values().filter(|c| now.saturating_sub(c.last_seen) <= cutoff).cloned().collect()
    }

    /// All known records, active or not; used by the `connections` command.
    pub async fn list_all(&self) -> Vec<ConnectionRecord> {
        self.connections.lock().await.values().cloned().collect()
    }

    /// Marks records stale past `connection_timeout` as Disconnected,
    /// emitting `connection.disconnected` exactly once per transition.
    pub async fn sweep(&self, connection_timeout: Duration) {
        let now = self.clock.epoch_ms();
        let cutoff = connection_timeout.as_millis() as u64;

        let newly_disconnected: Vec<String> = {
            let mut connections = self.connections.lock().await;
            let mut disconnected = Vec::new();
            for record in connections.values_mut() {
                if now.saturating_sub(record.last_seen) > cutoff && record.status != ConnectionStatus::Disconnected {
                    record.status = ConnectionStatus::Disconnected;
                    disconnected.push(record.id.clone());
                }
            }
            disconnected
        };

        for id in newly_disconnected {
            info!(id, "connection timed out");
            self.emit(SystemEventType::ConnectionDisconnected, &id).await;
        }
    }

    /// Convenience wrapper for the daemon's own self-reported metrics.
    pub async fn update_self_metrics(&self, sample: MetricSample) -> Result<(), DaemonError> {
        self.upsert_from_metrics(DAEMON_CONNECTION_ID, sample).await
    }

    pub async fn get(&self, id: &str) -> Option<ConnectionRecord> {
        self.connections.lock().await.get(id).cloned()
    }

    /// Current time per the registry's clock, for callers that need to
    /// compare against a `lastSeen` timestamp without holding their own.
    pub fn clock_now(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub async fn ensure_daemon_self(&self) {
        let mut connections = self.connections.lock().await;
        connections.entry(DAEMON_CONNECTION_ID.to_string()).or_insert_with(|| {
            let mut record = ConnectionRecord::new_minimal(DAEMON_CONNECTION_ID, "daemon", self.clock.epoch_ms());
            record.is_daemon = true;
            record.status = ConnectionStatus::Running;
            record
        });
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
