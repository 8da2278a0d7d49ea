// SPDX-License-Identifier: MIT

//! Daemon lifecycle: lock acquisition, state seeding, and graceful shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::sync::Arc;
use std::time::Instant;

use ghost_core::SystemClock;
use ghost_storage::Store;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::bus::LocalBus;
use crate::config::Config;
use crate::processor::CommandProcessor;
use crate::registry::ConnectionRegistry;
use crate::supervisor::ProcessSupervisor;

/// Everything the daemon needs once `startup` has returned: the bound
/// listener(s), the shared components wired together, and the lock file
/// whose lifetime keeps the exclusive flock held for the process's duration.
pub struct DaemonState {
    pub config: Config,
    #[allow(dead_code)]
    lock_file: File,
    pub bus: Arc<LocalBus>,
    pub store: Arc<dyn Store>,
    pub registry: Arc<ConnectionRegistry<SystemClock>>,
    pub supervisor: Arc<ProcessSupervisor<SystemClock>>,
    pub processor: Arc<CommandProcessor<SystemClock>>,
    pub listener: Arc<UnixListener>,
    pub start_time: Instant,
    pub started_at_ms: u64,
}

impl DaemonState {
    /// `StopAll()` then a final `Checkpoint()`, per the forced-shutdown
    /// contract. Best-effort: a failure to remove a stale file only logs.
    pub async fn shutdown(&self) {
        info!("shutting down daemon");
        self.supervisor.stop_all().await;

        if let Err(e) = self.store.checkpoint().await {
            warn!(error = %e, "checkpoint failed during shutdown");
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!(error = %e, "failed to remove socket file");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %e, "failed to remove lock file");
            }
        }

        info!("daemon shutdown complete");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
