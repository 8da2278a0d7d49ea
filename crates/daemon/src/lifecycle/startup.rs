// SPDX-License-Identifier: MIT

//! Daemon startup: acquire the exclusive lock, open the store, seed the
//! Supervisor from `LoadActive()`, and bind the Unix socket.

use std::io::Write;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use fs2::FileExt;
use ghost_core::SystemClock;
use ghost_storage::{FileStore, Store};
use tokio::net::UnixListener;
use tracing::info;

use crate::bus::LocalBus;
use crate::config::Config;
use crate::discovery::Discovery;
use crate::error::DaemonError;
use crate::processor::CommandProcessor;
use crate::registry::ConnectionRegistry;
use crate::supervisor::launcher::TokioLauncher;
use crate::supervisor::{ProcessSupervisor, SupervisorConfig};

use super::DaemonState;

pub async fn startup(config: Config) -> Result<DaemonState, DaemonError> {
    match startup_inner(&config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // A failed lock acquisition means another daemon owns these
            // files; don't clean up state that isn't ours.
            if !matches!(e, DaemonError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, DaemonError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(DaemonError::LockFailed)?;
    lock_file.set_len(0)?;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    std::fs::create_dir_all(&config.apps_dir)?;

    let store: Arc<dyn Store> = Arc::new(FileStore::open(config.store_path.clone())?);

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = Arc::new(
        UnixListener::bind(&config.socket_path).map_err(|e| DaemonError::BindFailed(config.socket_path.clone(), e))?,
    );

    let bus = Arc::new(LocalBus::new());
    let clock = SystemClock;
    let registry = Arc::new(ConnectionRegistry::new(bus.clone() as Arc<dyn crate::bus::Bus>, store.clone(), clock));
    registry.ensure_daemon_self().await;

    let supervisor_config = SupervisorConfig {
        max_start_attempts: config.max_start_attempts,
        startup_timeout: config.startup_timeout,
        shutdown_timeout: config.shutdown_timeout,
    };
    let supervisor = Arc::new(ProcessSupervisor::new(
        bus.clone() as Arc<dyn crate::bus::Bus>,
        store.clone(),
        Arc::new(TokioLauncher),
        clock,
        supervisor_config,
    ));

    let active = store.load_active().await?;
    let resumed = active.len();
    for record in active {
        supervisor.seed(record);
    }
    if resumed > 0 {
        info!(resumed, "seeded supervisor from previously active processes (not respawned)");
    }

    let started_at_ms = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64;
    let discovery = Discovery::new(config.apps_dir.clone());
    let processor = Arc::new(CommandProcessor::new(
        bus.clone() as Arc<dyn crate::bus::Bus>,
        store.clone(),
        Arc::clone(&supervisor),
        Arc::clone(&registry),
        discovery,
        clock,
        started_at_ms,
        config.connection_timeout,
        config.shutdown_timeout,
    ));

    info!("daemon started");

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        bus,
        store,
        registry,
        supervisor,
        processor,
        listener,
        start_time: Instant::now(),
        started_at_ms,
    })
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
