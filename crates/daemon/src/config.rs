// SPDX-License-Identifier: MIT

//! Daemon configuration: fixed paths under the state directory plus the
//! tunables from the command surface and concurrency model, all overridable
//! via `GHOST_*` environment variables. Full YAML configuration loading and
//! merge precedence is out of scope; this is the env-var-overlay-over-defaults
//! surface only.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::DaemonError;

/// Resolve the state directory: `GHOST_STATE_DIR` > `XDG_STATE_HOME/ghost` > `~/.local/state/ghost`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("GHOST_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("ghost"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/ghost"))
}

/// Root under which the Discovery Scanner looks for app binaries:
/// `<userAppData>/Ghost/Apps`.
pub fn apps_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("GHOST_APPS_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir().ok_or(DaemonError::NoStateDir)?;
    Ok(data_dir.join("Ghost").join("Apps"))
}

fn env_duration_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis).unwrap_or(default)
}

fn env_u32(var: &str, default: u32) -> u32 {
    std::env::var(var).ok().and_then(|s| s.parse::<u32>().ok()).unwrap_or(default)
}

/// Daemon-wide tunables; see the concurrency & resource model for defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub state_dir: PathBuf,
    pub socket_path: PathBuf,
    pub lock_path: PathBuf,
    pub store_path: PathBuf,
    pub apps_dir: PathBuf,

    /// Latency budget for the maintenance health sweep: a Running record
    /// with no heartbeat within this window is demoted to Warning.
    pub health_check_interval: Duration,
    pub metrics_interval: Duration,
    pub connection_timeout: Duration,
    pub startup_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub max_start_attempts: u32,
    /// Cadence of the Maintenance Ticker's own tick loop, independent of
    /// `health_check_interval` and `checkpoint_interval`.
    pub maintenance_tick_interval: Duration,
    pub checkpoint_interval: Duration,
    pub self_metrics_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self, DaemonError> {
        let state_dir = state_dir()?;
        Ok(Self {
            socket_path: state_dir.join("ghostd.sock"),
            lock_path: state_dir.join("ghostd.pid"),
            store_path: state_dir.join("store.bin"),
            apps_dir: apps_dir().unwrap_or_else(|_| state_dir.join("Apps")),

            health_check_interval: env_duration_ms("GHOST_HEALTH_CHECK_INTERVAL_MS", Duration::from_secs(30)),
            metrics_interval: env_duration_ms("GHOST_METRICS_INTERVAL_MS", Duration::from_secs(5)),
            connection_timeout: env_duration_ms("GHOST_CONNECTION_TIMEOUT_MS", Duration::from_secs(120)),
            startup_timeout: env_duration_ms("GHOST_STARTUP_TIMEOUT_MS", Duration::from_secs(30)),
            shutdown_timeout: env_duration_ms("GHOST_SHUTDOWN_TIMEOUT_MS", Duration::from_secs(30)),
            max_start_attempts: env_u32("GHOST_MAX_START_ATTEMPTS", 3),
            maintenance_tick_interval: env_duration_ms("GHOST_MAINTENANCE_TICK_INTERVAL_MS", Duration::from_secs(1)),
            checkpoint_interval: env_duration_ms("GHOST_CHECKPOINT_INTERVAL_MS", Duration::from_secs(60)),
            self_metrics_interval: env_duration_ms("GHOST_SELF_METRICS_INTERVAL_MS", Duration::from_secs(10)),

            state_dir,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
