// SPDX-License-Identifier: MIT

//! Daemon-process-level errors: startup, shutdown, transport binding.
//!
//! Distinct from [`ghost_core::GhostError`], which is the per-command error
//! taxonomy surfaced in `Response.error`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] ghost_storage::StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
