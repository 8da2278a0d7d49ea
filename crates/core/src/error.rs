// SPDX-License-Identifier: MIT

//! The error taxonomy shared by every Ghost crate.

use thiserror::Error;

/// Logical error kinds surfaced in `Response.error` and internal logs.
///
/// The Command Processor is the single place these get translated into
/// `Response.error` strings; everything below it returns `Result<_, GhostError>`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GhostError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("start failed: {0}")]
    StartFailed(String),

    #[error("stop failed: {0}")]
    StopFailed(String),

    #[error("storage failed: {0}")]
    StorageFailed(String),

    #[error("bus unavailable: {0}")]
    BusUnavailable(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GhostError {
    /// The taxonomy label used as a prefix in `Response.error` strings, e.g.
    /// `"StartFailed: exceeded max attempts"`.
    pub fn kind(&self) -> &'static str {
        match self {
            GhostError::InvalidArgument(_) => "InvalidArgument",
            GhostError::NotFound(_) => "NotFound",
            GhostError::AlreadyExists(_) => "AlreadyExists",
            GhostError::InvalidState(_) => "InvalidState",
            GhostError::StartFailed(_) => "StartFailed",
            GhostError::StopFailed(_) => "StopFailed",
            GhostError::StorageFailed(_) => "StorageFailed",
            GhostError::BusUnavailable(_) => "BusUnavailable",
            GhostError::Timeout(_) => "Timeout",
            GhostError::Internal(_) => "Internal",
        }
    }

    /// Render as the `"{Kind}: {message}"` string a `Response.error` carries.
    pub fn to_response_string(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
