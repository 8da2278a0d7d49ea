// SPDX-License-Identifier: MIT

//! `DaemonClient`: the CLI's connection to `ghostd` over its Unix socket,
//! speaking `ghost-wire`'s length-prefixed framing. Every call does its own
//! Hello handshake and round-trips exactly one `Command`; there's no
//! persistent connection reuse across invocations since each CLI run is
//! short-lived.

use std::path::PathBuf;
use std::time::Duration;

use ghost_core::Command;
use ghost_daemon::Config;
use ghost_wire::{decode, encode, read_message, write_message, WireRequest, WireResponse, PROTOCOL_VERSION};
use serde_json::Value;
use thiserror::Error;
use tokio::net::UnixStream;

/// Caller-side wait on a command response, per the concurrency model's
/// documented 10s responsibility (the daemon itself is push-only).
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon is not running (socket not found at {0})")]
    NotRunning(PathBuf),

    #[error("could not connect to daemon: {0}")]
    Connect(#[source] std::io::Error),

    #[error("wire protocol error: {0}")]
    Protocol(#[from] ghost_wire::ProtocolError),

    #[error("daemon returned a transport-level error: {0}")]
    Transport(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("timed out waiting for a response")]
    Timeout,

    #[error("failed to resolve daemon configuration: {0}")]
    Config(#[from] ghost_daemon::DaemonError),
}

impl ClientError {
    pub fn is_not_running(&self) -> bool {
        matches!(self, ClientError::NotRunning(_) | ClientError::Connect(_))
    }
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// Connects only far enough to know the socket exists; the actual
    /// transport connection happens per-request in [`Self::send`].
    pub fn connect() -> Result<Self, ClientError> {
        let config = Config::load()?;
        if !config.socket_path.exists() {
            return Err(ClientError::NotRunning(config.socket_path));
        }
        Ok(Self { socket_path: config.socket_path })
    }

    async fn open(&self) -> Result<UnixStream, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path).await.map_err(ClientError::Connect)?;
        let hello = WireRequest::Hello { version: PROTOCOL_VERSION.to_string() };
        write_message(&mut stream, &encode(&hello)?).await?;
        let reply: WireResponse = decode(&read_message(&mut stream).await?)?;
        match reply {
            WireResponse::Hello { .. } => Ok(stream),
            WireResponse::Error { message } => Err(ClientError::Transport(message)),
            other => Err(ClientError::Transport(format!("unexpected handshake reply: {other:?}"))),
        }
    }

    /// Sends `command` and waits (bounded by [`RESPONSE_TIMEOUT`]) for the
    /// matching `Response`, surfacing a command-level failure as
    /// [`ClientError::Command`].
    pub async fn send(&self, command: Command) -> Result<Value, ClientError> {
        let response = self.send_raw(command).await?;
        if response.success {
            Ok(response.data.unwrap_or(Value::Null))
        } else {
            Err(ClientError::Command(response.error.unwrap_or_else(|| "unknown error".to_string())))
        }
    }

    async fn send_raw(&self, command: Command) -> Result<ghost_core::Response, ClientError> {
        let mut stream = self.open().await?;
        let request = WireRequest::Command(command);
        tokio::time::timeout(RESPONSE_TIMEOUT, async {
            write_message(&mut stream, &encode(&request)?).await?;
            let reply: WireResponse = decode(&read_message(&mut stream).await?)?;
            match reply {
                WireResponse::Command(response) => Ok(response),
                WireResponse::Error { message } => Err(ClientError::Transport(message)),
                other => Err(ClientError::Transport(format!("unexpected reply: {other:?}"))),
            }
        })
        .await
        .map_err(|_| ClientError::Timeout)?
    }

    pub async fn ping(&self) -> Result<Value, ClientError> {
        self.send(Command::new("cli-ping", "ping")).await
    }

    pub async fn status(&self, process_id: Option<&str>) -> Result<Value, ClientError> {
        let mut command = Command::new("cli-status", "status");
        if let Some(id) = process_id {
            command = command.with_param("processId", id);
        }
        self.send(command).await
    }

    pub async fn start(&self, process_id: &str) -> Result<Value, ClientError> {
        self.send(Command::new("cli-start", "start").with_param("processId", process_id)).await
    }

    pub async fn stop(&self, process_id: &str) -> Result<Value, ClientError> {
        self.send(Command::new("cli-stop", "stop").with_param("processId", process_id)).await
    }

    pub async fn restart(&self, process_id: &str) -> Result<Value, ClientError> {
        self.send(Command::new("cli-restart", "restart").with_param("processId", process_id)).await
    }

    pub async fn register(&self, record: &ghost_core::ProcessRecord, force: bool) -> Result<Value, ClientError> {
        let registration = serde_json::to_string(record)
            .map_err(|e| ClientError::Command(format!("failed to serialize registration: {e}")))?;
        let command = Command::new("cli-register", "register")
            .with_param("registration", registration)
            .with_param("force", force.to_string());
        self.send(command).await
    }

    pub async fn run(
        &self,
        executable: &str,
        args: &[String],
        working_directory: Option<&std::path::Path>,
        wait_for_exit: bool,
    ) -> Result<Value, ClientError> {
        let mut command = Command::new("cli-run", "run")
            .with_param("executable", executable)
            .with_param("waitForExit", wait_for_exit.to_string());
        if !args.is_empty() {
            let encoded = serde_json::to_string(args)
                .map_err(|e| ClientError::Command(format!("failed to serialize args: {e}")))?;
            command = command.with_param("args", encoded);
        }
        if let Some(dir) = working_directory {
            command = command.with_param("workingDirectory", dir.to_string_lossy().into_owned());
        }
        self.send(command).await
    }

    pub async fn connections(&self) -> Result<Value, ClientError> {
        self.send(Command::new("cli-connections", "connections")).await
    }

    pub async fn discover(&self) -> Result<Value, ClientError> {
        self.send(Command::new("cli-discover", "discover")).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
