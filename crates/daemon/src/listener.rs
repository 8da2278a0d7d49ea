// SPDX-License-Identifier: MIT

//! Unix-domain-socket listener bridging the length-prefixed wire protocol
//! to the in-process Bus: each connection does a `Hello` handshake, then
//! exchanges `WireRequest`/`WireResponse` pairs until it disconnects.
//!
//! A `Command` is round-tripped through `ghost:commands` rather than
//! dispatched directly, so CLI clients observe exactly the same path as any
//! other bus publisher would.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ghost_core::{Command, Response};
use ghost_wire::{read_request, write_response, WireRequest, WireResponse, PROTOCOL_VERSION};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::Bus;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub struct Listener {
    bus: Arc<dyn Bus>,
}

impl Listener {
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        Self { bus }
    }

    /// Accepts connections until the listener itself errors out (e.g. the
    /// socket file was removed from under it during shutdown) or `cancel`
    /// fires. Takes the socket as a shared `Arc` since [`UnixListener::accept`]
    /// only needs `&self`, letting the caller keep a handle alongside the
    /// rest of `DaemonState` while this runs in its own spawned task.
    /// Already-accepted connections are not cancelled; each runs to
    /// completion on its own.
    pub async fn run(self: Arc<Self>, listener: Arc<UnixListener>, cancel: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => return,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, _addr)) => {
                    let this = self.clone();
                    tokio::spawn(async move { this.handle_connection(stream).await });
                }
                Err(e) => {
                    warn!(error = %e, "unix listener accept failed, stopping");
                    return;
                }
            }
        }
    }

    async fn handle_connection(&self, mut stream: UnixStream) {
        match read_request(&mut stream).await {
            Ok(WireRequest::Hello { version }) => {
                debug!(client_version = %version, "client connected");
                let hello = WireResponse::Hello { version: PROTOCOL_VERSION.to_string() };
                if write_response(&mut stream, &hello).await.is_err() {
                    return;
                }
            }
            Ok(_) => {
                let _ = write_response(&mut stream, &WireResponse::Error { message: "expected Hello".to_string() }).await;
                return;
            }
            Err(e) => {
                debug!(error = %e, "connection closed before Hello");
                return;
            }
        }

        loop {
            let request = match read_request(&mut stream).await {
                Ok(r) => r,
                Err(e) => {
                    debug!(error = %e, "connection closed");
                    return;
                }
            };

            let response = self.handle_request(request).await;
            if write_response(&mut stream, &response).await.is_err() {
                return;
            }
        }
    }

    async fn handle_request(&self, request: WireRequest) -> WireResponse {
        match request {
            WireRequest::Hello { .. } => WireResponse::Hello { version: PROTOCOL_VERSION.to_string() },
            WireRequest::Command(command) => match self.dispatch_command(command).await {
                Ok(response) => WireResponse::Command(response),
                Err(message) => WireResponse::Error { message },
            },
            WireRequest::Publish { topic, payload } => match self.bus.publish(&topic, payload, None).await {
                Ok(()) => WireResponse::Published,
                Err(e) => WireResponse::Error { message: e.to_string() },
            },
        }
    }

    /// Publishes `command` on `ghost:commands` with a correlation channel
    /// unique to this call, then waits for the matching `Response`.
    async fn dispatch_command(&self, mut command: Command) -> Result<Response, String> {
        let connection_id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let channel = format!("ghost:responses:conn-{connection_id}");
        command.parameters.insert("responseChannel".to_string(), channel.clone());
        let command_id = command.command_id.clone();

        let mut subscription = self.bus.subscribe(&channel).map_err(|e| e.to_string())?;

        let payload = serde_json::to_value(&command).map_err(|e| e.to_string())?;
        self.bus.publish("ghost:commands", payload, None).await.map_err(|e| e.to_string())?;

        loop {
            let message = subscription.recv().await.ok_or_else(|| "no response received".to_string())?;
            if let Ok(response) = serde_json::from_value::<Response>(message.payload) {
                if response.command_id == command_id {
                    return Ok(response);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
