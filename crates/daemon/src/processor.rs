// SPDX-License-Identifier: MIT

//! Command Processor: the `ghost:commands` subscriber that dispatches each
//! `Command` to a handler and publishes exactly one `Response` on the
//! caller's response channel. Per-command logic lives in `handlers.rs`.

use std::sync::Arc;
use std::time::Duration;

use ghost_core::{Clock, Command, GhostError, Response};
use ghost_storage::Store;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::bus::Bus;
use crate::discovery::Discovery;
use crate::registry::ConnectionRegistry;
use crate::supervisor::ProcessSupervisor;

/// Owns the handler table and the subscription loop. Every field is shared
/// with the rest of the daemon via `Arc`, so handlers can run concurrently
/// without the processor itself becoming a bottleneck.
pub struct CommandProcessor<C: Clock> {
    pub(crate) bus: Arc<dyn Bus>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) supervisor: Arc<ProcessSupervisor<C>>,
    pub(crate) registry: Arc<ConnectionRegistry<C>>,
    pub(crate) discovery: Discovery,
    pub(crate) clock: C,
    pub(crate) version: &'static str,
    pub(crate) started_at_ms: u64,
    pub(crate) connection_timeout: Duration,
    pub(crate) shutdown_timeout: Duration,
}

impl<C: Clock + 'static> CommandProcessor<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bus: Arc<dyn Bus>,
        store: Arc<dyn Store>,
        supervisor: Arc<ProcessSupervisor<C>>,
        registry: Arc<ConnectionRegistry<C>>,
        discovery: Discovery,
        clock: C,
        started_at_ms: u64,
        connection_timeout: Duration,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            bus,
            store,
            supervisor,
            registry,
            discovery,
            clock,
            version: env!("CARGO_PKG_VERSION"),
            started_at_ms,
            connection_timeout,
            shutdown_timeout,
        }
    }

    /// Subscribes to `ghost:commands` and dispatches every message to its own
    /// task, so a slow handler (e.g. a `stop` waiting out `shutdownTimeout`)
    /// never delays unrelated commands. Returns once the bus is torn down or
    /// `cancel` fires; cancellation only stops new dispatch, in-flight
    /// handler tasks are left to finish on their own.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut subscription = match self.bus.subscribe("ghost:commands") {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "command processor could not subscribe to ghost:commands");
                return;
            }
        };

        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => return,
                message = subscription.recv() => message,
            };
            let Some(message) = message else {
                return;
            };

            let command: Command = match serde_json::from_value(message.payload) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "dropping malformed command message");
                    continue;
                }
            };
            let processor = Arc::clone(&self);
            tokio::spawn(async move { processor.handle(command).await });
        }
    }

    async fn handle(&self, command: Command) {
        let response = self.dispatch(&command).await;
        let channel = command.response_channel().to_string();
        let payload = match serde_json::to_value(&response) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to serialize response");
                return;
            }
        };
        if let Err(e) = self.bus.publish(&channel, payload, None).await {
            warn!(error = %e, channel, "failed to publish command response");
        }
    }

    /// Always produces exactly one `Response`, even when the handler panics
    /// via an `Err` return or the command type is unrecognized.
    async fn dispatch(&self, command: &Command) -> Response {
        let now = self.clock.epoch_ms();
        match self.dispatch_inner(command).await {
            Ok(data) => Response::ok(command.command_id.clone(), now, data),
            Err(e) => Response::err(command.command_id.clone(), now, e.to_response_string()),
        }
    }

    async fn dispatch_inner(&self, command: &Command) -> Result<Option<serde_json::Value>, GhostError> {
        match command.command_type.to_lowercase().as_str() {
            "ping" => self.handle_ping().await,
            "status" => self.handle_status(command).await,
            "start" => self.handle_start(command).await,
            "stop" => self.handle_stop(command).await,
            "restart" => self.handle_restart(command).await,
            "register" => self.handle_register(command).await,
            "run" => self.handle_run(command).await,
            "connections" => self.handle_connections().await,
            "discover" => self.handle_discover().await,
            other => Err(GhostError::InvalidArgument(format!("unknown command type: {other}"))),
        }
    }

    pub(crate) fn required_param<'a>(&self, command: &'a Command, key: &str) -> Result<&'a str, GhostError> {
        command
            .parameters
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GhostError::InvalidArgument(format!("missing required parameter: {key}")))
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
