// SPDX-License-Identifier: MIT

//! Request/response envelopes carried over the length-prefixed wire.
//!
//! `Command` is the control-plane request (CLI issuing `start`, `status`, ...);
//! `Publish` is how external apps without their own bus connection push a
//! heartbeat/metric/health/event onto the daemon's in-process bus.

use ghost_core::{Command, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum WireRequest {
    /// Version handshake, sent once per connection before anything else.
    Hello { version: String },
    /// A control-plane command; the daemon replies with `WireResponse::Command`.
    Command(Command),
    /// Publish a message onto `topic` without going through a `Command`.
    Publish { topic: String, payload: serde_json::Value },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum WireResponse {
    Hello { version: String },
    Command(Response),
    Published,
    /// Transport-level error (malformed request, unsupported protocol version);
    /// distinct from a `Response.error`, which is a command-level failure.
    Error { message: String },
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
