// SPDX-License-Identifier: MIT

//! The request/response envelope exchanged between the CLI (or any bus
//! publisher) and the Command Processor over `ghost:commands`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request envelope published on `ghost:commands`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Caller-supplied unique string, echoed back on the response.
    pub command_id: String,
    /// Matched case-insensitively against the handler table.
    pub command_type: String,
    pub target_process_id: Option<String>,
    /// Recognized keys: `responseChannel`, `processId`, `registration`, `force`,
    /// plus per-command keys documented in the command surface table.
    pub parameters: HashMap<String, String>,
}

impl Command {
    pub const DEFAULT_RESPONSE_CHANNEL: &'static str = "ghost:responses:unknown";

    pub fn new(command_id: impl Into<String>, command_type: impl Into<String>) -> Self {
        Self {
            command_id: command_id.into(),
            command_type: command_type.into(),
            target_process_id: None,
            parameters: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_target(mut self, process_id: impl Into<String>) -> Self {
        self.target_process_id = Some(process_id.into());
        self
    }

    pub fn response_channel(&self) -> &str {
        self.parameters
            .get("responseChannel")
            .map(String::as_str)
            .unwrap_or(Self::DEFAULT_RESPONSE_CHANNEL)
    }

    pub fn process_id(&self) -> Option<&str> {
        self.target_process_id
            .as_deref()
            .or_else(|| self.parameters.get("processId").map(String::as_str))
    }

    pub fn force(&self) -> bool {
        self.parameters.get("force").map(String::as_str) == Some("true")
    }
}

/// Reply envelope published on the caller's `responseChannel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Echoes the originating `Command::command_id`.
    pub command_id: String,
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: u64,
}

impl Response {
    pub fn ok(command_id: impl Into<String>, timestamp: u64, data: Option<serde_json::Value>) -> Self {
        Self { command_id: command_id.into(), success: true, data, error: None, timestamp }
    }

    pub fn err(command_id: impl Into<String>, timestamp: u64, error: impl Into<String>) -> Self {
        Self { command_id: command_id.into(), success: false, data: None, error: Some(error.into()), timestamp }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
