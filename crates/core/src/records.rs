// SPDX-License-Identifier: MIT

//! Pure type definitions for the daemon's data model: [`ProcessRecord`],
//! [`ConnectionRecord`], [`MetricSample`], and [`SystemEvent`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Kind of managed process, as declared at registration time.
///
/// `Service` processes are expected to run indefinitely; a zero exit code is
/// still classified `Crashed` for them (see [`ProcessStatus`] state machine
/// notes on the supervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessType {
    Service,
    OneShot,
    Daemon,
}

impl Serialize for ProcessType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            ProcessType::Service => "service",
            ProcessType::OneShot => "one-shot",
            ProcessType::Daemon => "daemon",
        })
    }
}

impl<'de> Deserialize<'de> for ProcessType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "service" => Ok(ProcessType::Service),
            "one-shot" => Ok(ProcessType::OneShot),
            "daemon" => Ok(ProcessType::Daemon),
            other => Err(serde::de::Error::unknown_variant(other, &["service", "one-shot", "daemon"])),
        }
    }
}

crate::simple_display! {
    ProcessType {
        Service => "service",
        OneShot => "one-shot",
        Daemon => "daemon",
    }
}

/// Lifecycle status of a [`ProcessRecord`], mirroring the supervisor's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ProcessStatus {
    Registered,
    Starting,
    Running,
    Stopping,
    Stopped,
    Crashed,
    Failed,
    /// Soft state entered by health policy; never assigned directly by a
    /// supervisor transition.
    Warning,
}

crate::simple_display! {
    ProcessStatus {
        Registered => "Registered",
        Starting => "Starting",
        Running => "Running",
        Stopping => "Stopping",
        Stopped => "Stopped",
        Crashed => "Crashed",
        Failed => "Failed",
        Warning => "Warning",
    }
}

impl ProcessStatus {
    /// A record with this status is terminal from the supervisor's point of view:
    /// no pid, not mid-transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessStatus::Stopped | ProcessStatus::Crashed | ProcessStatus::Failed)
    }

    /// Status values for which a non-null pid is expected.
    pub fn expects_pid(self) -> bool {
        matches!(self, ProcessStatus::Starting | ProcessStatus::Running | ProcessStatus::Stopping | ProcessStatus::Warning)
    }
}

/// One per managed app. Mutations are owned exclusively by the Process Supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub process_type: ProcessType,
    pub version: String,
    pub executable_path: PathBuf,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    /// Reserved key `AppType` carries the connection-registry app type tag.
    pub configuration: HashMap<String, String>,
    pub status: ProcessStatus,
    /// Valid only when `status` is `Starting`, `Running`, or `Stopping`.
    pub pid: Option<u32>,
    pub started_at: Option<u64>,
    pub updated_at: u64,
    pub restart_count: u32,
}

impl ProcessRecord {
    /// Reserved configuration key carrying the app-type tag used by the registry.
    pub const APP_TYPE_KEY: &'static str = "AppType";
    pub const AUTO_RESTART_KEY: &'static str = "AutoRestart";
    pub const RESTART_DELAY_MS_KEY: &'static str = "RestartDelayMs";

    pub fn app_type(&self) -> &str {
        self.configuration.get(Self::APP_TYPE_KEY).map(String::as_str).unwrap_or("unknown")
    }

    pub fn auto_restart(&self) -> bool {
        self.configuration.get(Self::AUTO_RESTART_KEY).map(String::as_str) == Some("true")
    }

    pub fn restart_delay_ms(&self) -> u64 {
        self.configuration
            .get(Self::RESTART_DELAY_MS_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000)
    }

    /// Invariant check used by property tests: `Running` implies a pid, and
    /// terminal states never carry one.
    pub fn pid_invariant_holds(&self) -> bool {
        if self.status == ProcessStatus::Running {
            self.pid.is_some()
        } else if self.status.is_terminal() {
            self.pid.is_none()
        } else {
            true
        }
    }
}

crate::builder! {
    pub struct ProcessRecordBuilder => ProcessRecord {
        into { id: String = "app1" }
        into { name: String = "app1" }
        into { version: String = "1.0.0" }
        set { process_type: ProcessType = ProcessType::OneShot }
        set { executable_path: PathBuf = PathBuf::from("/bin/true") }
        set { arguments: Vec<String> = Vec::new() }
        option { working_directory: PathBuf = None }
        set { environment: HashMap<String, String> = HashMap::new() }
        set { configuration: HashMap<String, String> = HashMap::new() }
        set { status: ProcessStatus = ProcessStatus::Registered }
        option { pid: u32 = None }
        option { started_at: u64 = None }
        set { updated_at: u64 = 0 }
        set { restart_count: u32 = 0 }
    }
}

/// Status string carried by a [`ConnectionRecord`].
///
/// Heartbeats report free-form status strings (`"Running"`, `"Waiting"`, ...);
/// only `Disconnected` is assigned by the registry itself (the maintenance
/// sweep). Everything else round-trips as [`ConnectionStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Running,
    Disconnected,
    Other(String),
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionStatus::Running => "Running",
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Other(s) => s.as_str(),
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "Running" => ConnectionStatus::Running,
            "Disconnected" => ConnectionStatus::Disconnected,
            other => ConnectionStatus::Other(other.to_string()),
        }
    }
}

impl Serialize for ConnectionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConnectionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ConnectionStatus::from_str_value(&s))
    }
}

/// Static metadata an app reports about itself, carried on [`ConnectionRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub app_type: String,
    pub version: String,
    pub environment: HashMap<String, String>,
    pub configuration: HashMap<String, String>,
}

impl ConnectionMetadata {
    pub fn minimal(id: &str, app_type: impl Into<String>) -> Self {
        Self {
            name: id.to_string(),
            app_type: app_type.into(),
            version: "1.0.0".to_string(),
            environment: HashMap::new(),
            configuration: HashMap::new(),
        }
    }
}

/// One per known app; a superset of managed processes since self-registered
/// external apps (known only through heartbeats) also get a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub id: String,
    pub metadata: ConnectionMetadata,
    pub status: ConnectionStatus,
    pub last_message: Option<String>,
    pub last_seen: u64,
    pub last_metrics: Option<MetricSample>,
    pub is_daemon: bool,
}

impl ConnectionRecord {
    pub fn new_minimal(id: impl Into<String>, app_type: impl Into<String>, now_ms: u64) -> Self {
        let id = id.into();
        Self {
            metadata: ConnectionMetadata::minimal(&id, app_type),
            id,
            status: ConnectionStatus::Running,
            last_message: None,
            last_seen: now_ms,
            last_metrics: None,
            is_daemon: false,
        }
    }
}

/// Append-only sample of a process's resource usage at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub process_id: String,
    /// 0-100 times the number of logical CPUs.
    pub cpu_percentage: f64,
    pub memory_bytes: u64,
    pub thread_count: u32,
    pub handle_count: u32,
    pub app_type: String,
    /// UTC epoch milliseconds.
    pub timestamp: u64,
}

/// Fan-out notification published on `ghost:events`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventType {
    ProcessRegistered,
    ProcessStopped,
    ProcessCrashed,
    ConnectionConnected,
    ConnectionDisconnected,
    ConnectionStopped,
    ConnectionCrashed,
}

impl SystemEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemEventType::ProcessRegistered => "process.registered",
            SystemEventType::ProcessStopped => "process.stopped",
            SystemEventType::ProcessCrashed => "process.crashed",
            SystemEventType::ConnectionConnected => "connection.connected",
            SystemEventType::ConnectionDisconnected => "connection.disconnected",
            SystemEventType::ConnectionStopped => "connection.stopped",
            SystemEventType::ConnectionCrashed => "connection.crashed",
        }
    }
}

impl std::fmt::Display for SystemEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SystemEventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SystemEventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "process.registered" => Ok(SystemEventType::ProcessRegistered),
            "process.stopped" => Ok(SystemEventType::ProcessStopped),
            "process.crashed" => Ok(SystemEventType::ProcessCrashed),
            "connection.connected" => Ok(SystemEventType::ConnectionConnected),
            "connection.disconnected" => Ok(SystemEventType::ConnectionDisconnected),
            "connection.stopped" => Ok(SystemEventType::ConnectionStopped),
            "connection.crashed" => Ok(SystemEventType::ConnectionCrashed),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &[
                    "process.registered",
                    "process.stopped",
                    "process.crashed",
                    "connection.connected",
                    "connection.disconnected",
                    "connection.stopped",
                    "connection.crashed",
                ],
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemEvent {
    #[serde(rename = "type")]
    pub event_type: SystemEventType,
    pub process_id: String,
    pub timestamp: u64,
    pub data: Option<serde_json::Value>,
}

impl SystemEvent {
    pub fn new(event_type: SystemEventType, process_id: impl Into<String>, timestamp: u64) -> Self {
        Self { event_type, process_id: process_id.into(), timestamp, data: None }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A process row joined with its most recent metric sample, the shape
/// returned by the State Store's `GetStatus` and surfaced by the `status`
/// command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    #[serde(flatten)]
    pub record: ProcessRecord,
    pub latest_metric: Option<MetricSample>,
}

/// A minimal key/value entry for the State Store's optional `kv` facet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub created_at: u64,
    pub expires_at: Option<u64>,
}

impl KvEntry {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|exp| now_ms >= exp)
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
