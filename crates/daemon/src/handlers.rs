// SPDX-License-Identifier: MIT

//! Per-command implementations, split out from the dispatch loop in
//! `processor.rs`. Each handler validates its own required parameters and
//! returns the `data` payload documented for its command; validation
//! failures never touch the Supervisor or Registry.

use std::path::PathBuf;

use ghost_core::{Clock, GhostError, ProcessRecord, ProcessState};
use serde_json::{json, Value};

use crate::processor::CommandProcessor;
use crate::sysinfo;

impl<C: Clock + 'static> CommandProcessor<C> {
    pub(crate) async fn handle_ping(&self) -> Result<Option<Value>, GhostError> {
        let managed = self.supervisor.all_statuses().await.len();
        let connected = self.registry.list_active(self.connection_timeout).await.len();
        let uptime_seconds = self.clock.epoch_ms().saturating_sub(self.started_at_ms) / 1000;
        let memory_mb = sysinfo::self_memory_mb().unwrap_or(0.0);

        Ok(Some(json!({
            "DaemonStatus": "Running",
            "DaemonVersion": self.version,
            "ManagedProcesses": managed,
            "ConnectedApps": connected,
            "DaemonUptimeSeconds": uptime_seconds,
            "DaemonMemoryUsageMB": memory_mb,
        })))
    }

    pub(crate) async fn handle_status(&self, command: &ghost_core::Command) -> Result<Option<Value>, GhostError> {
        let requested = command.process_id();
        let states = self.store.get_status(requested).await.map_err(GhostError::from)?;

        match requested {
            Some(id) => {
                let state = states.into_iter().next().ok_or_else(|| GhostError::NotFound(id.to_string()))?;
                Ok(Some(serde_json::to_value(state).map_err(|e| GhostError::Internal(e.to_string()))?))
            }
            None => Ok(Some(serde_json::to_value(states).map_err(|e| GhostError::Internal(e.to_string()))?)),
        }
    }

    pub(crate) async fn handle_start(&self, command: &ghost_core::Command) -> Result<Option<Value>, GhostError> {
        let id = self.required_param(command, "processId")?;
        let record = self.supervisor.start(id).await?;
        Ok(Some(process_state_json(record)?))
    }

    pub(crate) async fn handle_stop(&self, command: &ghost_core::Command) -> Result<Option<Value>, GhostError> {
        let id = self.required_param(command, "processId")?;
        let record = self.supervisor.stop(id, self.shutdown_timeout).await?;
        Ok(Some(process_state_json(record)?))
    }

    pub(crate) async fn handle_restart(&self, command: &ghost_core::Command) -> Result<Option<Value>, GhostError> {
        let id = self.required_param(command, "processId")?;
        let record = self.supervisor.restart(id).await?;
        Ok(Some(process_state_json(record)?))
    }

    pub(crate) async fn handle_register(&self, command: &ghost_core::Command) -> Result<Option<Value>, GhostError> {
        let raw = self.required_param(command, "registration")?;
        let record: ProcessRecord =
            serde_json::from_str(raw).map_err(|e| GhostError::InvalidArgument(format!("invalid registration: {e}")))?;
        self.supervisor.register_with_force(record, command.force()).await?;
        Ok(Some(json!({})))
    }

    pub(crate) async fn handle_run(&self, command: &ghost_core::Command) -> Result<Option<Value>, GhostError> {
        let executable = self.required_param(command, "executable")?;
        let args: Vec<String> = command
            .parameters
            .get("args")
            .map(|raw| serde_json::from_str(raw).unwrap_or_default())
            .unwrap_or_default();
        let cwd = command.parameters.get("workingDirectory").map(PathBuf::from);
        let wait_for_exit = command.parameters.get("waitForExit").map(String::as_str) == Some("true");

        let (pid, exit_code) = self.supervisor.run_once(executable, &args, cwd.as_deref(), wait_for_exit).await?;
        Ok(Some(json!({ "pid": pid, "exitCode": exit_code })))
    }

    pub(crate) async fn handle_connections(&self) -> Result<Option<Value>, GhostError> {
        let connections = self.registry.list_all().await;
        Ok(Some(serde_json::to_value(connections).map_err(|e| GhostError::Internal(e.to_string()))?))
    }

    pub(crate) async fn handle_discover(&self) -> Result<Option<Value>, GhostError> {
        let found = self.discovery.scan();
        let mut count = 0u32;
        for record in found {
            match self.supervisor.register(record).await {
                Ok(_) => count += 1,
                Err(GhostError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Some(json!({ "count": count })))
    }
}

fn process_state_json(record: ProcessRecord) -> Result<Value, GhostError> {
    let state = ProcessState { record, latest_metric: None };
    serde_json::to_value(state).map_err(|e| GhostError::Internal(e.to_string()))
}
