// SPDX-License-Identifier: MIT

//! Process Supervisor: owns the lifecycle state machine for every managed
//! child process. Mutations are exclusively routed through this module; the
//! Connection Registry and State Store are written only as a side effect of
//! a Supervisor-owned transition.

pub mod launcher;

use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ghost_core::{Clock, GhostError, ProcessRecord, ProcessStatus};
use ghost_storage::Store;
use parking_lot::Mutex as SyncMutex;
use serde_json::json;
use tokio::process::Command;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::warn;

use crate::bus::Bus;
use launcher::ProcessLauncher;

/// Output lines kept in memory per process, beyond what's forwarded live to
/// the bus; bounded so a noisy child can't grow the daemon's memory.
const OUTPUT_RING_CAPACITY: usize = 500;
/// Consecutive auto-restarted crashes tolerated before a record is given up
/// on and transitioned to `Failed` (see scenario: three crashes -> Failed).
const MAX_CONSECUTIVE_CRASHES: u32 = 3;

struct ManagedProcess {
    record: ProcessRecord,
    expected_exit: bool,
    consecutive_crashes: u32,
    output: VecDeque<String>,
    exited: Option<oneshot::Receiver<()>>,
}

impl ManagedProcess {
    fn new(record: ProcessRecord) -> Self {
        Self { record, expected_exit: false, consecutive_crashes: 0, output: VecDeque::new(), exited: None }
    }

    fn push_output_line(&mut self, line: String) {
        if self.output.len() >= OUTPUT_RING_CAPACITY {
            self.output.pop_front();
        }
        self.output.push_back(line);
    }
}

/// Tunables the supervisor enforces; see the concurrency & resource model.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub max_start_attempts: u32,
    pub startup_timeout: Duration,
    pub shutdown_timeout: Duration,
}

/// Owns every managed `ProcessRecord` behind a per-id async lock, so unrelated
/// ids never block on a slow Stop/Start.
pub struct ProcessSupervisor<C: Clock> {
    slots: SyncMutex<HashMap<String, Arc<AsyncMutex<ManagedProcess>>>>,
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    launcher: Arc<dyn ProcessLauncher>,
    clock: C,
    config: SupervisorConfig,
}

impl<C: Clock + 'static> ProcessSupervisor<C> {
    pub fn new(
        bus: Arc<dyn Bus>,
        store: Arc<dyn Store>,
        launcher: Arc<dyn ProcessLauncher>,
        clock: C,
        config: SupervisorConfig,
    ) -> Self {
        Self { slots: SyncMutex::new(HashMap::new()), bus, store, launcher, clock, config }
    }

    fn slot_for(&self, id: &str) -> Option<Arc<AsyncMutex<ManagedProcess>>> {
        self.slots.lock().get(id).cloned()
    }

    /// Seed a slot from a previously persisted record without spawning
    /// (daemon-startup discovery only; see State Store `LoadActive`).
    pub fn seed(&self, record: ProcessRecord) {
        let mut slots = self.slots.lock();
        slots.entry(record.id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(ManagedProcess::new(record))));
    }

    async fn persist(&self, record: &ProcessRecord) -> Result<(), GhostError> {
        self.store.save_process(record).await.map_err(GhostError::from)
    }

    async fn emit_registered(&self, id: &str) {
        let event = ghost_core::SystemEvent::new(ghost_core::SystemEventType::ProcessRegistered, id, self.clock.epoch_ms());
        if let Ok(payload) = serde_json::to_value(&event) {
            let _ = self.bus.publish("ghost:events", payload, None).await;
        }
    }

    async fn emit(&self, event_type: ghost_core::SystemEventType, id: &str) {
        let event = ghost_core::SystemEvent::new(event_type, id, self.clock.epoch_ms());
        if let Ok(payload) = serde_json::to_value(&event) {
            if let Err(e) = self.bus.publish("ghost:events", payload, None).await {
                warn!(error = %e, "failed to publish system event");
            }
        }
    }

    /// Fails with `AlreadyExists` if `id` is already present.
    pub async fn register(&self, record: ProcessRecord) -> Result<ProcessRecord, GhostError> {
        if record.id.is_empty() || record.executable_path.as_os_str().is_empty() {
            return Err(GhostError::InvalidArgument("id and executablePath are required".into()));
        }
        {
            let mut slots = self.slots.lock();
            if slots.contains_key(&record.id) {
                return Err(GhostError::AlreadyExists(record.id));
            }
            slots.insert(record.id.clone(), Arc::new(AsyncMutex::new(ManagedProcess::new(record.clone()))));
        }
        self.persist(&record).await?;
        self.emit_registered(&record.id).await;
        Ok(record)
    }

    /// Register semantics for the `register` command: `force=true` stops an
    /// existing Running record first instead of failing.
    pub async fn register_with_force(&self, record: ProcessRecord, force: bool) -> Result<ProcessRecord, GhostError> {
        let existing_running = self
            .slot_for(&record.id)
            .map(|slot| slot.try_lock().map(|g| g.record.status == ProcessStatus::Running).unwrap_or(false))
            .unwrap_or(false);

        if existing_running {
            if !force {
                return Err(GhostError::AlreadyExists(record.id));
            }
            self.stop(&record.id, self.config.shutdown_timeout).await.ok();
        }

        if self.slot_for(&record.id).is_some() {
            self.slots.lock().remove(&record.id);
        }
        self.register(record).await
    }

    /// Attempts to spawn up to `maxStartAttempts` with exponential backoff,
    /// bounded in aggregate by `startupTimeout`. `maxStartAttempts=0` fails
    /// immediately without ever invoking the launcher.
    pub async fn start(self: &Arc<Self>, id: &str) -> Result<ProcessRecord, GhostError> {
        let slot = self.slot_for(id).ok_or_else(|| GhostError::NotFound(id.to_string()))?;

        {
            let guard = slot.lock().await;
            match guard.record.status {
                ProcessStatus::Running => return Ok(guard.record.clone()),
                ProcessStatus::Registered | ProcessStatus::Stopped | ProcessStatus::Crashed | ProcessStatus::Failed => {}
                other => return Err(GhostError::InvalidState(format!("cannot start from {other}"))),
            }
        }

        {
            let mut guard = slot.lock().await;
            guard.record.status = ProcessStatus::Starting;
            guard.expected_exit = false;
            self.persist(&guard.record).await?;
        }

        let deadline = Instant::now() + self.config.startup_timeout;
        let mut attempt = 0u32;
        loop {
            if attempt >= self.config.max_start_attempts {
                let mut guard = slot.lock().await;
                guard.record.status = ProcessStatus::Failed;
                guard.record.pid = None;
                self.persist(&guard.record).await?;
                return Err(GhostError::StartFailed(format!(
                    "{id}: exceeded maxStartAttempts ({})",
                    self.config.max_start_attempts
                )));
            }
            if Instant::now() >= deadline {
                let mut guard = slot.lock().await;
                guard.record.status = ProcessStatus::Failed;
                guard.record.pid = None;
                self.persist(&guard.record).await?;
                return Err(GhostError::Timeout(format!("{id}: startupTimeout exceeded after {attempt} attempt(s)")));
            }

            attempt += 1;
            let record = slot.lock().await.record.clone();
            match self.launcher.launch(&record).await {
                Ok(child) => {
                    let pid = child.id();
                    let mut guard = slot.lock().await;
                    guard.record.pid = pid;
                    guard.record.status = ProcessStatus::Running;
                    guard.record.started_at = Some(self.clock.epoch_ms());
                    guard.record.updated_at = self.clock.epoch_ms();
                    guard.consecutive_crashes = 0;
                    let (tx, rx) = oneshot::channel();
                    guard.exited = Some(rx);
                    let persisted = guard.record.clone();
                    drop(guard);
                    self.persist(&persisted).await?;
                    self.spawn_reaper(id.to_string(), child, tx);
                    return Ok(persisted);
                }
                Err(e) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let backoff = Duration::from_secs(2u64.saturating_pow(attempt)).min(remaining);
                    warn!(id, attempt, error = %e, backoff_secs = backoff.as_secs(), "spawn failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn spawn_reaper(self: &Arc<Self>, id: String, mut child: tokio::process::Child, exited_tx: oneshot::Sender<()>) {
        let supervisor = Arc::clone(self);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let output_id = id.clone();
        let output_bus = Arc::clone(&supervisor.bus);
        let output_slot = supervisor.slot_for(&id);

        tokio::spawn(async move {
            use tokio::io::{AsyncBufReadExt, BufReader};

            let topic = format!("ghost:output:{output_id}");
            let mut stdout_lines = stdout.map(|s| BufReader::new(s).lines());
            let mut stderr_lines = stderr.map(|s| BufReader::new(s).lines());

            loop {
                let line = tokio::select! {
                    l = async {
                        match stdout_lines.as_mut() {
                            Some(r) => r.next_line().await.ok().flatten(),
                            None => std::future::pending().await,
                        }
                    } => l,
                    l = async {
                        match stderr_lines.as_mut() {
                            Some(r) => r.next_line().await.ok().flatten(),
                            None => std::future::pending().await,
                        }
                    } => l,
                    status = child.wait() => {
                        let _ = exited_tx.send(());
                        ProcessSupervisor::handle_exit(&supervisor, &id, status).await;
                        break;
                    }
                };

                if let Some(line) = line {
                    let _ = output_bus.publish(&topic, json!({"line": line}), None).await;
                    if let Some(slot) = &output_slot {
                        slot.lock().await.push_output_line(line);
                    }
                }
            }
        });
    }

    async fn handle_exit(self: &Arc<Self>, id: &str, status: std::io::Result<std::process::ExitStatus>) {
        let Some(slot) = self.slot_for(id) else { return };
        let mut guard = slot.lock().await;

        if guard.expected_exit || guard.record.status == ProcessStatus::Stopping {
            guard.record.status = ProcessStatus::Stopped;
            guard.record.pid = None;
            guard.consecutive_crashes = 0;
            self.persist(&guard.record).await.ok();
            return;
        }

        let is_service = matches!(guard.record.process_type, ghost_core::ProcessType::Service);
        let crashed = match status {
            Ok(exit_status) => !exit_status.success() || is_service,
            Err(_) => true,
        };

        if crashed {
            guard.record.status = ProcessStatus::Crashed;
            guard.record.pid = None;
            guard.consecutive_crashes += 1;
            self.persist(&guard.record).await.ok();
            let crash_count = guard.consecutive_crashes;
            let auto_restart = guard.record.auto_restart();
            let restart_delay = Duration::from_millis(guard.record.restart_delay_ms());
            drop(guard);

            if auto_restart && crash_count < MAX_CONSECUTIVE_CRASHES {
                let supervisor = Arc::clone(self);
                let restart_id = id.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(restart_delay).await;
                    if let Some(slot) = supervisor.slot_for(&restart_id) {
                        let mut guard = slot.lock().await;
                        guard.record.restart_count += 1;
                        supervisor.persist(&guard.record).await.ok();
                    }
                    if let Err(e) = supervisor.start(&restart_id).await {
                        warn!(id = restart_id, error = %e, "auto-restart failed");
                    }
                });
            } else if auto_restart {
                let mut guard = slot.lock().await;
                guard.record.status = ProcessStatus::Failed;
                self.persist(&guard.record).await.ok();
                drop(guard);
                self.emit(ghost_core::SystemEventType::ProcessCrashed, id).await;
            } else {
                self.emit(ghost_core::SystemEventType::ProcessCrashed, id).await;
            }
        } else {
            guard.record.status = ProcessStatus::Stopped;
            guard.record.pid = None;
            guard.consecutive_crashes = 0;
            self.persist(&guard.record).await.ok();
            drop(guard);
            self.emit(ghost_core::SystemEventType::ProcessStopped, id).await;
        }
    }

    /// Sends a cooperative SIGTERM, falling back to SIGKILL if the child has
    /// not exited within `timeout`.
    pub async fn stop(&self, id: &str, timeout: Duration) -> Result<ProcessRecord, GhostError> {
        let slot = self.slot_for(id).ok_or_else(|| GhostError::NotFound(id.to_string()))?;

        let (pid, exited_rx) = {
            let mut guard = slot.lock().await;
            match guard.record.status {
                ProcessStatus::Stopped | ProcessStatus::Registered | ProcessStatus::Crashed | ProcessStatus::Failed => {
                    return Ok(guard.record.clone());
                }
                ProcessStatus::Starting | ProcessStatus::Running | ProcessStatus::Warning => {}
                other => return Err(GhostError::InvalidState(format!("cannot stop from {other}"))),
            }
            guard.expected_exit = true;
            guard.record.status = ProcessStatus::Stopping;
            self.persist(&guard.record).await?;
            (guard.record.pid, guard.exited.take())
        };

        if let Some(pid) = pid {
            send_signal(pid, nix::sys::signal::Signal::SIGTERM);
        }

        let mut forced = false;
        match exited_rx {
            Some(rx) => {
                if tokio::time::timeout(timeout, rx).await.is_err() {
                    forced = true;
                    if let Some(pid) = pid {
                        send_signal(pid, nix::sys::signal::Signal::SIGKILL);
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
            None => {
                // No in-flight child (e.g. seeded from disk); nothing further to wait for.
            }
        }

        let mut guard = slot.lock().await;
        guard.record.status = ProcessStatus::Stopped;
        guard.record.pid = None;
        self.persist(&guard.record).await?;
        let record = guard.record.clone();
        drop(guard);

        if forced {
            Err(GhostError::StopFailed(format!("{id}: forced kill after {timeout:?} timeout")))
        } else {
            Ok(record)
        }
    }

    /// `Stop` then `Start`; increments `restartCount` regardless of whether a
    /// prior Stop found the record already stopped.
    pub async fn restart(self: &Arc<Self>, id: &str) -> Result<ProcessRecord, GhostError> {
        let _ = self.stop(id, self.config.shutdown_timeout).await;

        let slot = self.slot_for(id).ok_or_else(|| GhostError::NotFound(id.to_string()))?;
        {
            let mut guard = slot.lock().await;
            guard.record.restart_count += 1;
            self.persist(&guard.record).await?;
        }
        self.start(id).await
    }

    /// Concurrent best-effort Stop of every Running/Starting record.
    pub async fn stop_all(self: &Arc<Self>) {
        let ids: Vec<String> = {
            let slots = self.slots.lock();
            slots.keys().cloned().collect()
        };
        let timeout = self.config.shutdown_timeout;

        let mut tasks = tokio::task::JoinSet::new();
        for id in ids {
            let running = self
                .slot_for(&id)
                .map(|s| {
                    s.try_lock()
                        .map(|g| matches!(g.record.status, ProcessStatus::Running | ProcessStatus::Starting))
                        .unwrap_or(true)
                })
                .unwrap_or(false);
            if !running {
                continue;
            }
            let supervisor = Arc::clone(self);
            tasks.spawn(async move { supervisor.stop(&id, timeout).await });
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Err(e)) => warn!(error = %e, "stop_all: individual stop failed"),
                Err(e) => warn!(error = %e, "stop_all: stop task panicked"),
                Ok(Ok(_)) => {}
            }
        }
    }

    /// Ephemeral child not tracked in the registry, for the `run` command.
    pub async fn run_once(
        &self,
        executable: &str,
        args: &[String],
        cwd: Option<&std::path::Path>,
        wait_for_exit: bool,
    ) -> Result<(u32, Option<i32>), GhostError> {
        let mut cmd = Command::new(executable);
        cmd.args(args);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(!wait_for_exit);

        let mut child = cmd.spawn().map_err(|e| GhostError::StartFailed(e.to_string()))?;
        let pid = child.id().ok_or_else(|| GhostError::Internal("spawned process has no pid".into()))?;

        if wait_for_exit {
            let status = child.wait().await.map_err(|e| GhostError::StartFailed(e.to_string()))?;
            Ok((pid, status.code()))
        } else {
            tokio::spawn(async move {
                let _ = child.wait().await;
            });
            Ok((pid, None))
        }
    }

    pub async fn status_of(&self, id: &str) -> Option<ProcessRecord> {
        let slot = self.slot_for(id)?;
        Some(slot.lock().await.record.clone())
    }

    pub async fn all_statuses(&self) -> Vec<ProcessRecord> {
        let ids: Vec<String> = self.slots.lock().keys().cloned().collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.status_of(&id).await {
                out.push(record);
            }
        }
        out
    }

    /// Demotes a Running record to the soft `Warning` state when the
    /// maintenance health sweep finds it unhealthy (stale heartbeat or a
    /// pid/status incoherence). No-op outside Running.
    pub async fn mark_warning(&self, id: &str) -> Option<ProcessRecord> {
        let slot = self.slot_for(id)?;
        let mut guard = slot.lock().await;
        if guard.record.status != ProcessStatus::Running {
            return None;
        }
        guard.record.status = ProcessStatus::Warning;
        guard.record.updated_at = self.clock.epoch_ms();
        let record = guard.record.clone();
        drop(guard);
        self.persist(&record).await.ok();
        Some(record)
    }
}

fn send_signal(pid: u32, signal: nix::sys::signal::Signal) {
    if let Err(e) = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), signal) {
        warn!(pid, ?signal, error = %e, "failed to signal child process");
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
