// SPDX-License-Identifier: MIT

//! Abstraction over child-process creation. The supervisor depends only on
//! this trait, not on `tokio::process` directly, so its retry/backoff logic
//! can be exercised against a fake launcher in tests.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use ghost_core::ProcessRecord;
use tokio::process::{Child, Command};

#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, record: &ProcessRecord) -> std::io::Result<Child>;
}

/// Spawns real OS processes via `tokio::process`.
#[derive(Default)]
pub struct TokioLauncher;

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(&self, record: &ProcessRecord) -> std::io::Result<Child> {
        let cwd = record
            .working_directory
            .clone()
            .or_else(|| record.executable_path.parent().map(Path::to_path_buf));

        let mut cmd = Command::new(&record.executable_path);
        cmd.args(&record.arguments);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &record.environment {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        cmd.spawn()
    }
}
