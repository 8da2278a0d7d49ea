// SPDX-License-Identifier: MIT

//! `ghost daemon` — lifecycle management for `ghostd` itself: start, stop,
//! restart, status, and log viewing. Distinct from the process commands,
//! which talk to an already-running daemon over its socket.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::Command as StdCommand;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{display_log, format_or_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start ghostd (foreground or detached in the background)
    Start {
        /// Run in the foreground instead of detaching
        #[arg(long)]
        foreground: bool,
    },
    /// Stop a running ghostd
    Stop,
    /// Check whether ghostd is running and print a summary
    Status,
    /// Stop and start ghostd again
    Restart,
    /// View ghostd's log file
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "200")]
        limit: usize,
        /// Show the whole file
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
        /// Follow log output as it's written
        #[arg(long, short)]
        follow: bool,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop(format).await,
        DaemonCommand::Restart => restart(format).await,
        DaemonCommand::Status => status(format).await,
        DaemonCommand::Logs { limit, no_limit, follow } => logs(limit, no_limit, follow, format).await,
    }
}

async fn start(foreground: bool) -> Result<()> {
    if DaemonClient::connect().is_ok() {
        println!("ghostd is already running");
        return Ok(());
    }

    let ghostd_path = find_ghostd_binary()?;

    if foreground {
        let status = StdCommand::new(&ghostd_path).status()?;
        if !status.success() {
            return Err(anyhow!("ghostd exited with status: {status}"));
        }
        return Ok(());
    }

    StdCommand::new(&ghostd_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| anyhow!("failed to spawn ghostd at {}: {e}", ghostd_path.display()))?;

    for _ in 0..20 {
        if DaemonClient::connect().is_ok() {
            println!("ghostd started");
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Err(anyhow!("ghostd did not come up in time"))
}

async fn stop(format: OutputFormat) -> Result<()> {
    let config = ghost_daemon::Config::load()?;
    match read_pid(&config.lock_path) {
        Some(pid) => {
            send_signal(pid, nix::sys::signal::Signal::SIGTERM)?;
            for _ in 0..50 {
                if !config.socket_path.exists() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            let obj = serde_json::json!({ "stopped": true, "pid": pid });
            format_or_json(format, &obj, || println!("ghostd stopped"))
        }
        None => {
            let obj = serde_json::json!({ "stopped": false });
            format_or_json(format, &obj, || println!("ghostd is not running"))
        }
    }
}

async fn restart(format: OutputFormat) -> Result<()> {
    stop(format).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    start(false).await
}

async fn status(format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return print_not_running(format),
    };

    let data = match client.ping().await {
        Ok(data) => data,
        Err(e) if e.is_not_running() => return print_not_running(format),
        Err(e) => return Err(anyhow!("{e}")),
    };

    format_or_json(format, &data, || {
        println!("Status:     running");
        println!("Version:    {}", data["DaemonVersion"].as_str().unwrap_or("unknown"));
        println!("Uptime:     {}", format_uptime(data["DaemonUptimeSeconds"].as_u64().unwrap_or(0)));
        println!("Managed:    {}", data["ManagedProcesses"]);
        println!("Connected:  {}", data["ConnectedApps"]);
        println!("Memory:     {:.1} MB", data["DaemonMemoryUsageMB"].as_f64().unwrap_or(0.0));
    })
}

async fn logs(limit: usize, no_limit: bool, follow: bool, format: OutputFormat) -> Result<()> {
    let log_path = match current_log_path()? {
        Some(path) => path,
        None => {
            let obj = serde_json::json!({ "log_path": serde_json::Value::Null, "lines": Vec::<String>::new() });
            return format_or_json(format, &obj, || println!("No log file found yet"));
        }
    };

    let content = if no_limit { std::fs::read_to_string(&log_path)? } else { read_last_lines(&log_path, limit)? };
    display_log(&log_path, &content, follow, format).await
}

fn print_not_running(format: OutputFormat) -> Result<()> {
    let obj = serde_json::json!({ "status": "not_running" });
    format_or_json(format, &obj, || println!("ghostd is not running"))
}

fn read_pid(lock_path: &std::path::Path) -> Option<u32> {
    std::fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), signal)
        .map_err(|e| anyhow!("failed to signal ghostd (pid {pid}): {e}"))
}

fn read_last_lines(path: &std::path::Path, n: usize) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{hours}h {mins}m {secs}s")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Rolling-daily log files are named `ghostd.log.<date>`; pick the most
/// recently written one.
fn current_log_path() -> Result<Option<PathBuf>> {
    let log_dir = ghost_daemon::config::state_dir()?.join("logs");
    if !log_dir.exists() {
        return Ok(None);
    }
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(&log_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("ghostd.log") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

fn find_ghostd_binary() -> Result<PathBuf> {
    let current_exe = std::env::current_exe().ok();

    if let Some(ref exe) = current_exe {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("ghostd");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    Ok(PathBuf::from("ghostd"))
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
