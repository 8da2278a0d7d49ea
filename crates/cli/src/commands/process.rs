// SPDX-License-Identifier: MIT

//! `ghost ping|status|start|stop|restart|register|run|connections|discover` —
//! one subcommand per entry in the daemon's command surface.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Subcommand, ValueEnum};

use crate::client::DaemonClient;
use crate::output::{format_or_json, handle_list, OutputFormat};

#[derive(Subcommand)]
pub enum ProcessCommand {
    /// Check that the daemon is alive and print a quick summary
    Ping,
    /// Show the status of one managed process, or all of them
    Status {
        /// Process id to query; omit to list every managed process
        process_id: Option<String>,
    },
    /// Start a previously registered process
    Start { process_id: String },
    /// Stop a running process
    Stop { process_id: String },
    /// Stop and start a process again
    Restart { process_id: String },
    /// Register a new managed process
    Register {
        /// Unique process id
        id: String,
        /// Path to the executable
        executable_path: PathBuf,
        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,
        /// Semantic version tag
        #[arg(long, default_value = "1.0.0")]
        version: String,
        /// Process kind
        #[arg(long, value_enum, default_value_t = ProcessTypeArg::Service)]
        r#type: ProcessTypeArg,
        /// Argument to pass to the executable; repeatable
        #[arg(long = "arg")]
        arguments: Vec<String>,
        /// Working directory for the process
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Environment variable in `KEY=VALUE` form; repeatable
        #[arg(long = "env", value_parser = parse_key_val)]
        environment: Vec<(String, String)>,
        /// Overwrite an existing running registration instead of failing
        #[arg(long)]
        force: bool,
    },
    /// Run an executable once, outside the managed-process registry
    Run {
        executable: String,
        /// Argument to pass; repeatable
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Block until the process exits and report its exit code
        #[arg(long)]
        wait: bool,
    },
    /// List every connection the daemon currently tracks (apps + itself)
    Connections,
    /// Trigger a Discovery Scan of the apps directory
    Discover,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ProcessTypeArg {
    Service,
    OneShot,
    Daemon,
}

impl From<ProcessTypeArg> for ghost_core::ProcessType {
    fn from(value: ProcessTypeArg) -> Self {
        match value {
            ProcessTypeArg::Service => ghost_core::ProcessType::Service,
            ProcessTypeArg::OneShot => ghost_core::ProcessType::OneShot,
            ProcessTypeArg::Daemon => ghost_core::ProcessType::Daemon,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))?;
    Ok((key.to_string(), value.to_string()))
}

pub async fn run(command: ProcessCommand, format: OutputFormat) -> Result<()> {
    let client = connect()?;

    match command {
        ProcessCommand::Ping => ping(&client, format).await,
        ProcessCommand::Status { process_id } => status(&client, process_id, format).await,
        ProcessCommand::Start { process_id } => start(&client, &process_id, format).await,
        ProcessCommand::Stop { process_id } => stop(&client, &process_id, format).await,
        ProcessCommand::Restart { process_id } => restart(&client, &process_id, format).await,
        ProcessCommand::Register { id, executable_path, name, version, r#type, arguments, cwd, environment, force } => {
            register(&client, id, executable_path, name, version, r#type, arguments, cwd, environment, force, format)
                .await
        }
        ProcessCommand::Run { executable, args, cwd, wait } => run_once(&client, executable, args, cwd, wait, format).await,
        ProcessCommand::Connections => connections(&client, format).await,
        ProcessCommand::Discover => discover(&client, format).await,
    }
}

fn connect() -> Result<DaemonClient> {
    DaemonClient::connect().map_err(|e| {
        if e.is_not_running() {
            crate::exit_error::ExitError::new(2, e.to_string()).into()
        } else {
            anyhow!("{e}")
        }
    })
}

async fn ping(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let data = client.ping().await.map_err(|e| anyhow!("{e}"))?;
    format_or_json(format, &data, || {
        println!("{} {}", crate::color::header("ghostd"), data["DaemonStatus"].as_str().unwrap_or("unknown"));
        println!("version:    {}", data["DaemonVersion"].as_str().unwrap_or("unknown"));
        println!("managed:    {}", data["ManagedProcesses"]);
        println!("connected:  {}", data["ConnectedApps"]);
        println!("uptime:     {}s", data["DaemonUptimeSeconds"]);
        println!("memory:     {:.1} MB", data["DaemonMemoryUsageMB"].as_f64().unwrap_or(0.0));
    })
}

async fn status(client: &DaemonClient, process_id: Option<String>, format: OutputFormat) -> Result<()> {
    let data = client.status(process_id.as_deref()).await.map_err(|e| anyhow!("{e}"))?;
    if process_id.is_some() {
        format_or_json(format, &data, || print_process_state(&data))
    } else {
        let states = data.as_array().cloned().unwrap_or_default();
        handle_list(format, &states, "No managed processes.", |rows, out| {
            for state in rows {
                let _ = writeln!(out, "{}", render_process_state_line(state));
            }
        })
    }
}

fn print_process_state(state: &serde_json::Value) {
    println!("{}", render_process_state_line(state));
}

fn render_process_state_line(state: &serde_json::Value) -> String {
    format!(
        "{:<20} {:<10} {}",
        state["id"].as_str().unwrap_or("?"),
        state["status"].as_str().unwrap_or("?"),
        crate::color::muted(state["executablePath"].as_str().unwrap_or("")),
    )
}

async fn start(client: &DaemonClient, process_id: &str, format: OutputFormat) -> Result<()> {
    let data = client.start(process_id).await.map_err(|e| anyhow!("{e}"))?;
    format_or_json(format, &data, || println!("started {}", crate::color::header(process_id)))
}

async fn stop(client: &DaemonClient, process_id: &str, format: OutputFormat) -> Result<()> {
    let data = client.stop(process_id).await.map_err(|e| anyhow!("{e}"))?;
    format_or_json(format, &data, || println!("stopped {}", crate::color::header(process_id)))
}

async fn restart(client: &DaemonClient, process_id: &str, format: OutputFormat) -> Result<()> {
    let data = client.restart(process_id).await.map_err(|e| anyhow!("{e}"))?;
    format_or_json(format, &data, || println!("restarted {}", crate::color::header(process_id)))
}

#[allow(clippy::too_many_arguments)]
async fn register(
    client: &DaemonClient,
    id: String,
    executable_path: PathBuf,
    name: Option<String>,
    version: String,
    process_type: ProcessTypeArg,
    arguments: Vec<String>,
    cwd: Option<PathBuf>,
    environment: Vec<(String, String)>,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let now_ms =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64;
    let record = ghost_core::ProcessRecord {
        name: name.unwrap_or_else(|| id.clone()),
        id,
        process_type: process_type.into(),
        version,
        executable_path,
        arguments,
        working_directory: cwd,
        environment: environment.into_iter().collect(),
        configuration: Default::default(),
        status: ghost_core::ProcessStatus::Registered,
        pid: None,
        started_at: None,
        updated_at: now_ms,
        restart_count: 0,
    };

    let registered_id = record.id.clone();
    let data = client.register(&record, force).await.map_err(|e| anyhow!("{e}"))?;
    format_or_json(format, &data, || println!("registered {}", crate::color::header(&registered_id)))
}

async fn run_once(
    client: &DaemonClient,
    executable: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    wait: bool,
    format: OutputFormat,
) -> Result<()> {
    let data = client.run(&executable, &args, cwd.as_deref(), wait).await.map_err(|e| anyhow!("{e}"))?;
    format_or_json(format, &data, || {
        println!("pid: {}", data["pid"]);
        if let Some(code) = data.get("exitCode").filter(|v| !v.is_null()) {
            println!("exit code: {}", code);
        }
    })
}

async fn connections(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let data = client.connections().await.map_err(|e| anyhow!("{e}"))?;
    let items = data.as_array().cloned().unwrap_or_default();
    handle_list(format, &items, "No connections tracked.", |rows, out| {
        for conn in rows {
            let _ = writeln!(
                out,
                "{:<20} {:<12} {}",
                conn["id"].as_str().unwrap_or("?"),
                conn["status"].as_str().unwrap_or("?"),
                crate::color::muted(conn["metadata"]["type"].as_str().unwrap_or("")),
            );
        }
    })
}

async fn discover(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let data = client.discover().await.map_err(|e| anyhow!("{e}"))?;
    format_or_json(format, &data, || println!("discovered {} app(s)", data["count"]))
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
