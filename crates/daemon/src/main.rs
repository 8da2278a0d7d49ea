// SPDX-License-Identifier: MIT

//! `ghostd`: binds the Unix socket, wires the Command Processor, Maintenance
//! Ticker, and Self-Metrics Reporter to the shared bus/registry/supervisor
//! stack, runs a Discovery Scan, and serves until signaled to stop.

use std::sync::Arc;

use ghost_core::GhostError;
use ghost_daemon::discovery::Discovery;
use ghost_daemon::listener::Listener;
use ghost_daemon::maintenance::MaintenanceTicker;
use ghost_daemon::self_metrics::SelfMetricsReporter;
use ghost_daemon::{startup, Config};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to resolve daemon configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config.state_dir);

    let state = match startup(config).await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "daemon startup failed");
            std::process::exit(1);
        }
    };

    info!(socket = %state.config.socket_path.display(), "ghostd listening");

    for record in Discovery::new(state.config.apps_dir.clone()).scan() {
        let id = record.id.clone();
        if let Err(e) = state.supervisor.register(record).await {
            if !matches!(e, GhostError::AlreadyExists(_)) {
                warn!(error = %e, id, "failed to register discovered app");
            }
        }
    }

    let cancel = CancellationToken::new();
    let mut tasks = tokio::task::JoinSet::new();

    tasks.spawn({
        let processor = state.processor.clone();
        let cancel = cancel.clone();
        async move { processor.run(cancel).await }
    });

    tasks.spawn({
        let bus = state.bus.clone() as Arc<dyn ghost_daemon::bus::Bus>;
        let listener = state.listener.clone();
        let cancel = cancel.clone();
        async move { Arc::new(Listener::new(bus)).run(listener, cancel).await }
    });

    tasks.spawn({
        let ticker = Arc::new(MaintenanceTicker::new(
            state.registry.clone(),
            state.supervisor.clone(),
            state.store.clone(),
            state.config.connection_timeout,
            state.config.health_check_interval,
            state.config.maintenance_tick_interval,
            state.config.checkpoint_interval,
        ));
        let cancel = cancel.clone();
        async move { ticker.run(cancel).await }
    });

    tasks.spawn({
        let reporter = Arc::new(SelfMetricsReporter::new(
            state.bus.clone() as Arc<dyn ghost_daemon::bus::Bus>,
            state.registry.clone(),
            ghost_core::SystemClock,
            state.config.self_metrics_interval,
        ));
        let cancel = cancel.clone();
        async move { reporter.run(cancel).await }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
        _ = wait_for_sigterm() => {
            info!("received SIGTERM");
        }
        Some(result) = tasks.join_next() => {
            if let Err(e) = result {
                error!(error = %e, "a daemon background task panicked");
            }
        }
    }

    // Cooperative cancellation first, then a bounded grace period, then a
    // hard abort for anything still stuck (e.g. a wedged accept loop).
    cancel.cancel();
    tokio::select! {
        _ = async { while tasks.join_next().await.is_some() {} } => {}
        _ = tokio::time::sleep(state.config.shutdown_timeout) => {
            warn!("background tasks did not stop in time, aborting");
        }
    }
    tasks.abort_all();

    state.shutdown().await;
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Logs to `<state_dir>/logs/ghostd.log`, rolled daily — `ghostd` is a
/// background process with no terminal to write to. The returned guard must
/// stay alive for the process lifetime or buffered lines are lost on exit.
fn init_logging(state_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = state_dir.join("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("failed to create log directory {}: {e}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ghostd.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).try_init();
    guard
}
