use super::*;
use crate::bus::LocalBus;
use ghost_core::{ProcessRecord, ProcessStatus, ProcessType, SystemClock};
use ghost_storage::MemoryStore;
use launcher::TokioLauncher;
use std::path::PathBuf;
use std::time::Duration;

fn test_config() -> SupervisorConfig {
    SupervisorConfig {
        max_start_attempts: 3,
        startup_timeout: Duration::from_secs(5),
        shutdown_timeout: Duration::from_millis(500),
    }
}

fn supervisor(config: SupervisorConfig) -> Arc<ProcessSupervisor<SystemClock>> {
    Arc::new(ProcessSupervisor::new(
        Arc::new(LocalBus::new()),
        Arc::new(MemoryStore::new()),
        Arc::new(TokioLauncher),
        SystemClock,
        config,
    ))
}

fn record(id: &str, executable: &str) -> ProcessRecord {
    ProcessRecord::builder()
        .id(id)
        .name(id)
        .executable_path(PathBuf::from(executable))
        .process_type(ProcessType::OneShot)
        .build()
}

async fn wait_for_status(sup: &Arc<ProcessSupervisor<SystemClock>>, id: &str, target: ProcessStatus, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if sup.status_of(id).await.map(|r| r.status) == Some(target) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {id} to reach {target}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn register_rejects_duplicate_id() {
    let sup = supervisor(test_config());
    sup.register(record("app1", "/bin/true")).await.unwrap();
    let err = sup.register(record("app1", "/bin/true")).await.unwrap_err();
    assert!(matches!(err, GhostError::AlreadyExists(_)));
}

#[tokio::test]
async fn register_validates_required_fields() {
    let sup = supervisor(test_config());
    let mut bad = record("", "/bin/true");
    bad.id = String::new();
    let err = sup.register(bad).await.unwrap_err();
    assert!(matches!(err, GhostError::InvalidArgument(_)));
}

#[tokio::test]
async fn happy_path_start_reaches_running_then_stopped() {
    let sup = supervisor(test_config());
    sup.register(record("app1", "/bin/true")).await.unwrap();

    let started = sup.start("app1").await.unwrap();
    assert_eq!(started.status, ProcessStatus::Running);
    assert!(started.pid.is_some());

    wait_for_status(&sup, "app1", ProcessStatus::Stopped, Duration::from_secs(2)).await;
    let restart_count = sup.status_of("app1").await.unwrap().restart_count;
    assert_eq!(restart_count, 0);
}

#[tokio::test]
async fn spawn_failure_exhausts_attempts_and_transitions_to_failed() {
    let mut config = test_config();
    config.max_start_attempts = 1;
    let sup = supervisor(config);
    sup.register(record("bad", "/nonexistent/binary")).await.unwrap();

    let err = sup.start("bad").await.unwrap_err();
    assert!(matches!(err, GhostError::StartFailed(_)));
    assert_eq!(sup.status_of("bad").await.unwrap().status, ProcessStatus::Failed);
}

#[tokio::test]
async fn start_on_already_running_record_is_a_no_op() {
    let sup = supervisor(test_config());
    let mut r = record("app1", "/bin/sleep");
    r.arguments = vec!["2".to_string()];
    sup.register(r).await.unwrap();

    let first = sup.start("app1").await.unwrap();
    let second = sup.start("app1").await.unwrap();
    assert_eq!(second.pid, first.pid);

    sup.stop("app1", Duration::from_millis(500)).await.unwrap();
}

#[tokio::test]
async fn stop_on_already_stopped_record_is_a_no_op() {
    let sup = supervisor(test_config());
    sup.register(record("app1", "/bin/true")).await.unwrap();
    let stopped = sup.stop("app1", Duration::from_millis(100)).await.unwrap();
    assert_eq!(stopped.status, ProcessStatus::Stopped);
}

#[tokio::test]
async fn stop_terminates_a_long_running_process_promptly() {
    let sup = supervisor(test_config());
    let mut r = record("app1", "/bin/sleep");
    r.arguments = vec!["30".to_string()];
    sup.register(r).await.unwrap();
    sup.start("app1").await.unwrap();

    let stopped = sup.stop("app1", Duration::from_secs(2)).await.unwrap();
    assert_eq!(stopped.status, ProcessStatus::Stopped);
    assert!(stopped.pid.is_none());
}

#[tokio::test]
async fn stop_forces_kill_when_child_ignores_sigterm() {
    let sup = supervisor(test_config());
    let mut r = record("stubborn", "/bin/sh");
    r.arguments = vec!["-c".to_string(), "trap '' TERM; sleep 30".to_string()];
    sup.register(r).await.unwrap();
    sup.start("stubborn").await.unwrap();

    let result = sup.stop("stubborn", Duration::from_millis(200)).await;
    assert!(matches!(result, Err(GhostError::StopFailed(_))));
    assert_eq!(sup.status_of("stubborn").await.unwrap().status, ProcessStatus::Stopped);
}

#[tokio::test]
async fn crash_with_auto_restart_eventually_transitions_to_failed() {
    let sup = supervisor(test_config());
    let mut r = record("svc", "/bin/false");
    r.process_type = ProcessType::Service;
    r.configuration.insert(ProcessRecord::AUTO_RESTART_KEY.to_string(), "true".to_string());
    r.configuration.insert(ProcessRecord::RESTART_DELAY_MS_KEY.to_string(), "20".to_string());
    sup.register(r).await.unwrap();

    sup.start("svc").await.unwrap();
    wait_for_status(&sup, "svc", ProcessStatus::Failed, Duration::from_secs(3)).await;
    // Two auto-restarts happen (crash counts 1 and 2) before the third crash
    // gives up and transitions to Failed; each bumps restartCount.
    assert_eq!(sup.status_of("svc").await.unwrap().restart_count, 2);
}

#[tokio::test]
async fn start_with_zero_max_attempts_fails_without_spawning() {
    let mut config = test_config();
    config.max_start_attempts = 0;
    let sup = supervisor(config);
    sup.register(record("app1", "/bin/true")).await.unwrap();

    let err = sup.start("app1").await.unwrap_err();
    assert!(matches!(err, GhostError::StartFailed(_)));
    let after = sup.status_of("app1").await.unwrap();
    assert_eq!(after.status, ProcessStatus::Failed);
    assert!(after.pid.is_none());
}

#[tokio::test]
async fn mark_warning_is_a_no_op_outside_running() {
    let sup = supervisor(test_config());
    sup.register(record("app1", "/bin/true")).await.unwrap();
    assert!(sup.mark_warning("app1").await.is_none());
    assert_eq!(sup.status_of("app1").await.unwrap().status, ProcessStatus::Registered);
}

#[tokio::test]
async fn mark_warning_demotes_a_running_record_and_stays_stoppable() {
    let sup = supervisor(test_config());
    let mut r = record("app1", "/bin/sleep");
    r.arguments = vec!["5".to_string()];
    sup.register(r).await.unwrap();
    sup.start("app1").await.unwrap();

    let warned = sup.mark_warning("app1").await.unwrap();
    assert_eq!(warned.status, ProcessStatus::Warning);

    let stopped = sup.stop("app1", Duration::from_secs(2)).await.unwrap();
    assert_eq!(stopped.status, ProcessStatus::Stopped);
}

#[tokio::test]
async fn restart_increments_restart_count() {
    let sup = supervisor(test_config());
    sup.register(record("app1", "/bin/true")).await.unwrap();
    sup.start("app1").await.unwrap();
    wait_for_status(&sup, "app1", ProcessStatus::Stopped, Duration::from_secs(2)).await;

    sup.restart("app1").await.unwrap();
    assert_eq!(sup.status_of("app1").await.unwrap().restart_count, 1);
}

#[tokio::test]
async fn stop_all_leaves_no_running_or_starting_records() {
    let sup = supervisor(test_config());
    for id in ["a", "b"] {
        let mut r = record(id, "/bin/sleep");
        r.arguments = vec!["30".to_string()];
        sup.register(r).await.unwrap();
        sup.start(id).await.unwrap();
    }

    sup.stop_all().await;

    for record in sup.all_statuses().await {
        assert!(!matches!(record.status, ProcessStatus::Running | ProcessStatus::Starting));
    }
}

#[tokio::test]
async fn run_once_waits_for_exit_and_reports_code() {
    let sup = supervisor(test_config());
    let (pid, code) = sup.run_once("/bin/true", &[], None, true).await.unwrap();
    assert!(pid > 0);
    assert_eq!(code, Some(0));
}

#[tokio::test]
async fn run_once_without_wait_returns_immediately_with_no_exit_code() {
    let sup = supervisor(test_config());
    let (pid, code) = sup.run_once("/bin/sleep", &["1".to_string()], None, false).await.unwrap();
    assert!(pid > 0);
    assert_eq!(code, None);
}
