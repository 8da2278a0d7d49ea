use super::*;

#[test]
fn process_type_serializes_with_hyphen() {
    let json = serde_json::to_string(&ProcessType::OneShot).unwrap();
    assert_eq!(json, "\"one-shot\"");
}

#[test]
fn process_status_serializes_pascal_case() {
    let json = serde_json::to_string(&ProcessStatus::Running).unwrap();
    assert_eq!(json, "\"Running\"");
}

#[test]
fn pid_invariant_holds_for_running_with_pid() {
    let record = ProcessRecord::builder().status(ProcessStatus::Running).pid(123u32).build();
    assert!(record.pid_invariant_holds());
}

#[test]
fn pid_invariant_violated_for_running_without_pid() {
    let record = ProcessRecord::builder().status(ProcessStatus::Running).build();
    assert!(!record.pid_invariant_holds());
}

#[test]
fn pid_invariant_holds_for_stopped_without_pid() {
    let record = ProcessRecord::builder().status(ProcessStatus::Stopped).build();
    assert!(record.pid_invariant_holds());
}

#[test]
fn pid_invariant_violated_for_stopped_with_pid() {
    let record = ProcessRecord::builder().status(ProcessStatus::Stopped).pid(1u32).build();
    assert!(!record.pid_invariant_holds());
}

#[test]
fn app_type_defaults_to_unknown() {
    let record = ProcessRecord::builder().build();
    assert_eq!(record.app_type(), "unknown");
}

#[test]
fn app_type_reads_reserved_configuration_key() {
    let mut config = HashMap::new();
    config.insert(ProcessRecord::APP_TYPE_KEY.to_string(), "worker".to_string());
    let record = ProcessRecord::builder().configuration(config).build();
    assert_eq!(record.app_type(), "worker");
}

#[test]
fn auto_restart_requires_literal_true() {
    let mut config = HashMap::new();
    config.insert(ProcessRecord::AUTO_RESTART_KEY.to_string(), "true".to_string());
    let record = ProcessRecord::builder().configuration(config).build();
    assert!(record.auto_restart());
}

#[test]
fn restart_delay_defaults_to_5000ms() {
    let record = ProcessRecord::builder().build();
    assert_eq!(record.restart_delay_ms(), 5_000);
}

#[test]
fn connection_status_roundtrips_arbitrary_strings() {
    let status = ConnectionStatus::from_str_value("Waiting");
    assert_eq!(status.as_str(), "Waiting");
    let json = serde_json::to_string(&status).unwrap();
    assert_eq!(json, "\"Waiting\"");
}

#[test]
fn connection_status_recognizes_disconnected() {
    assert_eq!(ConnectionStatus::from_str_value("Disconnected"), ConnectionStatus::Disconnected);
}

#[test]
fn system_event_type_uses_dotted_topic_names() {
    assert_eq!(SystemEventType::ProcessCrashed.as_str(), "process.crashed");
    let json = serde_json::to_value(SystemEvent::new(SystemEventType::ProcessCrashed, "app1", 10)).unwrap();
    assert_eq!(json["type"], "process.crashed");
    assert_eq!(json["processId"], "app1");
}

#[test]
fn connection_record_new_minimal_defaults_to_running() {
    let conn = ConnectionRecord::new_minimal("ext1", "external", 1000);
    assert_eq!(conn.status, ConnectionStatus::Running);
    assert_eq!(conn.metadata.app_type, "external");
    assert_eq!(conn.last_seen, 1000);
}
