use super::*;

#[test]
fn response_channel_falls_back_to_default() {
    let cmd = Command::new("c1", "ping");
    assert_eq!(cmd.response_channel(), Command::DEFAULT_RESPONSE_CHANNEL);
}

#[test]
fn response_channel_honors_parameter() {
    let cmd = Command::new("c1", "ping").with_param("responseChannel", "ghost:responses:cli");
    assert_eq!(cmd.response_channel(), "ghost:responses:cli");
}

#[test]
fn process_id_prefers_target_over_parameter() {
    let cmd = Command::new("c1", "start").with_target("app1").with_param("processId", "app2");
    assert_eq!(cmd.process_id(), Some("app1"));
}

#[test]
fn process_id_falls_back_to_parameter() {
    let cmd = Command::new("c1", "start").with_param("processId", "app2");
    assert_eq!(cmd.process_id(), Some("app2"));
}

#[test]
fn force_parses_literal_true() {
    let cmd = Command::new("c1", "register").with_param("force", "true");
    assert!(cmd.force());
    let cmd = Command::new("c1", "register").with_param("force", "false");
    assert!(!cmd.force());
    let cmd = Command::new("c1", "register");
    assert!(!cmd.force());
}

#[test]
fn response_serializes_with_command_id() {
    let resp = Response::ok("c1", 1000, None);
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["commandId"], "c1");
    assert_eq!(json["success"], true);
}
