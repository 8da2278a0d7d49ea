use super::*;

#[test]
fn parse_key_val_splits_on_the_first_equals() {
    assert_eq!(parse_key_val("FOO=bar=baz").unwrap(), ("FOO".to_string(), "bar=baz".to_string()));
}

#[test]
fn parse_key_val_rejects_a_value_with_no_equals() {
    assert!(parse_key_val("FOO").is_err());
}

#[test]
fn render_process_state_line_falls_back_on_missing_fields() {
    let state = serde_json::json!({});
    let line = render_process_state_line(&state);
    assert!(line.contains('?'));
}

#[test]
fn render_process_state_line_includes_id_and_status() {
    let state = serde_json::json!({"id": "web", "status": "Running", "executablePath": "/bin/web"});
    let line = render_process_state_line(&state);
    assert!(line.contains("web"));
    assert!(line.contains("Running"));
}
