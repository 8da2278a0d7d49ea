use super::*;

#[test]
fn command_request_roundtrips_through_json() {
    let req = WireRequest::Command(Command::new("c1", "ping"));
    let json = serde_json::to_string(&req).unwrap();
    let back: WireRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(req, back);
}

#[test]
fn hello_tag_is_discriminated_by_type_field() {
    let req = WireRequest::Hello { version: "1".to_string() };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json["type"], "Hello");
    assert_eq!(json["version"], "1");
}

#[test]
fn publish_carries_arbitrary_json_payload() {
    let req = WireRequest::Publish {
        topic: "ghost:health:app1".to_string(),
        payload: serde_json::json!({"status": "Running"}),
    };
    let json = serde_json::to_string(&req).unwrap();
    let back: WireRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(req, back);
}
