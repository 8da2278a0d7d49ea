use super::*;

#[test]
fn kind_matches_variant() {
    assert_eq!(GhostError::NotFound("app1".into()).kind(), "NotFound");
    assert_eq!(GhostError::StartFailed("boom".into()).kind(), "StartFailed");
}

#[test]
fn response_string_prefixes_kind() {
    let err = GhostError::InvalidState("not running".into());
    assert_eq!(err.to_response_string(), "InvalidState: invalid state: not running");
}
