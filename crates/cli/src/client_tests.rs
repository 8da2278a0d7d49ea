use super::*;
use ghost_core::Response;
use serial_test::serial;
use tempfile::tempdir;
use tokio::net::UnixListener;

/// A minimal stand-in for `ghostd`'s listener: does the Hello handshake, then
/// replies to every `Command` with a canned `Response`. Exercises only the
/// client's framing and error-mapping, not the real dispatch path (covered by
/// the daemon crate's own listener tests).
async fn serve_once(listener: UnixListener, response: Response) {
    let (mut stream, _) = listener.accept().await.unwrap();
    let hello: WireRequest = decode(&read_message(&mut stream).await.unwrap()).unwrap();
    assert!(matches!(hello, WireRequest::Hello { .. }));
    write_message(&mut stream, &encode(&WireResponse::Hello { version: PROTOCOL_VERSION.to_string() }).unwrap())
        .await
        .unwrap();

    let request: WireRequest = decode(&read_message(&mut stream).await.unwrap()).unwrap();
    assert!(matches!(request, WireRequest::Command(_)));
    write_message(&mut stream, &encode(&WireResponse::Command(response)).unwrap()).await.unwrap();
}

fn set_state_dir(dir: &std::path::Path) {
    std::env::remove_var("XDG_STATE_HOME");
    std::env::set_var("GHOST_STATE_DIR", dir);
}

#[tokio::test]
#[serial]
async fn connect_fails_when_no_socket_is_present() {
    let dir = tempdir().unwrap();
    set_state_dir(dir.path());

    let err = DaemonClient::connect().unwrap_err();
    assert!(err.is_not_running());
}

#[tokio::test]
#[serial]
async fn ping_round_trips_a_successful_response() {
    let dir = tempdir().unwrap();
    set_state_dir(dir.path());
    let socket_path = dir.path().join("ghostd.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();

    let server = tokio::spawn(serve_once(
        listener,
        Response::ok("cli-ping", 0, Some(serde_json::json!({"DaemonStatus": "Running"}))),
    ));

    let client = DaemonClient::connect().unwrap();
    let data = client.ping().await.unwrap();
    assert_eq!(data["DaemonStatus"], "Running");

    server.await.unwrap();
}

#[tokio::test]
#[serial]
async fn a_command_level_failure_surfaces_as_client_command_error() {
    let dir = tempdir().unwrap();
    set_state_dir(dir.path());
    let socket_path = dir.path().join("ghostd.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();

    let server =
        tokio::spawn(serve_once(listener, Response::err("cli-start", 0, "NotFound: no such process")));

    let client = DaemonClient::connect().unwrap();
    let err = client.start("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::Command(ref msg) if msg.contains("NotFound")));

    server.await.unwrap();
}
