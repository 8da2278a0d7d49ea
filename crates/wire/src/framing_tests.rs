use super::*;

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = WireResponse::Published;
    let encoded = encode(&response).unwrap();
    let json_str = std::str::from_utf8(&encoded).unwrap();
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.unwrap();
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.unwrap();
    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_big_endian_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.unwrap();

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_message_rejects_oversized_length_prefix() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&(MAX_MESSAGE_BYTES + 1).to_be_bytes());
    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge(_, _)));
}

#[tokio::test]
async fn request_response_roundtrip_over_a_buffer() {
    let request = WireRequest::Command(ghost_core::Command::new("c1", "ping"));
    let mut buffer = Vec::new();
    write_message(&mut buffer, &encode(&request).unwrap()).await.unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let decoded = read_request(&mut cursor).await.unwrap();
    assert_eq!(decoded, request);
}

#[tokio::test]
async fn write_response_then_read_message_roundtrips() {
    let response = WireResponse::Hello { version: crate::PROTOCOL_VERSION.to_string() };
    let mut buffer = Vec::new();
    write_response(&mut buffer, &response).await.unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let bytes = read_message(&mut cursor).await.unwrap();
    let decoded: WireResponse = decode(&bytes).unwrap();
    assert_eq!(decoded, response);
}
