use std::time::Duration;

use futures_util::TryStreamExt;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relay_telegram::{
    keyboard, Api, ClientConfig, OutgoingMessage, ReplyKeyboard, TelegramError,
};
use relay_updates::{PollError, UpdateSource};

const TOKEN: &str = "42:TEST";

/// Test factory functions
fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new()
        .with_base_url(server.uri())
        .with_request_timeout(Duration::from_secs(5))
        .with_long_poll_timeout(None)
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
}

async fn mount_get_me(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/bot42:TEST/getMe"))
        .and(header("accept", "application/json"))
        .respond_with(ok(json!({
            "id": 42, "is_bot": true, "first_name": "Relay", "username": "relay_bot"
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// T1. Connecting verifies the token with getMe
#[tokio::test]
async fn test_connect_checks_token() {
    let server = MockServer::start().await;
    mount_get_me(&server).await;

    let api = Api::connect(TOKEN, config(&server)).await.unwrap();

    assert_eq!(api.me().map(|me| me.username()), Some("relay_bot"));
}

/// T2. A rejected token fails connect with a fatal error
#[tokio::test]
async fn test_connect_rejected_token_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(path("/bot42:TEST/getMe"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false, "error_code": 401, "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let err = Api::connect(TOKEN, config(&server)).await.unwrap_err();

    assert!(matches!(err, TelegramError::Status { status: 401, .. }));
    assert!(!err.is_transient());
    assert!(!err.to_string().contains("TEST"));
}

/// U1. Offset is left out when zero and sent otherwise
#[tokio::test]
async fn test_get_updates_offset_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bot42:TEST/getUpdates"))
        .and(query_param_is_missing("offset"))
        .respond_with(ok(json!([{"update_id": 1}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bot42:TEST/getUpdates"))
        .and(query_param("offset", "2"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = Api::new(TOKEN, config(&server)).unwrap();

    assert_eq!(api.get_updates(None).await.unwrap().len(), 1);
    assert_eq!(api.get_updates(Some(0)).await.unwrap().len(), 1);
    assert!(api.get_updates(Some(2)).await.unwrap().is_empty());
}

/// U2. The long-poll window is sent in seconds
#[tokio::test]
async fn test_get_updates_long_poll_timeout() {
    let server = MockServer::start().await;
    Mock::given(path("/bot42:TEST/getUpdates"))
        .and(query_param("timeout", "3"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server).with_long_poll_timeout(Some(Duration::from_secs(3)));
    let api = Api::new(TOKEN, config).unwrap();

    assert!(api.get_updates(None).await.unwrap().is_empty());
}

/// U3. As an update source, ids come from update_id and errors are classified
#[tokio::test]
async fn test_update_source_poll() {
    let server = MockServer::start().await;
    Mock::given(path("/bot42:TEST/getUpdates"))
        .and(query_param("offset", "10"))
        .respond_with(ok(json!([
            {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 5, "type": "private"}, "text": "hi"}},
            {"update_id": 12}
        ])))
        .mount(&server)
        .await;
    Mock::given(path("/bot42:TEST/getUpdates"))
        .and(query_param("offset", "13"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    Mock::given(path("/bot42:TEST/getUpdates"))
        .and(query_param("offset", "14"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "ok": false, "error_code": 404, "description": "Not Found"
        })))
        .mount(&server)
        .await;

    let api = Api::new(TOKEN, config(&server)).unwrap();

    let batch = api.poll(Some(10)).await.unwrap();
    let ids: Vec<i64> = batch.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![10, 12]);
    assert_eq!(batch[0].payload.message.as_ref().and_then(|m| m.text.as_deref()), Some("hi"));

    assert!(matches!(api.poll(Some(13)).await, Err(PollError::Transient(_))));
    assert!(matches!(api.poll(Some(14)).await, Err(PollError::Fatal(_))));
}

/// M1. sendMessage posts the JSON body and returns the sent message
#[tokio::test]
async fn test_send_message_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot42:TEST/sendMessage"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "chat_id": 5,
            "text": "echo: hi",
            "reply_to_message_id": 1,
            "reply_markup": {
                "keyboard": [[{"text": "again"}]],
                "resize_keyboard": true
            }
        })))
        .respond_with(ok(json!({
            "message_id": 2, "chat": {"id": 5, "type": "private"}, "text": "echo: hi"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = Api::new(TOKEN, config(&server)).unwrap();
    let message = OutgoingMessage::text(5, "echo: hi")
        .in_reply_to(1)
        .with_keyboard(ReplyKeyboard::new([keyboard::row([keyboard::button("again")])]));

    let sent = api.send_message(&message).await.unwrap();

    assert_eq!(sent.message_id, 2);
    assert_eq!(sent.chat.id, 5);
}

/// F1. Files are resolved with getFile and streamed from the file endpoint
#[tokio::test]
async fn test_open_file_streams_body() {
    let server = MockServer::start().await;
    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 256) as u8).collect();

    Mock::given(method("POST"))
        .and(path("/bot42:TEST/getFile"))
        .and(body_json(json!({"file_id": "AgAD"})))
        .respond_with(ok(json!({
            "file_id": "AgAD", "file_unique_id": "u1", "file_size": 200000, "file_path": "photos/file_1.jpg"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file/bot42:TEST/photos/file_1.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let api = Api::new(TOKEN, config(&server)).unwrap();
    let remote = api.open_file("AgAD").await.unwrap();

    assert_eq!(remote.file.file_size, Some(200_000));
    let chunks: Vec<bytes::Bytes> = remote.stream.try_collect().await.unwrap();
    let downloaded: Vec<u8> = chunks.concat();
    assert_eq!(downloaded, payload);
}

/// F2. A file without a download path is reported, not fetched
#[tokio::test]
async fn test_open_file_without_path() {
    let server = MockServer::start().await;
    Mock::given(path("/bot42:TEST/getFile"))
        .respond_with(ok(json!({"file_id": "big", "file_unique_id": "u"})))
        .mount(&server)
        .await;

    let api = Api::new(TOKEN, config(&server)).unwrap();

    assert!(matches!(
        api.open_file("big").await,
        Err(TelegramError::MissingFilePath { file_id }) if file_id == "big"
    ));
}
