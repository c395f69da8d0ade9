use anyhow::Result;
use fuel_report_bot::core::BotApi;
use fuel_report_bot::domain::model::{Input, Keyboard};
use fuel_report_bot::{BotError, TelegramClient};
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;

const TOKEN: &str = "123456:TEST-token";

fn client_for(server: &MockServer) -> TelegramClient {
    TelegramClient::new(&server.base_url(), TOKEN).expect("client builds")
}

#[tokio::test]
async fn test_get_updates_decodes_messages_and_offset() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/bot{}/getUpdates", TOKEN))
                .json_body_partial(r#"{"offset": 100, "timeout": 5}"#);
            then.status(200).json_body(json!({
                "ok": true,
                "result": [
                    {
                        "update_id": 100,
                        "message": {
                            "message_id": 1,
                            "chat": {"id": 42, "type": "private"},
                            "text": "/start@fuel_bot"
                        }
                    },
                    {
                        "update_id": 101,
                        "message": {
                            "message_id": 2,
                            "chat": {"id": 42, "type": "private"},
                            "sticker": {"file_id": "x"}
                        }
                    },
                    {"update_id": 103, "edited_message": {"message_id": 1}}
                ]
            }));
        })
        .await;

    let batch = client_for(&server)
        .get_updates(Some(100), Duration::from_secs(5))
        .await?;

    mock.assert_async().await;
    assert_eq!(batch.last_update_id, Some(103));
    assert_eq!(batch.messages.len(), 2);
    assert_eq!(batch.messages[0].chat_id, 42);
    assert_eq!(batch.messages[0].input, Input::Command("start".to_string()));
    assert_eq!(batch.messages[1].input, Input::Other);
    Ok(())
}

#[tokio::test]
async fn test_empty_poll() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/bot{}/getUpdates", TOKEN));
            then.status(200).json_body(json!({"ok": true, "result": []}));
        })
        .await;

    let batch = client_for(&server)
        .get_updates(None, Duration::from_secs(1))
        .await?;
    assert_eq!(batch.last_update_id, None);
    assert!(batch.messages.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_send_message_with_keyboard() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/bot{}/sendMessage", TOKEN))
                .json_body(json!({
                    "chat_id": 42,
                    "text": "Выберите топливо",
                    "reply_markup": {
                        "keyboard": [[{"text": "HFO"}, {"text": "MDO"}]],
                        "one_time_keyboard": true,
                        "resize_keyboard": true
                    }
                }));
            then.status(200)
                .json_body(json!({"ok": true, "result": {"message_id": 9}}));
        })
        .await;

    client_for(&server)
        .send_message(42, "Выберите топливо", Keyboard::Fuel)
        .await?;
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_send_message_without_keyboard_omits_markup() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/bot{}/sendMessage", TOKEN))
                .json_body(json!({"chat_id": 7, "text": "hello"}));
            then.status(200)
                .json_body(json!({"ok": true, "result": {"message_id": 1}}));
        })
        .await;

    client_for(&server)
        .send_message(7, "hello", Keyboard::None)
        .await?;
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_send_document_is_multipart_pdf() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/bot{}/sendDocument", TOKEN))
                .body_contains("filename=\"LSMGO_DMA_SEA_280525.pdf\"")
                .body_contains("application/pdf")
                .body_contains("%PDF-1.4");
            then.status(200)
                .json_body(json!({"ok": true, "result": {"message_id": 3}}));
        })
        .await;

    client_for(&server)
        .send_document(42, "LSMGO_DMA_SEA_280525.pdf", b"%PDF-1.4 body".to_vec())
        .await?;
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/bot{}/getUpdates", TOKEN));
            then.status(429).json_body(json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 7",
                "parameters": {"retry_after": 7}
            }));
        })
        .await;

    let err = client_for(&server)
        .get_updates(None, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::TelegramApiError { code: 429, .. }));
    assert_eq!(err.retry_after(), Some(7));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_is_not_retryable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/bot{}/getUpdates", TOKEN));
            then.status(401).json_body(json!({
                "ok": false,
                "error_code": 401,
                "description": "Unauthorized"
            }));
        })
        .await;

    let err = client_for(&server)
        .get_updates(None, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn test_non_json_gateway_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/bot{}/sendMessage", TOKEN));
            then.status(502).body("<html>Bad Gateway</html>");
        })
        .await;

    let err = client_for(&server)
        .send_message(1, "x", Keyboard::None)
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::TelegramApiError { code: 502, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_transport_errors_hide_the_token() {
    // Nothing listens on port 9 locally; the connection is refused.
    let client = TelegramClient::new("http://127.0.0.1:9", TOKEN).expect("client builds");
    let err = client
        .get_updates(None, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::ApiError(_)));
    assert!(!err.to_string().contains(TOKEN));
    assert!(!format!("{:?}", err).contains(TOKEN));
}
