use super::types::{
    ApiResponse, GetUpdatesRequest, ReplyKeyboardMarkup, SendMessageRequest, Update,
};
use crate::domain::model::{Input, Keyboard};
use crate::domain::ports::{BotApi, IncomingMessage, UpdateBatch};
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
/// Added on top of the long-poll timeout so the HTTP layer never fires first.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Bot API over HTTPS. The token is part of every URL, so request errors are
/// stripped of their URL before they can reach a log line.
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BotError::ApiError(e.without_url()))?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T> {
        let request = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(body);
        self.execute(method, request).await
    }

    async fn execute<T: DeserializeOwned>(&self, method: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| BotError::ApiError(e.without_url()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| BotError::ApiError(e.without_url()))?;

        tracing::debug!(method, status = status.as_u16(), bytes = body.len(), "Bot API response");

        let parsed: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(BotError::SerializationError(e)),
            Err(_) => {
                return Err(BotError::TelegramApiError {
                    code: i64::from(status.as_u16()),
                    description: status
                        .canonical_reason()
                        .unwrap_or("unexpected response")
                        .to_string(),
                    retry_after: None,
                })
            }
        };

        if !parsed.ok {
            return Err(BotError::TelegramApiError {
                code: parsed.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
                retry_after: parsed.parameters.and_then(|p| p.retry_after),
            });
        }

        parsed.result.ok_or_else(|| BotError::TelegramApiError {
            code: i64::from(status.as_u16()),
            description: format!("{} returned ok without a result", method),
            retry_after: None,
        })
    }
}

fn to_incoming(update: Update) -> Option<IncomingMessage> {
    let message = update.message?;
    let input = match message.text.as_deref() {
        Some(text) => Input::from_text(text),
        None => Input::Other,
    };
    Some(IncomingMessage {
        update_id: update.update_id,
        chat_id: message.chat.id,
        input,
    })
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<UpdateBatch> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: vec!["message"],
        };
        let updates: Vec<Update> = self
            .call_json("getUpdates", &request, timeout + POLL_GRACE)
            .await?;

        let last_update_id = updates.iter().map(|u| u.update_id).max();
        let messages = updates.into_iter().filter_map(to_incoming).collect();
        Ok(UpdateBatch {
            last_update_id,
            messages,
        })
    }

    async fn send_message(&self, chat_id: i64, text: &str, keyboard: Keyboard) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_markup: ReplyKeyboardMarkup::from_keyboard(keyboard),
        };
        let _: serde_json::Value = self
            .call_json("sendMessage", &request, REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| BotError::ApiError(e.without_url()))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let request = self
            .client
            .post(self.method_url("sendDocument"))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form);
        let _: serde_json::Value = self.execute("sendDocument", request).await?;
        tracing::debug!(chat_id, file_name, size, "document sent");
        Ok(())
    }
}
