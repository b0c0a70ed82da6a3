use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChatChannel, NotificationError};
use crate::config::TelegramConfig;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_notification: bool,
}

/// Posts admin messages through the Telegram Bot API
#[derive(Clone)]
pub struct TelegramChatChannel {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl TelegramChatChannel {
    pub fn new(config: TelegramConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.bot_token
        )
    }
}

#[async_trait]
impl ChatChannel for TelegramChatChannel {
    async fn send(&self, text: String) -> Result<(), NotificationError> {
        if self.config.bot_token.is_empty() {
            warn!("Telegram bot token not configured, skipping admin message");
            return Ok(());
        }
        if self.config.admin_chat_id.is_empty() {
            warn!("Telegram admin chat id not configured, skipping admin message");
            return Ok(());
        }

        let payload = SendMessage {
            chat_id: &self.config.admin_chat_id,
            text: &text,
            parse_mode: "HTML",
            disable_notification: false,
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(message_length = text.len(), "telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_html_message_to_admin_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(json!({
                "chat_id": "-100500",
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "disable_notification": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let channel = TelegramChatChannel::new(TelegramConfig {
            api_base_url: server.uri(),
            bot_token: "123:abc".into(),
            admin_chat_id: "-100500".into(),
        })
        .unwrap();

        channel.send("<b>hi</b>".into()).await.unwrap();
    }

    #[tokio::test]
    async fn missing_token_skips_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let channel = TelegramChatChannel::new(TelegramConfig {
            api_base_url: server.uri(),
            bot_token: String::new(),
            admin_chat_id: "-100500".into(),
        })
        .unwrap();

        assert!(channel.send("hi".into()).await.is_ok());
    }
}
