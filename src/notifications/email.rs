use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{EmailChannel, EmailMessage, NotificationError};
use crate::config::EmailConfig;

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends customer e-mail through an HTTP mail relay (`POST {api_url}` with a bearer key).
/// Without a relay URL messages are skipped with a warning.
#[derive(Clone)]
pub struct HttpEmailChannel {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpEmailChannel {
    pub fn new(config: EmailConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EmailChannel for HttpEmailChannel {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let Some(api_url) = self.config.api_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!(to = %message.to, "mail relay not configured, skipping e-mail");
            return Ok(());
        };

        let request = RelayRequest {
            from: &self.config.from_address,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
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

        debug!(to = %message.to, subject = %message.subject, "e-mail accepted by relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage {
            to: "anna@example.com".into(),
            subject: "Order confirmation".into(),
            html: "<p>hi</p>".into(),
        }
    }

    #[tokio::test]
    async fn posts_message_to_relay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("Authorization", "Bearer relay-key"))
            .and(body_json(json!({
                "from": "shop@example.com",
                "to": ["anna@example.com"],
                "subject": "Order confirmation",
                "html": "<p>hi</p>"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let channel = HttpEmailChannel::new(EmailConfig {
            api_url: Some(format!("{}/send", server.uri())),
            api_key: "relay-key".into(),
            from_address: "shop@example.com".into(),
            shop_name: "Flower Shop".into(),
        })
        .unwrap();

        channel.send(message()).await.unwrap();
    }

    #[tokio::test]
    async fn relay_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let channel = HttpEmailChannel::new(EmailConfig {
            api_url: Some(server.uri()),
            ..EmailConfig::default()
        })
        .unwrap();

        let err = channel.send(message()).await.unwrap_err();
        assert!(matches!(err, NotificationError::Rejected { status: 503, .. }));
    }

    #[tokio::test]
    async fn unconfigured_relay_is_skipped() {
        let channel = HttpEmailChannel::new(EmailConfig::default()).unwrap();
        assert!(channel.send(message()).await.is_ok());
    }
}
