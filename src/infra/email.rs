//! Mailgun-backed mail delivery.

use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;
use tracing::{debug, info};

use crate::application::clients::{ClientError, EmailDelivery, EmailMessage, EmailSender};
use crate::config::EmailSettings;

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: Option<String>,
}

/// HTTP client for the Mailgun messages API. When the `email.enabled` flag is
/// off, messages are logged and reported as delivered so local setups work
/// without provider credentials.
pub struct MailgunMailer {
    client: reqwest::Client,
    settings: EmailSettings,
}

impl MailgunMailer {
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "https://{}/v3/{}/messages",
            self.settings.endpoint, self.settings.domain
        )
    }
}

#[async_trait]
impl EmailSender for MailgunMailer {
    async fn send(&self, message: EmailMessage) -> Result<EmailDelivery, ClientError> {
        if !self.settings.enabled {
            info!(
                target = "veridia::email",
                recipient = %message.to,
                subject = %message.subject,
                "email delivery disabled; message logged only"
            );
            return Ok(EmailDelivery { message_id: None });
        }

        let mut form: Vec<(&str, String)> = vec![
            ("from", self.settings.from.clone()),
            ("to", message.to.clone()),
            ("subject", message.subject.clone()),
            ("html", message.html_body.clone()),
        ];
        if let Some(text) = message.text_body.as_ref() {
            form.push(("text", text.clone()));
        }
        for tag in &message.tags {
            form.push(("o:tag", tag.clone()));
        }

        let started = Instant::now();
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.settings.api_key))
            .form(&form)
            .send()
            .await
            .map_err(ClientError::transport)?;
        histogram!("veridia_provider_request_ms", "provider" => "mailgun")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MailgunResponse = response.json().await.map_err(ClientError::transport)?;
        debug!(
            target = "veridia::email",
            recipient = %message.to,
            message_id = parsed.id.as_deref().unwrap_or("-"),
            "email accepted by provider"
        );
        Ok(EmailDelivery {
            message_id: parsed.id,
        })
    }
}
