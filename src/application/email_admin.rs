use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::application::clients::{ClientError, EmailDelivery, EmailMessage, EmailSender};

#[derive(Debug, Error)]
pub enum EmailAdminError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("email delivery failed: {0}")]
    Delivery(#[from] ClientError),
}

#[derive(Debug, Clone)]
pub struct SendEmailCommand {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub tags: Vec<String>,
}

/// Operator-facing email sending; unlike the transactional flows, delivery
/// failures here are surfaced to the caller.
#[derive(Clone)]
pub struct EmailAdminService {
    mailer: Arc<dyn EmailSender>,
}

impl EmailAdminService {
    pub fn new(mailer: Arc<dyn EmailSender>) -> Self {
        Self { mailer }
    }

    pub async fn send_custom(
        &self,
        command: SendEmailCommand,
    ) -> Result<EmailDelivery, EmailAdminError> {
        let to = command.to.trim().to_string();
        if to.is_empty() || !to.contains('@') {
            return Err(EmailAdminError::Validation("a valid recipient is required"));
        }
        if command.subject.trim().is_empty() {
            return Err(EmailAdminError::Validation("subject must not be empty"));
        }
        if command.html_body.trim().is_empty() {
            return Err(EmailAdminError::Validation("body must not be empty"));
        }

        let tags = if command.tags.is_empty() {
            vec!["admin".to_string()]
        } else {
            command.tags
        };

        let delivery = self
            .mailer
            .send(EmailMessage {
                to: to.clone(),
                subject: command.subject.trim().to_string(),
                html_body: command.html_body,
                text_body: command.text_body,
                tags,
            })
            .await
            .inspect_err(|_| {
                counter!("veridia_email_failed_total").increment(1);
            })?;

        counter!("veridia_email_sent_total").increment(1);
        info!(target = "veridia::email", recipient = %to, "admin email sent");
        Ok(delivery)
    }

    pub async fn send_test(&self, to: &str) -> Result<EmailDelivery, EmailAdminError> {
        self.send_custom(SendEmailCommand {
            to: to.to_string(),
            subject: "Veridia test email".to_string(),
            html_body: "<p>This is a test email confirming the mail configuration works.</p>"
                .to_string(),
            text_body: None,
            tags: Vec::new(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakyMailer {
        fail: bool,
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for FlakyMailer {
        async fn send(&self, message: EmailMessage) -> Result<EmailDelivery, ClientError> {
            if self.fail {
                return Err(ClientError::Rejected {
                    status: 401,
                    body: "bad api key".into(),
                });
            }
            self.sent.lock().unwrap().push(message);
            Ok(EmailDelivery {
                message_id: Some("msg-1".into()),
            })
        }
    }

    #[tokio::test]
    async fn delivery_failure_is_surfaced() {
        let service = EmailAdminService::new(Arc::new(FlakyMailer {
            fail: true,
            ..Default::default()
        }));
        let result = service.send_test("ops@example.com").await;
        assert!(matches!(result, Err(EmailAdminError::Delivery(_))));
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let service = EmailAdminService::new(Arc::new(FlakyMailer::default()));
        let result = service
            .send_custom(SendEmailCommand {
                to: "ops@example.com".into(),
                subject: "  ".into(),
                html_body: "<p>hi</p>".into(),
                text_body: None,
                tags: Vec::new(),
            })
            .await;
        assert!(matches!(result, Err(EmailAdminError::Validation(_))));
    }

    #[tokio::test]
    async fn text_body_and_tags_reach_the_mailer() {
        let mailer = Arc::new(FlakyMailer::default());
        let service = EmailAdminService::new(mailer.clone());
        service
            .send_custom(SendEmailCommand {
                to: "ops@example.com".into(),
                subject: "Launch".into(),
                html_body: "<p>We are live</p>".into(),
                text_body: Some("We are live".into()),
                tags: vec!["launch".into()],
            })
            .await
            .expect("sent");

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].text_body.as_deref(), Some("We are live"));
        assert_eq!(sent[0].tags, vec!["launch".to_string()]);
    }

    #[tokio::test]
    async fn test_email_reaches_the_recipient() {
        let mailer = Arc::new(FlakyMailer::default());
        let service = EmailAdminService::new(mailer.clone());
        let delivery = service.send_test("ops@example.com").await.expect("sent");
        assert_eq!(delivery.message_id.as_deref(), Some("msg-1"));
        assert_eq!(mailer.sent.lock().unwrap()[0].to, "ops@example.com");
    }
}
