use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::warn;

use crate::application::clients::{EmailMessage, EmailSender};
use crate::application::repos::{CreateWaitlistEntryParams, RepoError, WaitlistRepo};
use crate::domain::entities::WaitlistEntryRecord;

#[derive(Debug, Error)]
pub enum WaitlistError {
    #[error("email is already on the waitlist")]
    AlreadyJoined,
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct JoinWaitlistCommand {
    pub email: String,
    pub name: Option<String>,
    pub city: Option<String>,
}

#[derive(Clone)]
pub struct WaitlistService {
    repo: Arc<dyn WaitlistRepo>,
    mailer: Arc<dyn EmailSender>,
}

impl WaitlistService {
    pub fn new(repo: Arc<dyn WaitlistRepo>, mailer: Arc<dyn EmailSender>) -> Self {
        Self { repo, mailer }
    }

    pub async fn join(
        &self,
        command: JoinWaitlistCommand,
    ) -> Result<WaitlistEntryRecord, WaitlistError> {
        let email = command.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(WaitlistError::Validation("a valid email address is required"));
        }

        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(WaitlistError::AlreadyJoined);
        }

        let entry = self
            .repo
            .add_entry(CreateWaitlistEntryParams {
                email: email.clone(),
                name: command.name.filter(|value| !value.trim().is_empty()),
                city: command.city.filter(|value| !value.trim().is_empty()),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => WaitlistError::AlreadyJoined,
                other => WaitlistError::Repo(other),
            })?;

        // Delivery problems must never fail the signup itself.
        let greeting = entry.name.clone().unwrap_or_else(|| "there".to_string());
        let message = EmailMessage {
            to: email,
            subject: "You're on the Veridia waitlist".to_string(),
            html_body: format!(
                "<p>Hi {greeting},</p><p>Thanks for joining the Veridia waitlist. \
                 We'll let you know as soon as early access opens in your city.</p>"
            ),
            text_body: None,
            tags: vec!["waitlist".to_string(), "welcome".to_string()],
        };
        if let Err(err) = self.mailer.send(message).await {
            counter!("veridia_email_failed_total").increment(1);
            warn!(
                target = "veridia::waitlist",
                error = %err,
                "welcome email delivery failed"
            );
        } else {
            counter!("veridia_email_sent_total").increment(1);
        }

        Ok(entry)
    }

    pub async fn count(&self) -> Result<u64, WaitlistError> {
        self.repo.count_entries().await.map_err(WaitlistError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::application::clients::{ClientError, EmailDelivery};

    #[derive(Default)]
    struct StubWaitlistRepo {
        entries: Mutex<Vec<WaitlistEntryRecord>>,
    }

    #[async_trait]
    impl WaitlistRepo for StubWaitlistRepo {
        async fn add_entry(
            &self,
            params: CreateWaitlistEntryParams,
        ) -> Result<WaitlistEntryRecord, RepoError> {
            let entry = WaitlistEntryRecord {
                id: Uuid::new_v4(),
                email: params.email,
                name: params.name,
                city: params.city,
                created_at: OffsetDateTime::now_utc(),
            };
            self.entries.lock().unwrap().push(entry.clone());
            Ok(entry)
        }

        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<WaitlistEntryRecord>, RepoError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .find(|entry| entry.email == email)
                .cloned())
        }

        async fn count_entries(&self) -> Result<u64, RepoError> {
            Ok(self.entries.lock().unwrap().len() as u64)
        }
    }

    struct RecordingMailer {
        fail: bool,
        sent: Mutex<Vec<EmailMessage>>,
    }

    impl RecordingMailer {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmailSender for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> Result<EmailDelivery, ClientError> {
            if self.fail {
                return Err(ClientError::Transport("connection refused".into()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(EmailDelivery { message_id: None })
        }
    }

    fn command(email: &str) -> JoinWaitlistCommand {
        JoinWaitlistCommand {
            email: email.to_string(),
            name: Some("Ravi".to_string()),
            city: Some("Pune".to_string()),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_once() {
        let repo = Arc::new(StubWaitlistRepo::default());
        let mailer = Arc::new(RecordingMailer::new(false));
        let service = WaitlistService::new(repo.clone(), mailer);

        service.join(command("ravi@example.com")).await.expect("joins");
        let second = service.join(command("RAVI@example.com")).await;

        assert!(matches!(second, Err(WaitlistError::AlreadyJoined)));
        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_the_signup() {
        let repo = Arc::new(StubWaitlistRepo::default());
        let mailer = Arc::new(RecordingMailer::new(true));
        let service = WaitlistService::new(repo, mailer);

        let entry = service
            .join(command("ravi@example.com"))
            .await
            .expect("signup survives mail outage");
        assert_eq!(entry.email, "ravi@example.com");
    }

    #[tokio::test]
    async fn welcome_email_goes_to_the_new_entry() {
        let repo = Arc::new(StubWaitlistRepo::default());
        let mailer = Arc::new(RecordingMailer::new(false));
        let service = WaitlistService::new(repo, mailer.clone());

        service.join(command("ravi@example.com")).await.expect("joins");

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ravi@example.com");
    }
}
