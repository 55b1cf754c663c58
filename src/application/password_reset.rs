use std::sync::Arc;

use metrics::counter;
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::warn;

use crate::application::auth::hash_password;
use crate::application::clients::{EmailMessage, EmailSender};
use crate::application::repos::{PasswordResetsRepo, RepoError, UsersRepo};

const TOKEN_TTL: Duration = Duration::minutes(15);
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum PasswordResetError {
    #[error("invalid or expired reset code")]
    InvalidToken,
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Email-delivered one-time codes for account recovery. Requests for unknown
/// addresses succeed silently so the endpoint cannot be used to probe which
/// emails have accounts.
#[derive(Clone)]
pub struct PasswordResetService {
    users: Arc<dyn UsersRepo>,
    resets: Arc<dyn PasswordResetsRepo>,
    mailer: Arc<dyn EmailSender>,
}

impl PasswordResetService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        resets: Arc<dyn PasswordResetsRepo>,
        mailer: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            users,
            resets,
            mailer,
        }
    }

    pub async fn request_reset(&self, email: &str) -> Result<(), PasswordResetError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(PasswordResetError::Validation(
                "a valid email address is required",
            ));
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            // Same outward response as the happy path.
            return Ok(());
        };

        let token = generate_token();
        let expires_at = OffsetDateTime::now_utc() + TOKEN_TTL;
        self.resets
            .upsert_token(&user.email, &hash_token(&token), expires_at)
            .await?;

        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Your password reset code".to_string(),
            html_body: format!(
                "<p>Hi {name},</p><p>Your password reset code is <strong>{token}</strong>. \
                 It expires in 15 minutes.</p><p>If you did not request this, you can \
                 ignore this email.</p>",
                name = user.display_name,
            ),
            text_body: Some(format!(
                "Your password reset code is {token}. It expires in 15 minutes."
            )),
            tags: vec!["password-reset".to_string()],
        };
        match self.mailer.send(message).await {
            Ok(_) => {
                counter!("veridia_email_sent_total").increment(1);
            }
            Err(err) => {
                counter!("veridia_email_failed_total").increment(1);
                warn!(
                    target = "veridia::password_reset",
                    error = %err,
                    "reset email delivery failed"
                );
            }
        }
        Ok(())
    }

    pub async fn verify_token(&self, email: &str, token: &str) -> Result<(), PasswordResetError> {
        let email = email.trim().to_lowercase();
        self.lookup_valid(&email, token).await.map(|_| ())
    }

    pub async fn confirm(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        let email = email.trim().to_lowercase();
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(PasswordResetError::Validation(
                "password must be at least 6 characters",
            ));
        }

        self.lookup_valid(&email, token).await?;

        let password_hash = hash_password(new_password)
            .map_err(|_| PasswordResetError::Validation("password could not be processed"))?;

        self.users.update_password(&email, &password_hash).await?;
        self.resets
            .mark_used(&email, OffsetDateTime::now_utc())
            .await?;
        Ok(())
    }

    async fn lookup_valid(&self, email: &str, token: &str) -> Result<(), PasswordResetError> {
        let record = self
            .resets
            .find_by_email(email)
            .await?
            .ok_or(PasswordResetError::InvalidToken)?;
        if record.used
            || record.expires_at <= OffsetDateTime::now_utc()
            || record.token_hash != hash_token(token)
        {
            return Err(PasswordResetError::InvalidToken);
        }
        Ok(())
    }
}

fn generate_token() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:06}")
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::application::auth::verify_password;
    use crate::application::clients::{ClientError, EmailDelivery};
    use crate::application::repos::CreateUserParams;
    use crate::domain::entities::{PasswordResetRecord, UserRecord};
    use crate::domain::types::UserRole;

    #[derive(Default)]
    struct StubUsersRepo {
        users: Mutex<Vec<UserRecord>>,
    }

    impl StubUsersRepo {
        fn seed(&self, email: &str) {
            let now = OffsetDateTime::now_utc();
            self.users.lock().unwrap().push(UserRecord {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: hash_password("original-pass").unwrap(),
                display_name: "Asha".into(),
                role: UserRole::Member,
                created_at: now,
                updated_at: now,
            });
        }
    }

    #[async_trait]
    impl UsersRepo for StubUsersRepo {
        async fn create_user(&self, _params: CreateUserParams) -> Result<UserRecord, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|user| user.email == email)
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|user| user.id == id)
                .cloned())
        }

        async fn update_password(
            &self,
            email: &str,
            password_hash: &str,
        ) -> Result<(), RepoError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .iter_mut()
                .find(|user| user.email == email)
                .ok_or(RepoError::NotFound)?;
            user.password_hash = password_hash.to_string();
            Ok(())
        }

        async fn update_role(&self, _id: Uuid, _role: UserRole) -> Result<(), RepoError> {
            Ok(())
        }

        async fn count_users(&self) -> Result<u64, RepoError> {
            Ok(self.users.lock().unwrap().len() as u64)
        }
    }

    #[derive(Default)]
    struct StubResetsRepo {
        rows: Mutex<Vec<PasswordResetRecord>>,
    }

    #[async_trait]
    impl PasswordResetsRepo for StubResetsRepo {
        async fn upsert_token(
            &self,
            email: &str,
            token_hash: &str,
            expires_at: OffsetDateTime,
        ) -> Result<(), RepoError> {
            let mut rows = self.rows.lock().unwrap();
            rows.retain(|row| row.email != email);
            rows.push(PasswordResetRecord {
                email: email.to_string(),
                token_hash: token_hash.to_string(),
                expires_at,
                used: false,
                created_at: OffsetDateTime::now_utc(),
                used_at: None,
            });
            Ok(())
        }

        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<PasswordResetRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.email == email)
                .cloned())
        }

        async fn mark_used(&self, email: &str, used_at: OffsetDateTime) -> Result<(), RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.email == email)
                .ok_or(RepoError::NotFound)?;
            row.used = true;
            row.used_at = Some(used_at);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for CapturingMailer {
        async fn send(&self, message: EmailMessage) -> Result<EmailDelivery, ClientError> {
            self.sent.lock().unwrap().push(message);
            Ok(EmailDelivery { message_id: None })
        }
    }

    fn extract_token(mailer: &CapturingMailer) -> String {
        let sent = mailer.sent.lock().unwrap();
        let text = sent[0].text_body.clone().unwrap();
        text.chars().filter(|ch| ch.is_ascii_digit()).take(6).collect()
    }

    #[tokio::test]
    async fn reset_flow_changes_the_password_once() {
        let users = Arc::new(StubUsersRepo::default());
        users.seed("asha@example.com");
        let resets = Arc::new(StubResetsRepo::default());
        let mailer = Arc::new(CapturingMailer::default());
        let service =
            PasswordResetService::new(users.clone(), resets.clone(), mailer.clone());

        service.request_reset("asha@example.com").await.expect("request");
        let token = extract_token(&mailer);
        assert_eq!(token.len(), 6);

        service
            .verify_token("asha@example.com", &token)
            .await
            .expect("verify");
        service
            .confirm("asha@example.com", &token, "brand-new-pass")
            .await
            .expect("confirm");

        let stored = users.users.lock().unwrap()[0].password_hash.clone();
        assert!(verify_password("brand-new-pass", &stored));

        // The code is single-use.
        let again = service
            .confirm("asha@example.com", &token, "another-pass")
            .await;
        assert!(matches!(again, Err(PasswordResetError::InvalidToken)));
    }

    #[tokio::test]
    async fn unknown_email_gets_the_same_answer_and_no_mail() {
        let users = Arc::new(StubUsersRepo::default());
        let resets = Arc::new(StubResetsRepo::default());
        let mailer = Arc::new(CapturingMailer::default());
        let service =
            PasswordResetService::new(users, resets, mailer.clone());

        service.request_reset("nobody@example.com").await.expect("request");
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let users = Arc::new(StubUsersRepo::default());
        users.seed("asha@example.com");
        let resets = Arc::new(StubResetsRepo::default());
        let mailer = Arc::new(CapturingMailer::default());
        let service = PasswordResetService::new(users, resets, mailer);

        service.request_reset("asha@example.com").await.expect("request");
        let result = service.verify_token("asha@example.com", "000000x").await;
        assert!(matches!(result, Err(PasswordResetError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let users = Arc::new(StubUsersRepo::default());
        users.seed("asha@example.com");
        let resets = Arc::new(StubResetsRepo::default());
        let mailer = Arc::new(CapturingMailer::default());
        let service =
            PasswordResetService::new(users, resets.clone(), mailer.clone());

        service.request_reset("asha@example.com").await.expect("request");
        let token = extract_token(&mailer);
        resets.rows.lock().unwrap()[0].expires_at =
            OffsetDateTime::now_utc() - Duration::minutes(1);

        let result = service.verify_token("asha@example.com", &token).await;
        assert!(matches!(result, Err(PasswordResetError::InvalidToken)));
    }

    #[tokio::test]
    async fn short_replacement_password_is_rejected() {
        let users = Arc::new(StubUsersRepo::default());
        users.seed("asha@example.com");
        let resets = Arc::new(StubResetsRepo::default());
        let mailer = Arc::new(CapturingMailer::default());
        let service = PasswordResetService::new(users, resets, mailer.clone());

        service.request_reset("asha@example.com").await.expect("request");
        let token = extract_token(&mailer);
        let result = service.confirm("asha@example.com", &token, "tiny").await;
        assert!(matches!(result, Err(PasswordResetError::Validation(_))));
    }
}
