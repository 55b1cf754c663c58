use std::sync::Arc;

use thiserror::Error;

use crate::application::repos::{NewsletterRepo, RepoError};

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("email is already subscribed")]
    AlreadySubscribed,
    #[error("email is not subscribed")]
    NotSubscribed,
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct NewsletterService {
    repo: Arc<dyn NewsletterRepo>,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn NewsletterRepo>) -> Self {
        Self { repo }
    }

    /// Subscribing an address that previously unsubscribed reactivates it.
    pub async fn subscribe(&self, email: &str) -> Result<(), NewsletterError> {
        let email = normalize(email)?;

        match self.repo.find_by_email(&email).await? {
            Some(existing) if existing.active => Err(NewsletterError::AlreadySubscribed),
            Some(_) => {
                self.repo.set_active(&email, true).await?;
                Ok(())
            }
            None => {
                self.repo
                    .insert_subscriber(&email)
                    .await
                    .map_err(|err| match err {
                        RepoError::Duplicate { .. } => NewsletterError::AlreadySubscribed,
                        other => NewsletterError::Repo(other),
                    })?;
                Ok(())
            }
        }
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<(), NewsletterError> {
        let email = normalize(email)?;
        match self.repo.find_by_email(&email).await? {
            Some(existing) if existing.active => {
                self.repo.set_active(&email, false).await?;
                Ok(())
            }
            _ => Err(NewsletterError::NotSubscribed),
        }
    }
}

fn normalize(email: &str) -> Result<String, NewsletterError> {
    let trimmed = email.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(NewsletterError::Validation("a valid email address is required"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::domain::entities::NewsletterSubscriberRecord;

    #[derive(Default)]
    struct StubNewsletterRepo {
        subscribers: Mutex<Vec<NewsletterSubscriberRecord>>,
    }

    #[async_trait]
    impl NewsletterRepo for StubNewsletterRepo {
        async fn find_by_email(
            &self,
            email: &str,
        ) -> Result<Option<NewsletterSubscriberRecord>, RepoError> {
            Ok(self
                .subscribers
                .lock()
                .unwrap()
                .iter()
                .find(|sub| sub.email == email)
                .cloned())
        }

        async fn insert_subscriber(
            &self,
            email: &str,
        ) -> Result<NewsletterSubscriberRecord, RepoError> {
            let now = OffsetDateTime::now_utc();
            let record = NewsletterSubscriberRecord {
                id: Uuid::new_v4(),
                email: email.to_string(),
                active: true,
                created_at: now,
                updated_at: now,
            };
            self.subscribers.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn set_active(&self, email: &str, active: bool) -> Result<(), RepoError> {
            let mut subscribers = self.subscribers.lock().unwrap();
            match subscribers.iter_mut().find(|sub| sub.email == email) {
                Some(sub) => {
                    sub.active = active;
                    Ok(())
                }
                None => Err(RepoError::NotFound),
            }
        }
    }

    #[tokio::test]
    async fn resubscribe_reactivates_instead_of_duplicating() {
        let repo = Arc::new(StubNewsletterRepo::default());
        let service = NewsletterService::new(repo.clone());

        service.subscribe("lena@example.com").await.expect("subscribe");
        service
            .unsubscribe("lena@example.com")
            .await
            .expect("unsubscribe");
        service
            .subscribe("lena@example.com")
            .await
            .expect("resubscribe");

        let subscribers = repo.subscribers.lock().unwrap();
        assert_eq!(subscribers.len(), 1);
        assert!(subscribers[0].active);
    }

    #[tokio::test]
    async fn double_subscribe_is_rejected() {
        let repo = Arc::new(StubNewsletterRepo::default());
        let service = NewsletterService::new(repo);

        service.subscribe("lena@example.com").await.expect("subscribe");
        let second = service.subscribe("Lena@example.com").await;
        assert!(matches!(second, Err(NewsletterError::AlreadySubscribed)));
    }

    #[tokio::test]
    async fn unsubscribe_unknown_email_is_not_found() {
        let repo = Arc::new(StubNewsletterRepo::default());
        let service = NewsletterService::new(repo);
        let result = service.unsubscribe("ghost@example.com").await;
        assert!(matches!(result, Err(NewsletterError::NotSubscribed)));
    }
}
