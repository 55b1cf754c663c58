use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{NewsletterRepo, RepoError},
    domain::entities::NewsletterSubscriberRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SubscriberRow> for NewsletterSubscriberRecord {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl NewsletterRepo for PostgresRepositories {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<NewsletterSubscriberRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, active, created_at, updated_at \
             FROM newsletter_subscribers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(NewsletterSubscriberRecord::from))
    }

    async fn insert_subscriber(
        &self,
        email: &str,
    ) -> Result<NewsletterSubscriberRecord, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "INSERT INTO newsletter_subscribers (email) VALUES ($1) \
             RETURNING id, email, active, created_at, updated_at",
        )
        .bind(email)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn set_active(&self, email: &str, active: bool) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE newsletter_subscribers SET active = $2, updated_at = now() WHERE email = $1",
        )
        .bind(email)
        .bind(active)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
