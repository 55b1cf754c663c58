use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateWaitlistEntryParams, RepoError, WaitlistRepo},
    domain::entities::WaitlistEntryRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct WaitlistRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    city: Option<String>,
    created_at: OffsetDateTime,
}

impl From<WaitlistRow> for WaitlistEntryRecord {
    fn from(row: WaitlistRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            city: row.city,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl WaitlistRepo for PostgresRepositories {
    async fn add_entry(
        &self,
        params: CreateWaitlistEntryParams,
    ) -> Result<WaitlistEntryRecord, RepoError> {
        let row = sqlx::query_as::<_, WaitlistRow>(
            "INSERT INTO waitlist_entries (email, name, city) \
             VALUES ($1, $2, $3) \
             RETURNING id, email, name, city, created_at",
        )
        .bind(&params.email)
        .bind(&params.name)
        .bind(&params.city)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<WaitlistEntryRecord>, RepoError> {
        let row = sqlx::query_as::<_, WaitlistRow>(
            "SELECT id, email, name, city, created_at FROM waitlist_entries WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(WaitlistEntryRecord::from))
    }

    async fn count_entries(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM waitlist_entries")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
