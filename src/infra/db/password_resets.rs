use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{PasswordResetsRepo, RepoError},
    domain::entities::PasswordResetRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ResetRow {
    email: String,
    token_hash: String,
    expires_at: OffsetDateTime,
    used: bool,
    created_at: OffsetDateTime,
    used_at: Option<OffsetDateTime>,
}

impl From<ResetRow> for PasswordResetRecord {
    fn from(row: ResetRow) -> Self {
        Self {
            email: row.email,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
            used_at: row.used_at,
        }
    }
}

#[async_trait]
impl PasswordResetsRepo for PostgresRepositories {
    async fn upsert_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO password_resets (email, token_hash, expires_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET \
                token_hash = EXCLUDED.token_hash, \
                expires_at = EXCLUDED.expires_at, \
                used = FALSE, \
                created_at = now(), \
                used_at = NULL",
        )
        .bind(email)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<PasswordResetRecord>, RepoError> {
        let row = sqlx::query_as::<_, ResetRow>(
            "SELECT email, token_hash, expires_at, used, created_at, used_at \
             FROM password_resets WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PasswordResetRecord::from))
    }

    async fn mark_used(&self, email: &str, used_at: OffsetDateTime) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE password_resets SET used = TRUE, used_at = $2 WHERE email = $1",
        )
        .bind(email)
        .bind(used_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
