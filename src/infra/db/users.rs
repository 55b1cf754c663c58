use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateUserParams, RepoError, UsersRepo},
    domain::{entities::UserRecord, types::UserRole},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    display_name: String,
    role: UserRole,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            display_name: row.display_name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, display_name, role, created_at, updated_at";

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, password_hash, display_name, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&params.email)
        .bind(&params.password_hash)
        .bind(&params.display_name)
        .bind(params.role)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE email = $1",
        )
        .bind(email)
        .bind(password_hash)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
