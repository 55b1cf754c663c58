use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{ConcernsRepo, RepoError},
    domain::entities::ConcernCategoryRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    slug: String,
    label: String,
    votes: i64,
}

impl From<CategoryRow> for ConcernCategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            label: row.label,
            votes: row.votes,
        }
    }
}

const CATEGORY_QUERY: &str = "SELECT c.id, c.slug, c.label, COUNT(v.user_id) AS votes \
     FROM concern_categories c \
     LEFT JOIN concern_votes v ON v.category_id = c.id";

#[async_trait]
impl ConcernsRepo for PostgresRepositories {
    async fn list_categories(&self) -> Result<Vec<ConcernCategoryRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!(
            "{CATEGORY_QUERY} GROUP BY c.id, c.slug, c.label ORDER BY votes DESC, c.label"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ConcernCategoryRecord::from).collect())
    }

    async fn find_category(
        &self,
        id: Uuid,
    ) -> Result<Option<ConcernCategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(&format!(
            "{CATEGORY_QUERY} WHERE c.id = $1 GROUP BY c.id, c.slug, c.label"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ConcernCategoryRecord::from))
    }

    async fn record_vote(&self, user_id: Uuid, category_id: Uuid) -> Result<(), RepoError> {
        sqlx::query("INSERT INTO concern_votes (user_id, category_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(category_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn total_votes(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM concern_votes")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
