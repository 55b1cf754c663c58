use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{ProductVotesRepo, RepoError},
    domain::entities::CandidateProductRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    brand: String,
    category: String,
    month_key: String,
    votes: i64,
}

impl From<ProductRow> for CandidateProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            brand: row.brand,
            category: row.category,
            month_key: row.month_key,
            votes: row.votes,
        }
    }
}

const PRODUCT_QUERY: &str = "SELECT p.id, p.name, p.brand, p.category, p.month_key, \
     (SELECT COUNT(*) FROM product_votes v WHERE v.product_id = p.id) AS votes \
     FROM candidate_products p";

#[async_trait]
impl ProductVotesRepo for PostgresRepositories {
    async fn list_products(
        &self,
        month_key: &str,
    ) -> Result<Vec<CandidateProductRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_QUERY} WHERE p.month_key = $1 ORDER BY votes DESC, p.name"
        ))
        .bind(month_key)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CandidateProductRecord::from).collect())
    }

    async fn find_product(
        &self,
        id: Uuid,
    ) -> Result<Option<CandidateProductRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_QUERY} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(CandidateProductRecord::from))
    }

    async fn count_user_votes(&self, user_id: Uuid, month_key: &str) -> Result<u32, RepoError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM product_votes WHERE user_id = $1 AND month_key = $2",
        )
        .bind(user_id)
        .bind(month_key)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        count
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    async fn has_voted(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        month_key: &str,
    ) -> Result<bool, RepoError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM product_votes \
             WHERE user_id = $1 AND product_id = $2 AND month_key = $3)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(month_key)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }

    async fn record_vote(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        month_key: &str,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO product_votes (user_id, product_id, month_key) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(month_key)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_user_votes(
        &self,
        user_id: Uuid,
        month_key: &str,
    ) -> Result<Vec<Uuid>, RepoError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT product_id FROM product_votes \
             WHERE user_id = $1 AND month_key = $2 \
             ORDER BY created_at",
        )
        .bind(user_id)
        .bind(month_key)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ids)
    }

    async fn total_votes(&self) -> Result<u64, RepoError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM product_votes")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
