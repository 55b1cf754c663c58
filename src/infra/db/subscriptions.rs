use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateSubscriptionParams, RepoError, SubscriptionsRepo},
    domain::{entities::SubscriptionRecord, types::SubscriptionStatus},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan_id: String,
    provider_order_id: String,
    provider_payment_id: Option<String>,
    amount_paise: i64,
    status: SubscriptionStatus,
    starts_at: Option<OffsetDateTime>,
    ends_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<SubscriptionRow> for SubscriptionRecord {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            provider_order_id: row.provider_order_id,
            provider_payment_id: row.provider_payment_id,
            amount_paise: row.amount_paise,
            status: row.status,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, provider_order_id, \
     provider_payment_id, amount_paise, status, starts_at, ends_at, created_at";

#[async_trait]
impl SubscriptionsRepo for PostgresRepositories {
    async fn create_subscription(
        &self,
        params: CreateSubscriptionParams,
    ) -> Result<SubscriptionRecord, RepoError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "INSERT INTO subscriptions (user_id, plan_id, provider_order_id, amount_paise) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(params.user_id)
        .bind(&params.plan_id)
        .bind(&params.provider_order_id)
        .bind(params.amount_paise)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<SubscriptionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE provider_order_id = $1"
        ))
        .bind(provider_order_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriptionRecord::from))
    }

    async fn activate(
        &self,
        provider_order_id: &str,
        provider_payment_id: &str,
        starts_at: OffsetDateTime,
        ends_at: OffsetDateTime,
    ) -> Result<SubscriptionRecord, RepoError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "UPDATE subscriptions \
             SET status = 'active', provider_payment_id = $2, starts_at = $3, ends_at = $4 \
             WHERE provider_order_id = $1 \
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(provider_order_id)
        .bind(provider_payment_id)
        .bind(starts_at)
        .bind(ends_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }

    async fn mark_cancelled(&self, provider_order_id: &str) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'cancelled' WHERE provider_order_id = $1",
        )
        .bind(provider_order_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_active_for_user(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<SubscriptionRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE user_id = $1 AND status = 'active' AND ends_at > $2 \
             ORDER BY ends_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriptionRecord::from))
    }
}
