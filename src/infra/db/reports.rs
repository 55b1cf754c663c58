use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateReportOrderParams, RepoError, ReportOrdersRepo, ReportsRepo,
    },
    domain::{
        entities::{ReportOrderRecord, ReportRecord},
        types::OrderStatus,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    slug: String,
    title: String,
    summary: String,
    body: String,
    category: String,
    price_rupees: i64,
    published: bool,
    published_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<ReportRow> for ReportRecord {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            summary: row.summary,
            body: row.body,
            category: row.category,
            price_rupees: row.price_rupees,
            published: row.published,
            published_at: row.published_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReportOrderRow {
    id: Uuid,
    report_id: Uuid,
    user_id: Uuid,
    provider_order_id: String,
    provider_payment_id: Option<String>,
    amount_paise: i64,
    status: OrderStatus,
    created_at: OffsetDateTime,
    paid_at: Option<OffsetDateTime>,
}

impl From<ReportOrderRow> for ReportOrderRecord {
    fn from(row: ReportOrderRow) -> Self {
        Self {
            id: row.id,
            report_id: row.report_id,
            user_id: row.user_id,
            provider_order_id: row.provider_order_id,
            provider_payment_id: row.provider_payment_id,
            amount_paise: row.amount_paise,
            status: row.status,
            created_at: row.created_at,
            paid_at: row.paid_at,
        }
    }
}

const REPORT_COLUMNS: &str =
    "id, slug, title, summary, body, category, price_rupees, published, published_at, created_at";
const ORDER_COLUMNS: &str = "id, report_id, user_id, provider_order_id, provider_payment_id, \
     amount_paise, status, created_at, paid_at";

#[async_trait]
impl ReportsRepo for PostgresRepositories {
    async fn list_published(&self) -> Result<Vec<ReportRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports \
             WHERE published ORDER BY published_at DESC NULLS LAST"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReportRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ReportRecord>, RepoError> {
        let row = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ReportRecord::from))
    }

    async fn list_purchased(&self, user_id: Uuid) -> Result<Vec<ReportRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ReportRow>(&format!(
            "SELECT r.{} FROM reports r \
             INNER JOIN report_access ra ON ra.report_id = r.id \
             WHERE ra.user_id = $1 \
             ORDER BY ra.granted_at DESC",
            REPORT_COLUMNS.replace(", ", ", r."),
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ReportRecord::from).collect())
    }
}

#[async_trait]
impl ReportOrdersRepo for PostgresRepositories {
    async fn create_order(
        &self,
        params: CreateReportOrderParams,
    ) -> Result<ReportOrderRecord, RepoError> {
        let row = sqlx::query_as::<_, ReportOrderRow>(&format!(
            "INSERT INTO report_orders (report_id, user_id, provider_order_id, amount_paise) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(params.report_id)
        .bind(params.user_id)
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
    ) -> Result<Option<ReportOrderRecord>, RepoError> {
        let row = sqlx::query_as::<_, ReportOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM report_orders WHERE provider_order_id = $1"
        ))
        .bind(provider_order_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ReportOrderRecord::from))
    }

    async fn mark_paid(
        &self,
        provider_order_id: &str,
        provider_payment_id: &str,
        paid_at: OffsetDateTime,
    ) -> Result<ReportOrderRecord, RepoError> {
        let row = sqlx::query_as::<_, ReportOrderRow>(&format!(
            "UPDATE report_orders \
             SET status = 'paid', provider_payment_id = $2, paid_at = $3 \
             WHERE provider_order_id = $1 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(provider_order_id)
        .bind(provider_payment_id)
        .bind(paid_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }

    async fn mark_failed(&self, provider_order_id: &str) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE report_orders SET status = 'failed' WHERE provider_order_id = $1",
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

    async fn grant_access(&self, user_id: Uuid, report_id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO report_access (user_id, report_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(report_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn has_access(&self, user_id: Uuid, report_id: Uuid) -> Result<bool, RepoError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM report_access WHERE user_id = $1 AND report_id = $2)",
        )
        .bind(user_id)
        .bind(report_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }
}
