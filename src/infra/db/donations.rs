use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateDonationParams, DonationTotals, DonationsRepo, RepoError},
    domain::{entities::DonationRecord, types::DonationStatus},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct DonationRow {
    id: Uuid,
    donor_name: String,
    donor_email: String,
    donor_phone: String,
    message: String,
    amount_rupees: i64,
    provider_order_id: String,
    provider_payment_id: Option<String>,
    status: DonationStatus,
    created_at: OffsetDateTime,
    completed_at: Option<OffsetDateTime>,
}

impl From<DonationRow> for DonationRecord {
    fn from(row: DonationRow) -> Self {
        Self {
            id: row.id,
            donor_name: row.donor_name,
            donor_email: row.donor_email,
            donor_phone: row.donor_phone,
            message: row.message,
            amount_rupees: row.amount_rupees,
            provider_order_id: row.provider_order_id,
            provider_payment_id: row.provider_payment_id,
            status: row.status,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    total_amount: Option<i64>,
    total_donors: i64,
}

const DONATION_COLUMNS: &str = "id, donor_name, donor_email, donor_phone, message, \
     amount_rupees, provider_order_id, provider_payment_id, status, created_at, completed_at";

#[async_trait]
impl DonationsRepo for PostgresRepositories {
    async fn create_donation(
        &self,
        params: CreateDonationParams,
    ) -> Result<DonationRecord, RepoError> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "INSERT INTO donations \
             (donor_name, donor_email, donor_phone, message, amount_rupees, provider_order_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {DONATION_COLUMNS}"
        ))
        .bind(&params.donor_name)
        .bind(&params.donor_email)
        .bind(&params.donor_phone)
        .bind(&params.message)
        .bind(params.amount_rupees)
        .bind(&params.provider_order_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<DonationRecord>, RepoError> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE provider_order_id = $1"
        ))
        .bind(provider_order_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(DonationRecord::from))
    }

    async fn complete(
        &self,
        provider_order_id: &str,
        provider_payment_id: &str,
        completed_at: OffsetDateTime,
    ) -> Result<DonationRecord, RepoError> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "UPDATE donations \
             SET status = 'completed', provider_payment_id = $2, completed_at = $3 \
             WHERE provider_order_id = $1 \
             RETURNING {DONATION_COLUMNS}"
        ))
        .bind(provider_order_id)
        .bind(provider_payment_id)
        .bind(completed_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Ok(row.into())
    }

    async fn mark_failed(&self, provider_order_id: &str) -> Result<(), RepoError> {
        let result =
            sqlx::query("UPDATE donations SET status = 'failed' WHERE provider_order_id = $1")
                .bind(provider_order_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn completed_totals(&self) -> Result<DonationTotals, RepoError> {
        let row = sqlx::query_as::<_, TotalsRow>(
            "SELECT SUM(amount_rupees) AS total_amount, COUNT(*) AS total_donors \
             FROM donations WHERE status = 'completed'",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(DonationTotals {
            total_amount: row.total_amount.unwrap_or(0),
            total_donors: Self::convert_count(row.total_donors)?,
        })
    }

    async fn recent_completed(&self, limit: u32) -> Result<Vec<DonationRecord>, RepoError> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations \
             WHERE status = 'completed' \
             ORDER BY completed_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(DonationRecord::from).collect())
    }
}
