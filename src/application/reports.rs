use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::clients::{ClientError, CreatedOrder, OrderRequest, PaymentGateway};
use crate::application::repos::{
    CreateReportOrderParams, RepoError, ReportOrdersRepo, ReportsRepo,
};
use crate::application::signature::verify_payment_signature;
use crate::domain::entities::{ReportOrderRecord, ReportRecord};

#[derive(Debug, Error)]
pub enum ReportsError {
    #[error("report not found")]
    NotFound,
    #[error("report is not available for purchase")]
    Unpublished,
    #[error("payment order not found")]
    OrderNotFound,
    #[error("invalid payment signature")]
    InvalidSignature,
    #[error("payment provider error: {0}")]
    Gateway(#[from] ClientError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct ReportCheckout {
    pub order: ReportOrderRecord,
    pub provider: CreatedOrder,
    pub key_id: String,
}

#[derive(Clone)]
pub struct ReportsService {
    reports: Arc<dyn ReportsRepo>,
    orders: Arc<dyn ReportOrdersRepo>,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
    currency: String,
}

impl ReportsService {
    pub fn new(
        reports: Arc<dyn ReportsRepo>,
        orders: Arc<dyn ReportOrdersRepo>,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: String,
        currency: String,
    ) -> Self {
        Self {
            reports,
            orders,
            gateway,
            key_secret,
            currency,
        }
    }

    pub async fn catalog(&self) -> Result<Vec<ReportRecord>, ReportsError> {
        self.reports.list_published().await.map_err(ReportsError::from)
    }

    /// Returns the report plus whether the caller may read the full body.
    pub async fn fetch(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<(ReportRecord, bool), ReportsError> {
        let report = self
            .reports
            .find_by_id(id)
            .await?
            .filter(|report| report.published)
            .ok_or(ReportsError::NotFound)?;

        let has_access = match viewer {
            Some(user_id) => self.orders.has_access(user_id, report.id).await?,
            None => false,
        };
        Ok((report, has_access))
    }

    pub async fn purchased(&self, user_id: Uuid) -> Result<Vec<ReportRecord>, ReportsError> {
        self.reports
            .list_purchased(user_id)
            .await
            .map_err(ReportsError::from)
    }

    pub async fn create_order(
        &self,
        user_id: Uuid,
        report_id: Uuid,
    ) -> Result<ReportCheckout, ReportsError> {
        let report = self
            .reports
            .find_by_id(report_id)
            .await?
            .ok_or(ReportsError::NotFound)?;
        if !report.published {
            return Err(ReportsError::Unpublished);
        }

        let amount_paise = report.price_rupees * 100;
        let provider = self
            .gateway
            .create_order(OrderRequest {
                amount_paise,
                currency: self.currency.clone(),
                receipt: format!("report_{}", Uuid::new_v4().simple()),
                notes: vec![
                    ("type".to_string(), "report".to_string()),
                    ("report_id".to_string(), report.id.to_string()),
                    ("user_id".to_string(), user_id.to_string()),
                ],
            })
            .await?;

        // The pending row must exist before the order id reaches the client.
        let order = self
            .orders
            .create_order(CreateReportOrderParams {
                report_id: report.id,
                user_id,
                provider_order_id: provider.provider_order_id.clone(),
                amount_paise,
            })
            .await?;

        Ok(ReportCheckout {
            order,
            provider,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        command: VerifyPaymentCommand,
    ) -> Result<ReportOrderRecord, ReportsError> {
        if !verify_payment_signature(
            &self.key_secret,
            &command.order_id,
            &command.payment_id,
            &command.signature,
        ) {
            counter!("veridia_payment_rejected_total").increment(1);
            return Err(ReportsError::InvalidSignature);
        }

        let order = self
            .orders
            .find_by_provider_order_id(&command.order_id)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or(ReportsError::OrderNotFound)?;

        let paid = self
            .orders
            .mark_paid(
                &order.provider_order_id,
                &command.payment_id,
                OffsetDateTime::now_utc(),
            )
            .await?;
        self.orders.grant_access(paid.user_id, paid.report_id).await?;

        counter!("veridia_payment_verified_total").increment(1);
        info!(
            target = "veridia::reports",
            order = %paid.provider_order_id,
            report = %paid.report_id,
            "report purchase verified"
        );
        Ok(paid)
    }
}
