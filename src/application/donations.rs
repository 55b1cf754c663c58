use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::clients::{ClientError, CreatedOrder, OrderRequest, PaymentGateway};
use crate::application::repos::{
    CreateDonationParams, DonationTotals, DonationsRepo, RepoError,
};
use crate::application::signature::verify_payment_signature;
use crate::domain::entities::DonationRecord;

const RECENT_LIMIT: u32 = 10;
const MIN_AMOUNT_RUPEES: i64 = 1;

#[derive(Debug, Error)]
pub enum DonationError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("donation order not found")]
    OrderNotFound,
    #[error("invalid payment signature")]
    InvalidSignature,
    #[error("payment provider error: {0}")]
    Gateway(#[from] ClientError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct DonationCommand {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub message: String,
    pub amount_rupees: i64,
}

#[derive(Debug, Clone)]
pub struct DonationCheckout {
    pub donation: DonationRecord,
    pub provider: CreatedOrder,
    pub key_id: String,
}

#[derive(Debug, Clone)]
pub struct VerifyDonationCommand {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct DonationStats {
    pub totals: DonationTotals,
    pub recent: Vec<DonationRecord>,
}

/// Donations are open to anonymous visitors; no account is required.
#[derive(Clone)]
pub struct DonationsService {
    repo: Arc<dyn DonationsRepo>,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
    currency: String,
}

impl DonationsService {
    pub fn new(
        repo: Arc<dyn DonationsRepo>,
        gateway: Arc<dyn PaymentGateway>,
        key_secret: String,
        currency: String,
    ) -> Self {
        Self {
            repo,
            gateway,
            key_secret,
            currency,
        }
    }

    pub async fn create_order(
        &self,
        command: DonationCommand,
    ) -> Result<DonationCheckout, DonationError> {
        let donor_name = command.donor_name.trim().to_string();
        if donor_name.is_empty() {
            return Err(DonationError::Validation("donor name must not be empty"));
        }
        let donor_email = command.donor_email.trim().to_lowercase();
        if donor_email.is_empty() || !donor_email.contains('@') {
            return Err(DonationError::Validation("a valid email address is required"));
        }
        if command.amount_rupees < MIN_AMOUNT_RUPEES {
            return Err(DonationError::Validation("donation amount must be positive"));
        }

        let provider = self
            .gateway
            .create_order(OrderRequest {
                amount_paise: command.amount_rupees * 100,
                currency: self.currency.clone(),
                receipt: format!("don_{}", Uuid::new_v4().simple()),
                notes: vec![
                    ("type".to_string(), "donation".to_string()),
                    ("donor_email".to_string(), donor_email.clone()),
                ],
            })
            .await?;

        let donation = self
            .repo
            .create_donation(CreateDonationParams {
                donor_name,
                donor_email,
                donor_phone: command.donor_phone.trim().to_string(),
                message: command.message.trim().to_string(),
                amount_rupees: command.amount_rupees,
                provider_order_id: provider.provider_order_id.clone(),
            })
            .await?;

        Ok(DonationCheckout {
            donation,
            provider,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    pub async fn verify_payment(
        &self,
        command: VerifyDonationCommand,
    ) -> Result<DonationRecord, DonationError> {
        if !verify_payment_signature(
            &self.key_secret,
            &command.order_id,
            &command.payment_id,
            &command.signature,
        ) {
            counter!("veridia_payment_rejected_total").increment(1);
            return Err(DonationError::InvalidSignature);
        }

        self.repo
            .find_by_provider_order_id(&command.order_id)
            .await?
            .ok_or(DonationError::OrderNotFound)?;

        let completed = self
            .repo
            .complete(
                &command.order_id,
                &command.payment_id,
                OffsetDateTime::now_utc(),
            )
            .await?;

        counter!("veridia_payment_verified_total").increment(1);
        info!(
            target = "veridia::donations",
            order = %completed.provider_order_id,
            amount = completed.amount_rupees,
            "donation completed"
        );
        Ok(completed)
    }

    pub async fn stats(&self) -> Result<DonationStats, DonationError> {
        let totals = self.repo.completed_totals().await?;
        let recent = self.repo.recent_completed(RECENT_LIMIT).await?;
        Ok(DonationStats { totals, recent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::application::signature::payment_signature;
    use crate::domain::types::DonationStatus;

    #[derive(Default)]
    struct StubDonationsRepo {
        rows: Mutex<Vec<DonationRecord>>,
    }

    #[async_trait]
    impl DonationsRepo for StubDonationsRepo {
        async fn create_donation(
            &self,
            params: CreateDonationParams,
        ) -> Result<DonationRecord, RepoError> {
            let record = DonationRecord {
                id: Uuid::new_v4(),
                donor_name: params.donor_name,
                donor_email: params.donor_email,
                donor_phone: params.donor_phone,
                message: params.message,
                amount_rupees: params.amount_rupees,
                provider_order_id: params.provider_order_id,
                provider_payment_id: None,
                status: DonationStatus::Pending,
                created_at: OffsetDateTime::now_utc(),
                completed_at: None,
            };
            self.rows.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn find_by_provider_order_id(
            &self,
            provider_order_id: &str,
        ) -> Result<Option<DonationRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.provider_order_id == provider_order_id)
                .cloned())
        }

        async fn complete(
            &self,
            provider_order_id: &str,
            provider_payment_id: &str,
            completed_at: OffsetDateTime,
        ) -> Result<DonationRecord, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.provider_order_id == provider_order_id)
                .ok_or(RepoError::NotFound)?;
            row.status = DonationStatus::Completed;
            row.provider_payment_id = Some(provider_payment_id.to_string());
            row.completed_at = Some(completed_at);
            Ok(row.clone())
        }

        async fn mark_failed(&self, provider_order_id: &str) -> Result<(), RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.provider_order_id == provider_order_id)
                .ok_or(RepoError::NotFound)?;
            row.status = DonationStatus::Failed;
            Ok(())
        }

        async fn completed_totals(&self) -> Result<DonationTotals, RepoError> {
            let rows = self.rows.lock().unwrap();
            let completed: Vec<_> = rows
                .iter()
                .filter(|row| row.status == DonationStatus::Completed)
                .collect();
            Ok(DonationTotals {
                total_amount: completed.iter().map(|row| row.amount_rupees).sum(),
                total_donors: completed.len() as u64,
            })
        }

        async fn recent_completed(&self, limit: u32) -> Result<Vec<DonationRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|row| row.status == DonationStatus::Completed)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    struct StubGateway;

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_order(&self, request: OrderRequest) -> Result<CreatedOrder, ClientError> {
            Ok(CreatedOrder {
                provider_order_id: "order_don_1".to_string(),
                amount_paise: request.amount_paise,
                currency: request.currency,
            })
        }

        fn key_id(&self) -> &str {
            "rzp_test_stub"
        }
    }

    const SECRET: &str = "don-secret";

    fn service(repo: Arc<StubDonationsRepo>) -> DonationsService {
        DonationsService::new(repo, Arc::new(StubGateway), SECRET.into(), "INR".into())
    }

    fn command(amount: i64) -> DonationCommand {
        DonationCommand {
            donor_name: "Ravi".into(),
            donor_email: "Ravi@example.com".into(),
            donor_phone: "9000000000".into(),
            message: "Keep testing!".into(),
            amount_rupees: amount,
        }
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let service = service(Arc::new(StubDonationsRepo::default()));
        let result = service.create_order(command(0)).await;
        assert!(matches!(result, Err(DonationError::Validation(_))));
    }

    #[tokio::test]
    async fn completed_donation_shows_up_in_stats() {
        let repo = Arc::new(StubDonationsRepo::default());
        let service = service(repo.clone());

        let checkout = service.create_order(command(500)).await.expect("order");
        assert_eq!(checkout.provider.amount_paise, 50_000);
        assert_eq!(checkout.donation.donor_email, "ravi@example.com");

        let signature = payment_signature(SECRET, "order_don_1", "pay_9");
        service
            .verify_payment(VerifyDonationCommand {
                order_id: "order_don_1".into(),
                payment_id: "pay_9".into(),
                signature,
            })
            .await
            .expect("verified");

        let stats = service.stats().await.expect("stats");
        assert_eq!(stats.totals.total_amount, 500);
        assert_eq!(stats.totals.total_donors, 1);
        assert_eq!(stats.recent.len(), 1);
    }

    #[tokio::test]
    async fn bad_signature_leaves_donation_pending() {
        let repo = Arc::new(StubDonationsRepo::default());
        let service = service(repo.clone());
        service.create_order(command(100)).await.expect("order");

        let result = service
            .verify_payment(VerifyDonationCommand {
                order_id: "order_don_1".into(),
                payment_id: "pay_9".into(),
                signature: "0000".into(),
            })
            .await;

        assert!(matches!(result, Err(DonationError::InvalidSignature)));
        assert_eq!(repo.rows.lock().unwrap()[0].status, DonationStatus::Pending);
        let stats = service.stats().await.expect("stats");
        assert_eq!(stats.totals.total_donors, 0);
    }
}
