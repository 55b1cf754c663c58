use std::sync::Arc;

use metrics::counter;
use once_cell::sync::Lazy;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::application::clients::{ClientError, CreatedOrder, OrderRequest, PaymentGateway};
use crate::application::repos::{CreateSubscriptionParams, RepoError, SubscriptionsRepo};
use crate::application::signature::verify_payment_signature;
use crate::domain::entities::SubscriptionRecord;

#[derive(Debug, Clone)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    pub price_rupees: i64,
    pub duration_days: i64,
    pub popular: bool,
    pub features: &'static [&'static str],
}

/// Static plan catalog; prices are in rupees.
pub static PLANS: Lazy<Vec<Plan>> = Lazy::new(|| {
    vec![
        Plan {
            id: "basic_monthly",
            name: "Basic Monthly",
            price_rupees: 199,
            duration_days: 30,
            popular: false,
            features: &[
                "Access to all published test reports",
                "One product vote every month",
                "Community forum access",
            ],
        },
        Plan {
            id: "premium_monthly",
            name: "Premium Monthly",
            price_rupees: 399,
            duration_days: 30,
            popular: true,
            features: &[
                "Everything in Basic",
                "Three product votes every month",
                "Early access to new reports",
                "Priority product suggestions",
            ],
        },
        Plan {
            id: "basic_yearly",
            name: "Basic Yearly",
            price_rupees: 1990,
            duration_days: 365,
            popular: false,
            features: &[
                "Access to all published test reports",
                "One product vote every month",
                "Community forum access",
                "Two months free",
            ],
        },
        Plan {
            id: "premium_yearly",
            name: "Premium Yearly",
            price_rupees: 3990,
            duration_days: 365,
            popular: false,
            features: &[
                "Everything in Premium",
                "Two months free",
                "Annual lab visit invitation",
            ],
        },
    ]
});

pub fn find_plan(plan_id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|plan| plan.id == plan_id)
}

/// Premium plans unlock the larger monthly product-vote allowance.
pub fn is_premium_plan(plan_id: &str) -> bool {
    plan_id.starts_with("premium")
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("unknown plan")]
    UnknownPlan,
    #[error("subscription order not found")]
    OrderNotFound,
    #[error("invalid payment signature")]
    InvalidSignature,
    #[error("payment provider error: {0}")]
    Gateway(#[from] ClientError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SubscriptionCheckout {
    pub subscription: SubscriptionRecord,
    pub provider: CreatedOrder,
    pub key_id: String,
}

#[derive(Debug, Clone)]
pub struct VerifySubscriptionCommand {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Clone)]
pub struct SubscriptionsService {
    repo: Arc<dyn SubscriptionsRepo>,
    gateway: Arc<dyn PaymentGateway>,
    key_secret: String,
    currency: String,
}

impl SubscriptionsService {
    pub fn new(
        repo: Arc<dyn SubscriptionsRepo>,
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

    pub fn plans(&self) -> &'static [Plan] {
        &PLANS
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub async fn create_order(
        &self,
        user_id: Uuid,
        plan_id: &str,
    ) -> Result<SubscriptionCheckout, SubscriptionError> {
        let plan = find_plan(plan_id).ok_or(SubscriptionError::UnknownPlan)?;
        let amount_paise = plan.price_rupees * 100;

        let provider = self
            .gateway
            .create_order(OrderRequest {
                amount_paise,
                currency: self.currency.clone(),
                receipt: format!("sub_{}", Uuid::new_v4().simple()),
                notes: vec![
                    ("type".to_string(), "subscription".to_string()),
                    ("plan_id".to_string(), plan.id.to_string()),
                    ("user_id".to_string(), user_id.to_string()),
                ],
            })
            .await?;

        let subscription = self
            .repo
            .create_subscription(CreateSubscriptionParams {
                user_id,
                plan_id: plan.id.to_string(),
                provider_order_id: provider.provider_order_id.clone(),
                amount_paise,
            })
            .await?;

        Ok(SubscriptionCheckout {
            subscription,
            provider,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// A verified payment moves the row pending → active and stamps the
    /// coverage window from the plan duration.
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        command: VerifySubscriptionCommand,
    ) -> Result<SubscriptionRecord, SubscriptionError> {
        if !verify_payment_signature(
            &self.key_secret,
            &command.order_id,
            &command.payment_id,
            &command.signature,
        ) {
            counter!("veridia_payment_rejected_total").increment(1);
            return Err(SubscriptionError::InvalidSignature);
        }

        let pending = self
            .repo
            .find_by_provider_order_id(&command.order_id)
            .await?
            .filter(|subscription| subscription.user_id == user_id)
            .ok_or(SubscriptionError::OrderNotFound)?;

        let plan = find_plan(&pending.plan_id).ok_or(SubscriptionError::UnknownPlan)?;
        let starts_at = OffsetDateTime::now_utc();
        let ends_at = starts_at + Duration::days(plan.duration_days);

        let active = self
            .repo
            .activate(
                &pending.provider_order_id,
                &command.payment_id,
                starts_at,
                ends_at,
            )
            .await?;

        counter!("veridia_payment_verified_total").increment(1);
        info!(
            target = "veridia::subscriptions",
            order = %active.provider_order_id,
            plan = %active.plan_id,
            "subscription activated"
        );
        Ok(active)
    }

    pub async fn status(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SubscriptionRecord>, SubscriptionError> {
        self.repo
            .find_active_for_user(user_id, OffsetDateTime::now_utc())
            .await
            .map_err(SubscriptionError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::application::signature::payment_signature;
    use crate::domain::types::SubscriptionStatus;

    #[derive(Default)]
    struct StubSubscriptionsRepo {
        rows: Mutex<Vec<SubscriptionRecord>>,
    }

    #[async_trait]
    impl SubscriptionsRepo for StubSubscriptionsRepo {
        async fn create_subscription(
            &self,
            params: CreateSubscriptionParams,
        ) -> Result<SubscriptionRecord, RepoError> {
            let record = SubscriptionRecord {
                id: Uuid::new_v4(),
                user_id: params.user_id,
                plan_id: params.plan_id,
                provider_order_id: params.provider_order_id,
                provider_payment_id: None,
                amount_paise: params.amount_paise,
                status: SubscriptionStatus::Pending,
                starts_at: None,
                ends_at: None,
                created_at: OffsetDateTime::now_utc(),
            };
            self.rows.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn find_by_provider_order_id(
            &self,
            provider_order_id: &str,
        ) -> Result<Option<SubscriptionRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.provider_order_id == provider_order_id)
                .cloned())
        }

        async fn activate(
            &self,
            provider_order_id: &str,
            provider_payment_id: &str,
            starts_at: OffsetDateTime,
            ends_at: OffsetDateTime,
        ) -> Result<SubscriptionRecord, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.provider_order_id == provider_order_id)
                .ok_or(RepoError::NotFound)?;
            row.status = SubscriptionStatus::Active;
            row.provider_payment_id = Some(provider_payment_id.to_string());
            row.starts_at = Some(starts_at);
            row.ends_at = Some(ends_at);
            Ok(row.clone())
        }

        async fn mark_cancelled(&self, provider_order_id: &str) -> Result<(), RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.provider_order_id == provider_order_id)
                .ok_or(RepoError::NotFound)?;
            row.status = SubscriptionStatus::Cancelled;
            Ok(())
        }

        async fn find_active_for_user(
            &self,
            user_id: Uuid,
            now: OffsetDateTime,
        ) -> Result<Option<SubscriptionRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| {
                    row.user_id == user_id
                        && row.status == SubscriptionStatus::Active
                        && row.ends_at.is_some_and(|ends| ends > now)
                })
                .cloned())
        }
    }

    struct StubGateway;

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_order(&self, request: OrderRequest) -> Result<CreatedOrder, ClientError> {
            Ok(CreatedOrder {
                provider_order_id: "order_sub_1".to_string(),
                amount_paise: request.amount_paise,
                currency: request.currency,
            })
        }

        fn key_id(&self) -> &str {
            "rzp_test_stub"
        }
    }

    const SECRET: &str = "sub-secret";

    fn service(repo: Arc<StubSubscriptionsRepo>) -> SubscriptionsService {
        SubscriptionsService::new(repo, Arc::new(StubGateway), SECRET.into(), "INR".into())
    }

    #[test]
    fn catalog_carries_the_four_plans() {
        let ids: Vec<&str> = PLANS.iter().map(|plan| plan.id).collect();
        assert_eq!(
            ids,
            ["basic_monthly", "premium_monthly", "basic_yearly", "premium_yearly"]
        );
        assert!(find_plan("premium_monthly").unwrap().popular);
        assert!(is_premium_plan("premium_yearly"));
        assert!(!is_premium_plan("basic_monthly"));
    }

    #[tokio::test]
    async fn unknown_plan_is_rejected() {
        let service = service(Arc::new(StubSubscriptionsRepo::default()));
        let result = service.create_order(Uuid::new_v4(), "platinum_weekly").await;
        assert!(matches!(result, Err(SubscriptionError::UnknownPlan)));
    }

    #[tokio::test]
    async fn verified_payment_activates_with_plan_window() {
        let repo = Arc::new(StubSubscriptionsRepo::default());
        let service = service(repo.clone());
        let user = Uuid::new_v4();

        service
            .create_order(user, "premium_monthly")
            .await
            .expect("order");
        assert_eq!(
            repo.rows.lock().unwrap()[0].status,
            SubscriptionStatus::Pending
        );

        let signature = payment_signature(SECRET, "order_sub_1", "pay_7");
        let active = service
            .verify_payment(
                user,
                VerifySubscriptionCommand {
                    order_id: "order_sub_1".into(),
                    payment_id: "pay_7".into(),
                    signature,
                },
            )
            .await
            .expect("activated");

        assert_eq!(active.status, SubscriptionStatus::Active);
        let starts = active.starts_at.expect("starts");
        let ends = active.ends_at.expect("ends");
        assert_eq!(ends - starts, Duration::days(30));

        let status = service.status(user).await.expect("status");
        assert_eq!(status.map(|row| row.plan_id), Some("premium_monthly".into()));
    }

    #[tokio::test]
    async fn tampered_signature_leaves_subscription_pending() {
        let repo = Arc::new(StubSubscriptionsRepo::default());
        let service = service(repo.clone());
        let user = Uuid::new_v4();

        service.create_order(user, "basic_monthly").await.expect("order");

        let result = service
            .verify_payment(
                user,
                VerifySubscriptionCommand {
                    order_id: "order_sub_1".into(),
                    payment_id: "pay_7".into(),
                    signature: "deadbeef".into(),
                },
            )
            .await;

        assert!(matches!(result, Err(SubscriptionError::InvalidSignature)));
        assert_eq!(
            repo.rows.lock().unwrap()[0].status,
            SubscriptionStatus::Pending
        );
    }
}
