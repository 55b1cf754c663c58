use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::application::repos::{
    DonationsRepo, RepoError, ReportOrdersRepo, SubscriptionsRepo,
};
use crate::application::signature::verify_webhook_signature;
use crate::application::subscriptions::find_plan;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook payload: {0}")]
    Malformed(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// What the delivery did, echoed back to the provider for debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    ReportOrderPaid,
    SubscriptionActivated,
    SubscriptionCancelled,
    DonationCompleted,
    PaymentFailed,
    Ignored,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReportOrderPaid => "report_order_paid",
            Self::SubscriptionActivated => "subscription_activated",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::DonationCompleted => "donation_completed",
            Self::PaymentFailed => "payment_failed",
            Self::Ignored => "ignored",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: String,
    payload: WebhookPayload,
}

// Payment events carry a `payment` entity, subscription events a
// `subscription` entity; the other wrapper is absent from the payload.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    payment: Option<PaymentWrapper>,
    #[serde(default)]
    subscription: Option<SubscriptionWrapper>,
}

impl WebhookPayload {
    fn payment(self) -> Result<PaymentEntity, WebhookError> {
        self.payment
            .map(|wrapper| wrapper.entity)
            .ok_or_else(|| WebhookError::Malformed("payload carries no payment entity".into()))
    }

    fn subscription(self) -> Result<SubscriptionEntity, WebhookError> {
        self.subscription
            .map(|wrapper| wrapper.entity)
            .ok_or_else(|| {
                WebhookError::Malformed("payload carries no subscription entity".into())
            })
    }
}

#[derive(Debug, Deserialize)]
struct PaymentWrapper {
    entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionWrapper {
    entity: SubscriptionEntity,
}

// Subscriptions are referenced by the order that opened them.
#[derive(Debug, Deserialize)]
struct SubscriptionEntity {
    id: String,
}

/// Server-to-server payment notifications. The raw body is authenticated
/// against the webhook secret before any parsing happens.
#[derive(Clone)]
pub struct WebhooksService {
    report_orders: Arc<dyn ReportOrdersRepo>,
    subscriptions: Arc<dyn SubscriptionsRepo>,
    donations: Arc<dyn DonationsRepo>,
    secret: String,
}

impl WebhooksService {
    pub fn new(
        report_orders: Arc<dyn ReportOrdersRepo>,
        subscriptions: Arc<dyn SubscriptionsRepo>,
        donations: Arc<dyn DonationsRepo>,
        secret: String,
    ) -> Self {
        Self {
            report_orders,
            subscriptions,
            donations,
            secret,
        }
    }

    pub async fn handle(
        &self,
        body: &[u8],
        signature: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        counter!("veridia_webhook_received_total").increment(1);
        if !verify_webhook_signature(&self.secret, body, signature) {
            counter!("veridia_webhook_rejected_total").increment(1);
            return Err(WebhookError::InvalidSignature);
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(body)
            .map_err(|err| WebhookError::Malformed(err.to_string()))?;

        match envelope.event.as_str() {
            "payment.captured" => {
                let payment = envelope.payload.payment()?;
                self.settle(&payment.order_id, &payment.id).await
            }
            "payment.failed" => {
                let payment = envelope.payload.payment()?;
                self.fail(&payment.order_id).await
            }
            "subscription.cancelled" => {
                let subscription = envelope.payload.subscription()?;
                self.cancel_subscription(&subscription.id).await
            }
            other => {
                info!(
                    target = "veridia::webhooks",
                    event = other,
                    "ignoring unhandled webhook event"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn settle(
        &self,
        order_id: &str,
        payment_id: &str,
    ) -> Result<WebhookOutcome, WebhookError> {
        let now = OffsetDateTime::now_utc();

        if let Some(order) = self.report_orders.find_by_provider_order_id(order_id).await? {
            self.report_orders.mark_paid(order_id, payment_id, now).await?;
            self.report_orders
                .grant_access(order.user_id, order.report_id)
                .await?;
            info!(target = "veridia::webhooks", order = order_id, "report order settled");
            return Ok(WebhookOutcome::ReportOrderPaid);
        }

        if let Some(subscription) =
            self.subscriptions.find_by_provider_order_id(order_id).await?
        {
            let duration_days = find_plan(&subscription.plan_id)
                .map(|plan| plan.duration_days)
                .unwrap_or(30);
            self.subscriptions
                .activate(order_id, payment_id, now, now + Duration::days(duration_days))
                .await?;
            info!(target = "veridia::webhooks", order = order_id, "subscription settled");
            return Ok(WebhookOutcome::SubscriptionActivated);
        }

        if self
            .donations
            .find_by_provider_order_id(order_id)
            .await?
            .is_some()
        {
            self.donations.complete(order_id, payment_id, now).await?;
            info!(target = "veridia::webhooks", order = order_id, "donation settled");
            return Ok(WebhookOutcome::DonationCompleted);
        }

        warn!(
            target = "veridia::webhooks",
            order = order_id,
            "captured payment matched no pending order"
        );
        Ok(WebhookOutcome::Ignored)
    }

    async fn cancel_subscription(&self, order_id: &str) -> Result<WebhookOutcome, WebhookError> {
        if self
            .subscriptions
            .find_by_provider_order_id(order_id)
            .await?
            .is_some()
        {
            self.subscriptions.mark_cancelled(order_id).await?;
            info!(target = "veridia::webhooks", order = order_id, "subscription cancelled");
            return Ok(WebhookOutcome::SubscriptionCancelled);
        }

        warn!(
            target = "veridia::webhooks",
            order = order_id,
            "cancellation matched no known subscription"
        );
        Ok(WebhookOutcome::Ignored)
    }

    async fn fail(&self, order_id: &str) -> Result<WebhookOutcome, WebhookError> {
        if self
            .report_orders
            .find_by_provider_order_id(order_id)
            .await?
            .is_some()
        {
            self.report_orders.mark_failed(order_id).await?;
            return Ok(WebhookOutcome::PaymentFailed);
        }

        if self
            .subscriptions
            .find_by_provider_order_id(order_id)
            .await?
            .is_some()
        {
            self.subscriptions.mark_cancelled(order_id).await?;
            return Ok(WebhookOutcome::PaymentFailed);
        }

        if self
            .donations
            .find_by_provider_order_id(order_id)
            .await?
            .is_some()
        {
            self.donations.mark_failed(order_id).await?;
            return Ok(WebhookOutcome::PaymentFailed);
        }

        Ok(WebhookOutcome::Ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::application::repos::{
        CreateDonationParams, CreateReportOrderParams, CreateSubscriptionParams, DonationTotals,
    };
    use crate::application::signature::hmac_hex;
    use crate::domain::entities::{DonationRecord, ReportOrderRecord, SubscriptionRecord};
    use crate::domain::types::{OrderStatus, SubscriptionStatus};

    #[derive(Default)]
    struct StubOrders {
        rows: Mutex<Vec<ReportOrderRecord>>,
        access: Mutex<Vec<(Uuid, Uuid)>>,
    }

    impl StubOrders {
        fn seed(&self, provider_order_id: &str) -> ReportOrderRecord {
            let record = ReportOrderRecord {
                id: Uuid::new_v4(),
                report_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                provider_order_id: provider_order_id.to_string(),
                provider_payment_id: None,
                amount_paise: 49_900,
                status: OrderStatus::Pending,
                created_at: OffsetDateTime::now_utc(),
                paid_at: None,
            };
            self.rows.lock().unwrap().push(record.clone());
            record
        }
    }

    #[async_trait]
    impl ReportOrdersRepo for StubOrders {
        async fn create_order(
            &self,
            _params: CreateReportOrderParams,
        ) -> Result<ReportOrderRecord, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn find_by_provider_order_id(
            &self,
            provider_order_id: &str,
        ) -> Result<Option<ReportOrderRecord>, RepoError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row.provider_order_id == provider_order_id)
                .cloned())
        }

        async fn mark_paid(
            &self,
            provider_order_id: &str,
            provider_payment_id: &str,
            paid_at: OffsetDateTime,
        ) -> Result<ReportOrderRecord, RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.provider_order_id == provider_order_id)
                .ok_or(RepoError::NotFound)?;
            row.status = OrderStatus::Paid;
            row.provider_payment_id = Some(provider_payment_id.to_string());
            row.paid_at = Some(paid_at);
            Ok(row.clone())
        }

        async fn mark_failed(&self, provider_order_id: &str) -> Result<(), RepoError> {
            let mut rows = self.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|row| row.provider_order_id == provider_order_id)
                .ok_or(RepoError::NotFound)?;
            row.status = OrderStatus::Failed;
            Ok(())
        }

        async fn grant_access(&self, user_id: Uuid, report_id: Uuid) -> Result<(), RepoError> {
            self.access.lock().unwrap().push((user_id, report_id));
            Ok(())
        }

        async fn has_access(&self, user_id: Uuid, report_id: Uuid) -> Result<bool, RepoError> {
            Ok(self
                .access
                .lock()
                .unwrap()
                .contains(&(user_id, report_id)))
        }
    }

    #[derive(Default)]
    struct StubSubscriptions {
        rows: Mutex<Vec<SubscriptionRecord>>,
    }

    impl StubSubscriptions {
        fn seed_active(&self, provider_order_id: &str) -> SubscriptionRecord {
            let now = OffsetDateTime::now_utc();
            let record = SubscriptionRecord {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                plan_id: "premium_monthly".to_string(),
                provider_order_id: provider_order_id.to_string(),
                provider_payment_id: Some("pay_42".to_string()),
                amount_paise: 39_900,
                status: SubscriptionStatus::Active,
                starts_at: Some(now),
                ends_at: Some(now + Duration::days(30)),
                created_at: now,
            };
            self.rows.lock().unwrap().push(record.clone());
            record
        }
    }

    #[async_trait]
    impl SubscriptionsRepo for StubSubscriptions {
        async fn create_subscription(
            &self,
            _params: CreateSubscriptionParams,
        ) -> Result<SubscriptionRecord, RepoError> {
            Err(RepoError::NotFound)
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
            _provider_order_id: &str,
            _provider_payment_id: &str,
            _starts_at: OffsetDateTime,
            _ends_at: OffsetDateTime,
        ) -> Result<SubscriptionRecord, RepoError> {
            Err(RepoError::NotFound)
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
            _user_id: Uuid,
            _now: OffsetDateTime,
        ) -> Result<Option<SubscriptionRecord>, RepoError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct StubDonations;

    #[async_trait]
    impl DonationsRepo for StubDonations {
        async fn create_donation(
            &self,
            _params: CreateDonationParams,
        ) -> Result<DonationRecord, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn find_by_provider_order_id(
            &self,
            _provider_order_id: &str,
        ) -> Result<Option<DonationRecord>, RepoError> {
            Ok(None)
        }

        async fn complete(
            &self,
            _provider_order_id: &str,
            _provider_payment_id: &str,
            _completed_at: OffsetDateTime,
        ) -> Result<DonationRecord, RepoError> {
            Err(RepoError::NotFound)
        }

        async fn mark_failed(&self, _provider_order_id: &str) -> Result<(), RepoError> {
            Ok(())
        }

        async fn completed_totals(&self) -> Result<DonationTotals, RepoError> {
            Ok(DonationTotals::default())
        }

        async fn recent_completed(&self, _limit: u32) -> Result<Vec<DonationRecord>, RepoError> {
            Ok(Vec::new())
        }
    }

    const SECRET: &str = "whsec";

    fn service(orders: Arc<StubOrders>) -> WebhooksService {
        service_with(orders, Arc::new(StubSubscriptions::default()))
    }

    fn service_with(
        orders: Arc<StubOrders>,
        subscriptions: Arc<StubSubscriptions>,
    ) -> WebhooksService {
        WebhooksService::new(
            orders,
            subscriptions,
            Arc::new(StubDonations),
            SECRET.into(),
        )
    }

    fn captured_body(order_id: &str) -> Vec<u8> {
        serde_json::json!({
            "event": "payment.captured",
            "payload": {"payment": {"entity": {"id": "pay_77", "order_id": order_id}}}
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn captured_payment_settles_report_order() {
        let orders = Arc::new(StubOrders::default());
        let seeded = orders.seed("order_w1");
        let service = service(orders.clone());

        let body = captured_body("order_w1");
        let signature = hmac_hex(SECRET, &body);
        let outcome = service.handle(&body, &signature).await.expect("handled");

        assert_eq!(outcome, WebhookOutcome::ReportOrderPaid);
        assert_eq!(orders.rows.lock().unwrap()[0].status, OrderStatus::Paid);
        assert!(
            orders
                .access
                .lock()
                .unwrap()
                .contains(&(seeded.user_id, seeded.report_id))
        );
    }

    #[tokio::test]
    async fn tampered_body_is_rejected_before_parsing() {
        let orders = Arc::new(StubOrders::default());
        orders.seed("order_w1");
        let service = service(orders.clone());

        let body = captured_body("order_w1");
        let signature = hmac_hex(SECRET, &body);
        let mut tampered = body.clone();
        tampered[0] ^= 1;

        let result = service.handle(&tampered, &signature).await;
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
        assert_eq!(orders.rows.lock().unwrap()[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_event_is_ignored() {
        let service = service(Arc::new(StubOrders::default()));
        let body = serde_json::json!({
            "event": "refund.created",
            "payload": {"payment": {"entity": {"id": "pay_1", "order_id": "order_x"}}}
        })
        .to_string()
        .into_bytes();
        let signature = hmac_hex(SECRET, &body);
        let outcome = service.handle(&body, &signature).await.expect("handled");
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn cancellation_event_cancels_the_subscription() {
        let subscriptions = Arc::new(StubSubscriptions::default());
        subscriptions.seed_active("order_s1");
        let service = service_with(Arc::new(StubOrders::default()), subscriptions.clone());

        let body = serde_json::json!({
            "event": "subscription.cancelled",
            "payload": {"subscription": {"entity": {"id": "order_s1"}}}
        })
        .to_string()
        .into_bytes();
        let signature = hmac_hex(SECRET, &body);
        let outcome = service.handle(&body, &signature).await.expect("handled");

        assert_eq!(outcome, WebhookOutcome::SubscriptionCancelled);
        assert_eq!(
            subscriptions.rows.lock().unwrap()[0].status,
            SubscriptionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn cancellation_for_unknown_subscription_is_ignored() {
        let service = service(Arc::new(StubOrders::default()));
        let body = serde_json::json!({
            "event": "subscription.cancelled",
            "payload": {"subscription": {"entity": {"id": "order_missing"}}}
        })
        .to_string()
        .into_bytes();
        let signature = hmac_hex(SECRET, &body);
        let outcome = service.handle(&body, &signature).await.expect("handled");
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn captured_event_without_payment_entity_is_malformed() {
        let service = service(Arc::new(StubOrders::default()));
        let body = serde_json::json!({
            "event": "payment.captured",
            "payload": {"subscription": {"entity": {"id": "order_s1"}}}
        })
        .to_string()
        .into_bytes();
        let signature = hmac_hex(SECRET, &body);
        let result = service.handle(&body, &signature).await;
        assert!(matches!(result, Err(WebhookError::Malformed(_))));
    }

    #[tokio::test]
    async fn failed_payment_marks_the_order() {
        let orders = Arc::new(StubOrders::default());
        orders.seed("order_w1");
        let service = service(orders.clone());

        let body = serde_json::json!({
            "event": "payment.failed",
            "payload": {"payment": {"entity": {"id": "pay_77", "order_id": "order_w1"}}}
        })
        .to_string()
        .into_bytes();
        let signature = hmac_hex(SECRET, &body);
        let outcome = service.handle(&body, &signature).await.expect("handled");

        assert_eq!(outcome, WebhookOutcome::PaymentFailed);
        assert_eq!(orders.rows.lock().unwrap()[0].status, OrderStatus::Failed);
    }
}
