//! Razorpay-backed order creation.

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::clients::{ClientError, CreatedOrder, OrderRequest, PaymentGateway};
use crate::config::PaymentSettings;

const ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

pub struct RazorpayGateway {
    client: reqwest::Client,
    settings: PaymentSettings,
}

impl RazorpayGateway {
    pub fn new(settings: PaymentSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: OrderRequest) -> Result<CreatedOrder, ClientError> {
        let notes: BTreeMap<&str, &str> = request
            .notes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        let body = OrderBody {
            amount: request.amount_paise,
            currency: &request.currency,
            receipt: &request.receipt,
            notes,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(ORDERS_URL)
            .basic_auth(&self.settings.key_id, Some(&self.settings.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::transport)?;
        histogram!("veridia_provider_request_ms", "provider" => "razorpay")
            .record(started.elapsed().as_secs_f64() * 1000.0);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OrderResponse = response.json().await.map_err(ClientError::transport)?;
        debug!(
            target = "veridia::payments",
            order = %parsed.id,
            amount = parsed.amount,
            "provider order created"
        );
        Ok(CreatedOrder {
            provider_order_id: parsed.id,
            amount_paise: parsed.amount,
            currency: parsed.currency,
        })
    }

    fn key_id(&self) -> &str {
        &self.settings.key_id
    }
}
