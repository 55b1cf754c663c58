//! Outbound client seams for the mail and payment providers.
//!
//! Services depend on these traits so tests can substitute in-memory stubs;
//! the reqwest-backed implementations live under `infra`.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("provider rejected the request: {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl ClientError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EmailDelivery {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<EmailDelivery, ClientError>;
}

/// Order-creation request against the payment provider; `amount_paise` is in
/// minor units.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub amount_paise: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub provider_order_id: String,
    pub amount_paise: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: OrderRequest) -> Result<CreatedOrder, ClientError>;

    /// Publishable key id handed to browser checkout widgets.
    fn key_id(&self) -> &str;
}
