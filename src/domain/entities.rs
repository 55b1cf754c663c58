//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{DonationStatus, OrderStatus, SubscriptionStatus, UserRole};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitlistEntryRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub city: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub category: String,
    pub price_rupees: i64,
    pub published: bool,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportOrderRecord {
    pub id: Uuid,
    pub report_id: Uuid,
    pub user_id: Uuid,
    pub provider_order_id: String,
    pub provider_payment_id: Option<String>,
    pub amount_paise: i64,
    pub status: OrderStatus,
    pub created_at: OffsetDateTime,
    pub paid_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcernCategoryRecord {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub votes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForumPostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub title: String,
    pub body: String,
    pub comment_count: i64,
    pub like_count: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForumCommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogArticleRecord {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub published_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsletterSubscriberRecord {
    pub id: Uuid,
    pub email: String,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: String,
    pub provider_order_id: String,
    pub provider_payment_id: Option<String>,
    pub amount_paise: i64,
    pub status: SubscriptionStatus,
    pub starts_at: Option<OffsetDateTime>,
    pub ends_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonationRecord {
    pub id: Uuid,
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub message: String,
    pub amount_rupees: i64,
    pub provider_order_id: String,
    pub provider_payment_id: Option<String>,
    pub status: DonationStatus,
    pub created_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateProductRecord {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub month_key: String,
    pub votes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasswordResetRecord {
    pub email: String,
    pub token_hash: String,
    pub expires_at: OffsetDateTime,
    pub used: bool,
    pub created_at: OffsetDateTime,
    pub used_at: Option<OffsetDateTime>,
}
