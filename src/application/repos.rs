//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    BlogArticleRecord, CandidateProductRecord, ConcernCategoryRecord, DonationRecord,
    ForumCommentRecord, ForumPostRecord, NewsletterSubscriberRecord, PasswordResetRecord,
    ReportOrderRecord, ReportRecord, SubscriptionRecord, UserRecord, WaitlistEntryRecord,
};
use crate::domain::types::UserRole;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: UserRole,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<(), RepoError>;

    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<(), RepoError>;

    async fn count_users(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateWaitlistEntryParams {
    pub email: String,
    pub name: Option<String>,
    pub city: Option<String>,
}

#[async_trait]
pub trait WaitlistRepo: Send + Sync {
    async fn add_entry(
        &self,
        params: CreateWaitlistEntryParams,
    ) -> Result<WaitlistEntryRecord, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<WaitlistEntryRecord>, RepoError>;

    async fn count_entries(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ReportsRepo: Send + Sync {
    async fn list_published(&self) -> Result<Vec<ReportRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ReportRecord>, RepoError>;

    async fn list_purchased(&self, user_id: Uuid) -> Result<Vec<ReportRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateReportOrderParams {
    pub report_id: Uuid,
    pub user_id: Uuid,
    pub provider_order_id: String,
    pub amount_paise: i64,
}

#[async_trait]
pub trait ReportOrdersRepo: Send + Sync {
    async fn create_order(
        &self,
        params: CreateReportOrderParams,
    ) -> Result<ReportOrderRecord, RepoError>;

    async fn find_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<ReportOrderRecord>, RepoError>;

    async fn mark_paid(
        &self,
        provider_order_id: &str,
        provider_payment_id: &str,
        paid_at: OffsetDateTime,
    ) -> Result<ReportOrderRecord, RepoError>;

    async fn mark_failed(&self, provider_order_id: &str) -> Result<(), RepoError>;

    async fn grant_access(&self, user_id: Uuid, report_id: Uuid) -> Result<(), RepoError>;

    async fn has_access(&self, user_id: Uuid, report_id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ConcernsRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<ConcernCategoryRecord>, RepoError>;

    async fn find_category(&self, id: Uuid)
    -> Result<Option<ConcernCategoryRecord>, RepoError>;

    /// Inserts a vote row; a repeat vote surfaces as `RepoError::Duplicate`.
    async fn record_vote(&self, user_id: Uuid, category_id: Uuid) -> Result<(), RepoError>;

    async fn total_votes(&self) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateForumPostParams {
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct CreateForumCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
}

#[async_trait]
pub trait ForumRepo: Send + Sync {
    async fn create_post(
        &self,
        params: CreateForumPostParams,
    ) -> Result<ForumPostRecord, RepoError>;

    async fn list_posts(&self, limit: u32) -> Result<Vec<ForumPostRecord>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<ForumPostRecord>, RepoError>;

    async fn create_comment(
        &self,
        params: CreateForumCommentParams,
    ) -> Result<ForumCommentRecord, RepoError>;

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<ForumCommentRecord>, RepoError>;

    /// Adds or removes the caller's like, returning the new state and count.
    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(bool, u64), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateBlogArticleParams {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author_id: Uuid,
}

#[async_trait]
pub trait BlogRepo: Send + Sync {
    async fn list_published(&self, limit: u32) -> Result<Vec<BlogArticleRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogArticleRecord>, RepoError>;

    async fn create_article(
        &self,
        params: CreateBlogArticleParams,
    ) -> Result<BlogArticleRecord, RepoError>;
}

#[async_trait]
pub trait NewsletterRepo: Send + Sync {
    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<NewsletterSubscriberRecord>, RepoError>;

    async fn insert_subscriber(
        &self,
        email: &str,
    ) -> Result<NewsletterSubscriberRecord, RepoError>;

    async fn set_active(&self, email: &str, active: bool) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateSubscriptionParams {
    pub user_id: Uuid,
    pub plan_id: String,
    pub provider_order_id: String,
    pub amount_paise: i64,
}

#[async_trait]
pub trait SubscriptionsRepo: Send + Sync {
    async fn create_subscription(
        &self,
        params: CreateSubscriptionParams,
    ) -> Result<SubscriptionRecord, RepoError>;

    async fn find_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<SubscriptionRecord>, RepoError>;

    async fn activate(
        &self,
        provider_order_id: &str,
        provider_payment_id: &str,
        starts_at: OffsetDateTime,
        ends_at: OffsetDateTime,
    ) -> Result<SubscriptionRecord, RepoError>;

    async fn mark_cancelled(&self, provider_order_id: &str) -> Result<(), RepoError>;

    async fn find_active_for_user(
        &self,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Option<SubscriptionRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateDonationParams {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: String,
    pub message: String,
    pub amount_rupees: i64,
    pub provider_order_id: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DonationTotals {
    pub total_amount: i64,
    pub total_donors: u64,
}

#[async_trait]
pub trait DonationsRepo: Send + Sync {
    async fn create_donation(
        &self,
        params: CreateDonationParams,
    ) -> Result<DonationRecord, RepoError>;

    async fn find_by_provider_order_id(
        &self,
        provider_order_id: &str,
    ) -> Result<Option<DonationRecord>, RepoError>;

    async fn complete(
        &self,
        provider_order_id: &str,
        provider_payment_id: &str,
        completed_at: OffsetDateTime,
    ) -> Result<DonationRecord, RepoError>;

    async fn mark_failed(&self, provider_order_id: &str) -> Result<(), RepoError>;

    async fn completed_totals(&self) -> Result<DonationTotals, RepoError>;

    async fn recent_completed(&self, limit: u32) -> Result<Vec<DonationRecord>, RepoError>;
}

#[async_trait]
pub trait ProductVotesRepo: Send + Sync {
    async fn list_products(
        &self,
        month_key: &str,
    ) -> Result<Vec<CandidateProductRecord>, RepoError>;

    async fn find_product(&self, id: Uuid)
    -> Result<Option<CandidateProductRecord>, RepoError>;

    async fn count_user_votes(&self, user_id: Uuid, month_key: &str) -> Result<u32, RepoError>;

    async fn has_voted(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        month_key: &str,
    ) -> Result<bool, RepoError>;

    async fn record_vote(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        month_key: &str,
    ) -> Result<(), RepoError>;

    async fn list_user_votes(
        &self,
        user_id: Uuid,
        month_key: &str,
    ) -> Result<Vec<Uuid>, RepoError>;

    async fn total_votes(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait PasswordResetsRepo: Send + Sync {
    async fn upsert_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError>;

    async fn find_by_email(&self, email: &str)
    -> Result<Option<PasswordResetRecord>, RepoError>;

    async fn mark_used(&self, email: &str, used_at: OffsetDateTime) -> Result<(), RepoError>;
}
