//! Wire types shared between the Veridia server and API consumers.
//!
//! Every successful response body carries `success: true`; error bodies use
//! the `{"error": {code, message, hint}}` envelope emitted by the server.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

fn default_true() -> bool {
    true
}

/// Generic acknowledgement body for operations without a dedicated payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default = "default_true")]
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// -------- Auth --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

// -------- Waitlist --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistJoinRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistCountResponse {
    pub success: bool,
    pub count: u64,
}

// -------- Reports --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub category: String,
    /// Price in rupees.
    pub price: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub success: bool,
    pub reports: Vec<ReportSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDetailResponse {
    pub success: bool,
    pub report: ReportSummary,
    /// Full body is present only when the caller has purchased access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

// -------- Payments --------

/// Provider order created for a checkout, echoed to the client so it can
/// open the payment widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedResponse {
    pub success: bool,
    pub order_id: String,
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

/// Client-side payment confirmation carrying the provider signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentVerificationRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

// -------- Voting --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcernCategoryView {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub votes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcernCategoriesResponse {
    pub success: bool,
    pub categories: Vec<ConcernCategoryView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcernVoteRequest {
    pub category_id: Uuid,
}

// -------- Forum --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumPostCreateRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumCommentCreateRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumPostView {
    pub id: Uuid,
    pub author_name: String,
    pub title: String,
    pub body: String,
    pub comment_count: u64,
    pub like_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumCommentView {
    pub id: Uuid,
    pub author_name: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumPostListResponse {
    pub success: bool,
    pub posts: Vec<ForumPostView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumPostDetailResponse {
    pub success: bool,
    pub post: ForumPostView,
    pub comments: Vec<ForumCommentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumLikeResponse {
    pub success: bool,
    pub liked: bool,
    pub like_count: u64,
}

// -------- Blog --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogArticleView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogListResponse {
    pub success: bool,
    pub articles: Vec<BlogArticleView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogDetailResponse {
    pub success: bool,
    pub article: BlogArticleView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogCreateRequest {
    pub title: String,
    pub excerpt: String,
    pub body: String,
}

// -------- Newsletter --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterRequest {
    pub email: String,
}

// -------- Stats --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityStatsResponse {
    pub success: bool,
    pub waitlist_count: u64,
    pub member_count: u64,
    pub concern_votes: u64,
    pub product_votes: u64,
}

// -------- Subscriptions --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    /// Price in rupees.
    pub price: i64,
    pub currency: String,
    pub duration_days: i64,
    pub popular: bool,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansResponse {
    pub success: bool,
    pub plans: Vec<SubscriptionPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionOrderRequest {
    pub plan_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatusResponse {
    pub success: bool,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ends_at: Option<OffsetDateTime>,
}

// -------- Donations --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationCreateRequest {
    /// Amount in rupees.
    pub amount: i64,
    pub donor_name: String,
    pub donor_email: String,
    #[serde(default)]
    pub donor_phone: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationVerificationRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationStatsResponse {
    pub success: bool,
    pub total_amount: i64,
    pub total_donors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentDonation {
    pub donor_name: String,
    pub amount: i64,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentDonationsResponse {
    pub success: bool,
    pub donations: Vec<RecentDonation>,
}

// -------- Product voting --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProductView {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub votes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProductsResponse {
    pub success: bool,
    pub month: String,
    pub products: Vec<CandidateProductView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVoteRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVoteResponse {
    pub success: bool,
    pub votes_used: u32,
    pub votes_allowed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyProductVotesResponse {
    pub success: bool,
    pub month: String,
    pub product_ids: Vec<Uuid>,
    pub votes_used: u32,
    pub votes_allowed: u32,
}

// -------- Password reset --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetVerifyRequest {
    pub email: String,
    pub reset_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetConfirmRequest {
    pub email: String,
    pub reset_token: String,
    pub new_password: String,
}

// -------- Email admin --------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
    #[serde(default)]
    pub text_body: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestEmailRequest {
    pub to_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSentResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}
