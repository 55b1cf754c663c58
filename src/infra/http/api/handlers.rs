use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use uuid::Uuid;

use veridia_api_types::{
    Ack, AuthResponse, BlogCreateRequest, BlogDetailResponse, BlogListResponse,
    CandidateProductsResponse, CommunityStatsResponse, ConcernCategoriesResponse,
    ConcernVoteRequest, DonationCreateRequest, DonationStatsResponse, DonationVerificationRequest,
    EmailSentResponse, ForumCommentCreateRequest, ForumLikeResponse, ForumPostCreateRequest,
    ForumPostDetailResponse, ForumPostListResponse, LoginRequest, MyProductVotesResponse,
    NewsletterRequest, OrderCreatedResponse, PasswordResetConfirmRequest, PasswordResetRequest,
    PasswordResetVerifyRequest, PaymentVerificationRequest, PlansResponse, ProductVoteRequest,
    ProductVoteResponse, ProfileResponse, RecentDonationsResponse, ReportDetailResponse,
    ReportListResponse, SendEmailRequest, SignupRequest, SubscriptionOrderRequest,
    SubscriptionStatusResponse, TestEmailRequest, WaitlistCountResponse, WaitlistJoinRequest,
};

use crate::application::auth::{AuthError, AuthPrincipal, RegisterCommand};
use crate::application::blog::BlogError;
use crate::application::donations::{DonationCommand, DonationError, VerifyDonationCommand};
use crate::application::email_admin::{EmailAdminError, SendEmailCommand};
use crate::application::forum::ForumError;
use crate::application::newsletter::NewsletterError;
use crate::application::password_reset::PasswordResetError;
use crate::application::product_votes::ProductVoteError;
use crate::application::reports::{ReportsError, VerifyPaymentCommand};
use crate::application::repos::RepoError;
use crate::application::stats::StatsError;
use crate::application::subscriptions::{SubscriptionError, VerifySubscriptionCommand};
use crate::application::voting::VotingError;
use crate::application::waitlist::{JoinWaitlistCommand, WaitlistError};
use crate::application::webhooks::WebhookError;

use super::error::{ApiError, codes};
use super::middleware::MaybePrincipal;
use super::models;
use super::state::ApiState;

const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

fn require_user(principal: &MaybePrincipal) -> Result<&AuthPrincipal, ApiError> {
    principal.0.as_ref().ok_or_else(ApiError::unauthorized)
}

fn require_admin(principal: &MaybePrincipal) -> Result<&AuthPrincipal, ApiError> {
    let principal = require_user(principal)?;
    if !principal.is_admin() {
        return Err(ApiError::admin_required());
    }
    Ok(principal)
}

// -------- Health --------

pub async fn health(State(state): State<ApiState>) -> StatusCode {
    match &state.db {
        Some(db) => match db.health_check().await {
            Ok(()) => StatusCode::NO_CONTENT,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        },
        None => StatusCode::NO_CONTENT,
    }
}

// -------- Auth --------

pub async fn signup(
    State(state): State<ApiState>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .auth
        .register(RegisterCommand {
            email: request.email,
            password: request.password,
            display_name: request.display_name,
        })
        .await
        .map_err(auth_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user: models::user_profile(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<ApiState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, token) = state
        .auth
        .login(&request.email, &request.password)
        .await
        .map_err(auth_to_api)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: models::user_profile(&user),
    }))
}

pub async fn profile(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let user = state
        .auth
        .fetch_profile(principal.user_id)
        .await
        .map_err(auth_to_api)?;

    Ok(Json(ProfileResponse {
        success: true,
        user: models::user_profile(&user),
    }))
}

// -------- Waitlist --------

pub async fn join_waitlist(
    State(state): State<ApiState>,
    Json(request): Json<WaitlistJoinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .waitlist
        .join(JoinWaitlistCommand {
            email: request.email,
            name: request.name,
            city: request.city,
        })
        .await
        .map_err(waitlist_to_api)?;

    Ok((StatusCode::CREATED, Json(Ack::new("You are on the list"))))
}

pub async fn waitlist_count(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.waitlist.count().await.map_err(waitlist_to_api)?;
    Ok(Json(WaitlistCountResponse {
        success: true,
        count,
    }))
}

// -------- Reports --------

pub async fn list_reports(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let reports = state.reports.catalog().await.map_err(reports_to_api)?;
    Ok(Json(ReportListResponse {
        success: true,
        reports: reports.iter().map(models::report_summary).collect(),
    }))
}

pub async fn purchased_reports(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let reports = state
        .reports
        .purchased(principal.user_id)
        .await
        .map_err(reports_to_api)?;

    Ok(Json(ReportListResponse {
        success: true,
        reports: reports.iter().map(models::report_summary).collect(),
    }))
}

pub async fn report_detail(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = principal.0.as_ref().map(|p| p.user_id);
    let (report, has_access) = state
        .reports
        .fetch(id, viewer)
        .await
        .map_err(reports_to_api)?;

    let body = has_access.then(|| report.body.clone());
    Ok(Json(ReportDetailResponse {
        success: true,
        report: models::report_summary(&report),
        body,
    }))
}

pub async fn create_report_order(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let checkout = state
        .reports
        .create_order(principal.user_id, id)
        .await
        .map_err(reports_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            success: true,
            order_id: checkout.provider.provider_order_id,
            amount: checkout.provider.amount_paise,
            currency: checkout.provider.currency,
            key_id: checkout.key_id,
        }),
    ))
}

pub async fn verify_report_payment(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<PaymentVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    state
        .reports
        .verify_payment(
            principal.user_id,
            VerifyPaymentCommand {
                order_id: request.order_id,
                payment_id: request.payment_id,
                signature: request.signature,
            },
        )
        .await
        .map_err(reports_to_api)?;

    Ok(Json(Ack::new("Payment verified, report unlocked")))
}

// -------- Concern voting --------

pub async fn list_concerns(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state.voting.categories().await.map_err(voting_to_api)?;
    Ok(Json(ConcernCategoriesResponse {
        success: true,
        categories: categories.iter().map(models::concern_category).collect(),
    }))
}

pub async fn vote_concern(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<ConcernVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    state
        .voting
        .vote(principal.user_id, request.category_id)
        .await
        .map_err(voting_to_api)?;

    Ok((StatusCode::CREATED, Json(Ack::new("Vote recorded"))))
}

// -------- Forum --------

pub async fn list_forum_posts(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.forum.list_posts().await.map_err(forum_to_api)?;
    Ok(Json(ForumPostListResponse {
        success: true,
        posts: posts.iter().map(models::forum_post).collect(),
    }))
}

pub async fn create_forum_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<ForumPostCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let post = state
        .forum
        .create_post(principal.user_id, &request.title, &request.body)
        .await
        .map_err(forum_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(ForumPostDetailResponse {
            success: true,
            post: models::forum_post(&post),
            comments: Vec::new(),
        }),
    ))
}

pub async fn forum_post_detail(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (post, comments) = state
        .forum
        .post_with_comments(id)
        .await
        .map_err(forum_to_api)?;

    Ok(Json(ForumPostDetailResponse {
        success: true,
        post: models::forum_post(&post),
        comments: comments.iter().map(models::forum_comment).collect(),
    }))
}

pub async fn add_forum_comment(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Path(id): Path<Uuid>,
    Json(request): Json<ForumCommentCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let comment = state
        .forum
        .add_comment(id, principal.user_id, &request.body)
        .await
        .map_err(forum_to_api)?;

    Ok((StatusCode::CREATED, Json(models::forum_comment(&comment))))
}

pub async fn toggle_forum_like(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let (liked, like_count) = state
        .forum
        .toggle_like(id, principal.user_id)
        .await
        .map_err(forum_to_api)?;

    Ok(Json(ForumLikeResponse {
        success: true,
        liked,
        like_count,
    }))
}

// -------- Blog --------

pub async fn list_blog(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let articles = state.blog.list().await.map_err(blog_to_api)?;
    Ok(Json(BlogListResponse {
        success: true,
        articles: articles.iter().map(models::blog_article).collect(),
    }))
}

pub async fn blog_detail(
    State(state): State<ApiState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.blog.fetch(&slug).await.map_err(blog_to_api)?;
    Ok(Json(BlogDetailResponse {
        success: true,
        article: models::blog_article(&article),
    }))
}

pub async fn create_blog_article(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<BlogCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_admin(&principal)?;
    let article = state
        .blog
        .create(
            principal.user_id,
            &request.title,
            &request.excerpt,
            &request.body,
        )
        .await
        .map_err(blog_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(BlogDetailResponse {
            success: true,
            article: models::blog_article(&article),
        }),
    ))
}

// -------- Newsletter --------

pub async fn newsletter_subscribe(
    State(state): State<ApiState>,
    Json(request): Json<NewsletterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .newsletter
        .subscribe(&request.email)
        .await
        .map_err(newsletter_to_api)?;

    Ok((StatusCode::CREATED, Json(Ack::new("Subscribed"))))
}

pub async fn newsletter_unsubscribe(
    State(state): State<ApiState>,
    Json(request): Json<NewsletterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .newsletter
        .unsubscribe(&request.email)
        .await
        .map_err(newsletter_to_api)?;

    Ok(Json(Ack::new("Unsubscribed")))
}

// -------- Community stats --------

pub async fn community_stats(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.stats.community().await.map_err(stats_to_api)?;
    Ok(Json(CommunityStatsResponse {
        success: true,
        waitlist_count: stats.waitlist_count,
        member_count: stats.member_count,
        concern_votes: stats.concern_votes,
        product_votes: stats.product_votes,
    }))
}

// -------- Subscriptions --------

pub async fn subscription_plans(State(state): State<ApiState>) -> Json<PlansResponse> {
    let currency = state.subscriptions.currency();
    Json(PlansResponse {
        success: true,
        plans: state
            .subscriptions
            .plans()
            .iter()
            .map(|plan| models::subscription_plan(plan, currency))
            .collect(),
    })
}

pub async fn create_subscription_order(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<SubscriptionOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let checkout = state
        .subscriptions
        .create_order(principal.user_id, &request.plan_id)
        .await
        .map_err(subscription_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            success: true,
            order_id: checkout.provider.provider_order_id,
            amount: checkout.provider.amount_paise,
            currency: checkout.provider.currency,
            key_id: checkout.key_id,
        }),
    ))
}

pub async fn verify_subscription_payment(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<PaymentVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let subscription = state
        .subscriptions
        .verify_payment(
            principal.user_id,
            VerifySubscriptionCommand {
                order_id: request.order_id,
                payment_id: request.payment_id,
                signature: request.signature,
            },
        )
        .await
        .map_err(subscription_to_api)?;

    Ok(Json(SubscriptionStatusResponse {
        success: true,
        active: true,
        plan_id: Some(subscription.plan_id),
        ends_at: subscription.ends_at,
    }))
}

pub async fn subscription_status(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let subscription = state
        .subscriptions
        .status(principal.user_id)
        .await
        .map_err(subscription_to_api)?;

    let response = match subscription {
        Some(subscription) => SubscriptionStatusResponse {
            success: true,
            active: true,
            plan_id: Some(subscription.plan_id),
            ends_at: subscription.ends_at,
        },
        None => SubscriptionStatusResponse {
            success: true,
            active: false,
            plan_id: None,
            ends_at: None,
        },
    };
    Ok(Json(response))
}

// -------- Donations --------

pub async fn create_donation_order(
    State(state): State<ApiState>,
    Json(request): Json<DonationCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let checkout = state
        .donations
        .create_order(DonationCommand {
            donor_name: request.donor_name,
            donor_email: request.donor_email,
            donor_phone: request.donor_phone,
            message: request.message,
            amount_rupees: request.amount,
        })
        .await
        .map_err(donation_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            success: true,
            order_id: checkout.provider.provider_order_id,
            amount: checkout.provider.amount_paise,
            currency: checkout.provider.currency,
            key_id: checkout.key_id,
        }),
    ))
}

pub async fn verify_donation_payment(
    State(state): State<ApiState>,
    Json(request): Json<DonationVerificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .donations
        .verify_payment(VerifyDonationCommand {
            order_id: request.order_id,
            payment_id: request.payment_id,
            signature: request.signature,
        })
        .await
        .map_err(donation_to_api)?;

    Ok(Json(Ack::new("Thank you for your donation")))
}

pub async fn donation_stats(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.donations.stats().await.map_err(donation_to_api)?;
    Ok(Json(DonationStatsResponse {
        success: true,
        total_amount: stats.totals.total_amount,
        total_donors: stats.totals.total_donors,
    }))
}

pub async fn recent_donations(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.donations.stats().await.map_err(donation_to_api)?;
    Ok(Json(RecentDonationsResponse {
        success: true,
        donations: stats.recent.iter().map(models::recent_donation).collect(),
    }))
}

// -------- Product voting --------

pub async fn product_ballot(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .product_votes
        .ballot()
        .await
        .map_err(product_vote_to_api)?;

    Ok(Json(CandidateProductsResponse {
        success: true,
        month: crate::domain::types::MonthKey::current().0,
        products: products.iter().map(models::candidate_product).collect(),
    }))
}

pub async fn vote_product(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<ProductVoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let outcome = state
        .product_votes
        .vote(principal.user_id, request.product_id)
        .await
        .map_err(product_vote_to_api)?;

    Ok((
        StatusCode::CREATED,
        Json(ProductVoteResponse {
            success: true,
            votes_used: outcome.votes_used,
            votes_allowed: outcome.votes_allowed,
        }),
    ))
}

pub async fn my_product_votes(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_user(&principal)?;
    let votes = state
        .product_votes
        .my_votes(principal.user_id)
        .await
        .map_err(product_vote_to_api)?;

    Ok(Json(MyProductVotesResponse {
        success: true,
        month: votes.month,
        product_ids: votes.product_ids,
        votes_used: votes.votes_used,
        votes_allowed: votes.votes_allowed,
    }))
}

// -------- Password reset --------

pub async fn request_password_reset(
    State(state): State<ApiState>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .password_reset
        .request_reset(&request.email)
        .await
        .map_err(password_reset_to_api)?;

    Ok(Json(Ack::new(
        "If that address has an account, a reset code is on its way",
    )))
}

pub async fn verify_password_reset(
    State(state): State<ApiState>,
    Json(request): Json<PasswordResetVerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .password_reset
        .verify_token(&request.email, &request.reset_token)
        .await
        .map_err(password_reset_to_api)?;

    Ok(Json(Ack::new("Reset code is valid")))
}

pub async fn confirm_password_reset(
    State(state): State<ApiState>,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .password_reset
        .confirm(&request.email, &request.reset_token, &request.new_password)
        .await
        .map_err(password_reset_to_api)?;

    Ok(Json(Ack::new("Password updated")))
}

// -------- Admin email --------

pub async fn send_admin_email(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<SendEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&principal)?;
    let delivery = state
        .email_admin
        .send_custom(SendEmailCommand {
            to: request.to_email,
            subject: request.subject,
            html_body: request.html_body,
            text_body: request.text_body,
            tags: request.tags,
        })
        .await
        .map_err(email_to_api)?;

    Ok(Json(EmailSentResponse {
        success: true,
        message: "Email sent".to_string(),
        message_id: delivery.message_id,
    }))
}

pub async fn send_test_email(
    State(state): State<ApiState>,
    Extension(principal): Extension<MaybePrincipal>,
    Json(request): Json<TestEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&principal)?;
    let delivery = state
        .email_admin
        .send_test(&request.to_email)
        .await
        .map_err(email_to_api)?;

    Ok(Json(EmailSentResponse {
        success: true,
        message: "Test email sent".to_string(),
        message_id: delivery.message_id,
    }))
}

// -------- Payment webhook --------

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub handled: &'static str,
}

/// The provider signs the raw body, so this handler must read bytes before
/// any JSON parsing happens.
pub async fn payment_webhook(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            ApiError::bad_request("Missing webhook signature header", None)
        })?;

    let outcome = state
        .webhooks
        .handle(&body, signature)
        .await
        .map_err(webhook_to_api)?;

    Ok(Json(WebhookAck {
        success: true,
        handled: outcome.as_str(),
    }))
}

// -------- Error mapping --------

fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "A matching record already exists",
            Some(format!("constraint: {constraint}")),
        ),
        RepoError::InvalidInput { message } => {
            ApiError::bad_request("Invalid input", Some(message))
        }
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Data integrity violation",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Storage failure",
            Some(message),
        ),
    }
}

fn auth_to_api(err: AuthError) -> ApiError {
    match err {
        AuthError::EmailTaken => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Email is already registered",
            None,
        ),
        AuthError::InvalidCredentials => ApiError::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Invalid email or password",
            None,
        ),
        AuthError::Validation(message) => ApiError::bad_request("Invalid input", Some(message.to_string())),
        AuthError::Hashing(message) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Could not process credentials",
            Some(message),
        ),
        AuthError::Repo(err) => repo_to_api(err),
    }
}

fn waitlist_to_api(err: WaitlistError) -> ApiError {
    match err {
        WaitlistError::AlreadyJoined => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Email is already on the waitlist",
            None,
        ),
        WaitlistError::Validation(message) => {
            ApiError::bad_request("Invalid input", Some(message.to_string()))
        }
        WaitlistError::Repo(err) => repo_to_api(err),
    }
}

fn reports_to_api(err: ReportsError) -> ApiError {
    match err {
        ReportsError::NotFound => ApiError::not_found("Report not found"),
        ReportsError::Unpublished => ApiError::new(
            StatusCode::CONFLICT,
            codes::INVALID_INPUT,
            "Report is not available for purchase",
            None,
        ),
        ReportsError::OrderNotFound => ApiError::not_found("Payment order not found"),
        ReportsError::InvalidSignature => ApiError::invalid_signature(),
        ReportsError::Gateway(err) => gateway_to_api(err),
        ReportsError::Repo(err) => repo_to_api(err),
    }
}

fn voting_to_api(err: VotingError) -> ApiError {
    match err {
        VotingError::CategoryNotFound => ApiError::not_found("Concern category not found"),
        VotingError::AlreadyVoted => ApiError::new(
            StatusCode::CONFLICT,
            codes::ALREADY_VOTED,
            "You have already voted for this concern",
            None,
        ),
        VotingError::Repo(err) => repo_to_api(err),
    }
}

fn forum_to_api(err: ForumError) -> ApiError {
    match err {
        ForumError::PostNotFound => ApiError::not_found("Forum post not found"),
        ForumError::Validation(message) => {
            ApiError::bad_request("Invalid input", Some(message.to_string()))
        }
        ForumError::Repo(err) => repo_to_api(err),
    }
}

fn blog_to_api(err: BlogError) -> ApiError {
    match err {
        BlogError::NotFound => ApiError::not_found("Article not found"),
        BlogError::DuplicateSlug => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "An article with this title already exists",
            None,
        ),
        BlogError::Validation(message) => {
            ApiError::bad_request("Invalid input", Some(message.to_string()))
        }
        BlogError::Repo(err) => repo_to_api(err),
    }
}

fn newsletter_to_api(err: NewsletterError) -> ApiError {
    match err {
        NewsletterError::AlreadySubscribed => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Email is already subscribed",
            None,
        ),
        NewsletterError::NotSubscribed => ApiError::not_found("Email is not subscribed"),
        NewsletterError::Validation(message) => {
            ApiError::bad_request("Invalid input", Some(message.to_string()))
        }
        NewsletterError::Repo(err) => repo_to_api(err),
    }
}

fn stats_to_api(err: StatsError) -> ApiError {
    match err {
        StatsError::Repo(err) => repo_to_api(err),
    }
}

fn subscription_to_api(err: SubscriptionError) -> ApiError {
    match err {
        SubscriptionError::UnknownPlan => ApiError::not_found("Unknown subscription plan"),
        SubscriptionError::OrderNotFound => ApiError::not_found("Subscription order not found"),
        SubscriptionError::InvalidSignature => ApiError::invalid_signature(),
        SubscriptionError::Gateway(err) => gateway_to_api(err),
        SubscriptionError::Repo(err) => repo_to_api(err),
    }
}

fn donation_to_api(err: DonationError) -> ApiError {
    match err {
        DonationError::Validation(message) => {
            ApiError::bad_request("Invalid input", Some(message.to_string()))
        }
        DonationError::OrderNotFound => ApiError::not_found("Donation order not found"),
        DonationError::InvalidSignature => ApiError::invalid_signature(),
        DonationError::Gateway(err) => gateway_to_api(err),
        DonationError::Repo(err) => repo_to_api(err),
    }
}

fn product_vote_to_api(err: ProductVoteError) -> ApiError {
    match err {
        ProductVoteError::ProductNotFound => ApiError::not_found("Product not found"),
        ProductVoteError::WrongMonth => ApiError::new(
            StatusCode::CONFLICT,
            codes::INVALID_INPUT,
            "Product is not on this month's ballot",
            None,
        ),
        ProductVoteError::AlreadyVoted => ApiError::new(
            StatusCode::CONFLICT,
            codes::ALREADY_VOTED,
            "Already voted for this product",
            None,
        ),
        ProductVoteError::AllowanceExhausted => ApiError::new(
            StatusCode::CONFLICT,
            codes::VOTE_LIMIT,
            "Monthly vote allowance exhausted",
            None,
        ),
        ProductVoteError::Repo(err) => repo_to_api(err),
    }
}

fn password_reset_to_api(err: PasswordResetError) -> ApiError {
    match err {
        PasswordResetError::InvalidToken => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_TOKEN,
            "Invalid or expired reset code",
            None,
        ),
        PasswordResetError::Validation(message) => {
            ApiError::bad_request("Invalid input", Some(message.to_string()))
        }
        PasswordResetError::Repo(err) => repo_to_api(err),
    }
}

fn email_to_api(err: EmailAdminError) -> ApiError {
    match err {
        EmailAdminError::Validation(message) => {
            ApiError::bad_request("Invalid input", Some(message.to_string()))
        }
        EmailAdminError::Delivery(err) => ApiError::new(
            StatusCode::BAD_GATEWAY,
            codes::EMAIL_DELIVERY,
            "Email delivery failed",
            Some(err.to_string()),
        ),
    }
}

fn webhook_to_api(err: WebhookError) -> ApiError {
    match err {
        WebhookError::InvalidSignature => ApiError::new(
            StatusCode::UNAUTHORIZED,
            codes::INVALID_SIGNATURE,
            "Webhook signature verification failed",
            None,
        ),
        WebhookError::Malformed(message) => {
            ApiError::bad_request("Malformed webhook payload", Some(message))
        }
        WebhookError::Repo(err) => repo_to_api(err),
    }
}

fn gateway_to_api(err: crate::application::clients::ClientError) -> ApiError {
    ApiError::new(
        StatusCode::BAD_GATEWAY,
        codes::PAYMENT_PROVIDER,
        "Payment provider request failed",
        Some(err.to_string()),
    )
}
