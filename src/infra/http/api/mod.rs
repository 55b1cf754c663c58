pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::log_responses;

pub fn build_api_router(state: ApiState) -> Router {
    let auth_state = state.clone();
    let rate_state = state.clone();

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/profile", get(handlers::profile))
        .route("/api/waitlist", post(handlers::join_waitlist))
        .route("/api/waitlist/count", get(handlers::waitlist_count))
        .route("/api/reports", get(handlers::list_reports))
        .route("/api/reports/purchased", get(handlers::purchased_reports))
        .route("/api/reports/{id}", get(handlers::report_detail))
        .route(
            "/api/reports/{id}/order",
            post(handlers::create_report_order),
        )
        .route(
            "/api/reports/verify-payment",
            post(handlers::verify_report_payment),
        )
        .route("/api/concerns", get(handlers::list_concerns))
        .route("/api/concerns/vote", post(handlers::vote_concern))
        .route(
            "/api/forum/posts",
            get(handlers::list_forum_posts).post(handlers::create_forum_post),
        )
        .route("/api/forum/posts/{id}", get(handlers::forum_post_detail))
        .route(
            "/api/forum/posts/{id}/comments",
            post(handlers::add_forum_comment),
        )
        .route(
            "/api/forum/posts/{id}/like",
            post(handlers::toggle_forum_like),
        )
        .route(
            "/api/blog",
            get(handlers::list_blog).post(handlers::create_blog_article),
        )
        .route("/api/blog/{slug}", get(handlers::blog_detail))
        .route(
            "/api/newsletter/subscribe",
            post(handlers::newsletter_subscribe),
        )
        .route(
            "/api/newsletter/unsubscribe",
            post(handlers::newsletter_unsubscribe),
        )
        .route("/api/stats", get(handlers::community_stats))
        .route(
            "/api/subscriptions/plans",
            get(handlers::subscription_plans),
        )
        .route(
            "/api/subscriptions/order",
            post(handlers::create_subscription_order),
        )
        .route(
            "/api/subscriptions/verify-payment",
            post(handlers::verify_subscription_payment),
        )
        .route(
            "/api/subscriptions/status",
            get(handlers::subscription_status),
        )
        .route("/api/donations/order", post(handlers::create_donation_order))
        .route(
            "/api/donations/verify-payment",
            post(handlers::verify_donation_payment),
        )
        .route("/api/donations/stats", get(handlers::donation_stats))
        .route("/api/donations/recent", get(handlers::recent_donations))
        .route("/api/products", get(handlers::product_ballot))
        .route("/api/products/vote", post(handlers::vote_product))
        .route("/api/products/my-votes", get(handlers::my_product_votes))
        .route(
            "/api/password-reset/request",
            post(handlers::request_password_reset),
        )
        .route(
            "/api/password-reset/verify",
            post(handlers::verify_password_reset),
        )
        .route(
            "/api/password-reset/confirm",
            post(handlers::confirm_password_reset),
        )
        .route("/api/admin/email/send", post(handlers::send_admin_email))
        .route("/api/admin/email/test", post(handlers::send_test_email))
        .route("/api/webhooks/payments", post(handlers::payment_webhook))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            rate_state,
            middleware::api_rate_limit,
        ))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            middleware::attach_principal,
        ))
        .layer(axum_middleware::from_fn(log_responses))
}
