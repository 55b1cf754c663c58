use std::sync::Arc;

use crate::application::auth::AuthService;
use crate::application::blog::BlogService;
use crate::application::donations::DonationsService;
use crate::application::email_admin::EmailAdminService;
use crate::application::forum::ForumService;
use crate::application::newsletter::NewsletterService;
use crate::application::password_reset::PasswordResetService;
use crate::application::product_votes::ProductVotingService;
use crate::application::reports::ReportsService;
use crate::application::stats::StatsService;
use crate::application::subscriptions::SubscriptionsService;
use crate::application::voting::VotingService;
use crate::application::waitlist::WaitlistService;
use crate::application::webhooks::WebhooksService;
use crate::infra::db::PostgresRepositories;

use super::rate_limit::ApiRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub auth: Arc<AuthService>,
    pub waitlist: Arc<WaitlistService>,
    pub reports: Arc<ReportsService>,
    pub voting: Arc<VotingService>,
    pub forum: Arc<ForumService>,
    pub blog: Arc<BlogService>,
    pub newsletter: Arc<NewsletterService>,
    pub stats: Arc<StatsService>,
    pub subscriptions: Arc<SubscriptionsService>,
    pub donations: Arc<DonationsService>,
    pub product_votes: Arc<ProductVotingService>,
    pub password_reset: Arc<PasswordResetService>,
    pub email_admin: Arc<EmailAdminService>,
    pub webhooks: Arc<WebhooksService>,
    pub db: Option<Arc<PostgresRepositories>>,
    pub rate_limiter: Arc<ApiRateLimiter>,
}
