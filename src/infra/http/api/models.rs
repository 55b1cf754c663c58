//! Conversions from domain records to wire views.

use time::OffsetDateTime;
use veridia_api_types::{
    BlogArticleView, CandidateProductView, ConcernCategoryView, ForumCommentView, ForumPostView,
    RecentDonation, ReportSummary, SubscriptionPlan, UserProfile,
};

use crate::application::subscriptions::Plan;
use crate::domain::entities::{
    BlogArticleRecord, CandidateProductRecord, ConcernCategoryRecord, DonationRecord,
    ForumCommentRecord, ForumPostRecord, ReportRecord, UserRecord,
};

fn count(value: i64) -> u64 {
    value.max(0) as u64
}

pub fn user_profile(user: &UserRecord) -> UserProfile {
    UserProfile {
        id: user.id,
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        role: user.role.as_str().to_string(),
        created_at: user.created_at,
    }
}

pub fn report_summary(report: &ReportRecord) -> ReportSummary {
    ReportSummary {
        id: report.id,
        slug: report.slug.clone(),
        title: report.title.clone(),
        summary: report.summary.clone(),
        category: report.category.clone(),
        price: report.price_rupees,
        published_at: report.published_at.unwrap_or(report.created_at),
    }
}

pub fn concern_category(category: &ConcernCategoryRecord) -> ConcernCategoryView {
    ConcernCategoryView {
        id: category.id,
        slug: category.slug.clone(),
        label: category.label.clone(),
        votes: count(category.votes),
    }
}

pub fn forum_post(post: &ForumPostRecord) -> ForumPostView {
    ForumPostView {
        id: post.id,
        author_name: post.author_name.clone(),
        title: post.title.clone(),
        body: post.body.clone(),
        comment_count: count(post.comment_count),
        like_count: count(post.like_count),
        created_at: post.created_at,
    }
}

pub fn forum_comment(comment: &ForumCommentRecord) -> ForumCommentView {
    ForumCommentView {
        id: comment.id,
        author_name: comment.author_name.clone(),
        body: comment.body.clone(),
        created_at: comment.created_at,
    }
}

pub fn blog_article(article: &BlogArticleRecord) -> BlogArticleView {
    BlogArticleView {
        id: article.id,
        slug: article.slug.clone(),
        title: article.title.clone(),
        excerpt: article.excerpt.clone(),
        body: article.body.clone(),
        author_name: article.author_name.clone(),
        published_at: article.published_at,
    }
}

pub fn subscription_plan(plan: &Plan, currency: &str) -> SubscriptionPlan {
    SubscriptionPlan {
        id: plan.id.to_string(),
        name: plan.name.to_string(),
        price: plan.price_rupees,
        currency: currency.to_string(),
        duration_days: plan.duration_days,
        popular: plan.popular,
        features: plan.features.iter().map(|f| f.to_string()).collect(),
    }
}

pub fn candidate_product(product: &CandidateProductRecord) -> CandidateProductView {
    CandidateProductView {
        id: product.id,
        name: product.name.clone(),
        brand: product.brand.clone(),
        category: product.category.clone(),
        votes: count(product.votes),
    }
}

pub fn recent_donation(donation: &DonationRecord) -> RecentDonation {
    RecentDonation {
        donor_name: donation.donor_name.clone(),
        amount: donation.amount_rupees,
        message: donation.message.clone(),
        completed_at: donation
            .completed_at
            .unwrap_or_else(OffsetDateTime::now_utc),
    }
}
