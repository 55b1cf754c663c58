use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ProductVotesRepo, RepoError, SubscriptionsRepo};
use crate::application::subscriptions::is_premium_plan;
use crate::domain::entities::CandidateProductRecord;
use crate::domain::types::MonthKey;

const MEMBER_ALLOWANCE: u32 = 1;
const PREMIUM_ALLOWANCE: u32 = 3;

#[derive(Debug, Error)]
pub enum ProductVoteError {
    #[error("product not found")]
    ProductNotFound,
    #[error("product is not on this month's ballot")]
    WrongMonth,
    #[error("already voted for this product")]
    AlreadyVoted,
    #[error("monthly vote allowance exhausted")]
    AllowanceExhausted,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub votes_used: u32,
    pub votes_allowed: u32,
}

#[derive(Debug, Clone)]
pub struct UserVotes {
    pub month: String,
    pub product_ids: Vec<Uuid>,
    pub votes_used: u32,
    pub votes_allowed: u32,
}

/// Monthly ballot of candidate products. Premium subscribers get a larger
/// vote allowance than ordinary members.
#[derive(Clone)]
pub struct ProductVotingService {
    repo: Arc<dyn ProductVotesRepo>,
    subscriptions: Arc<dyn SubscriptionsRepo>,
}

impl ProductVotingService {
    pub fn new(repo: Arc<dyn ProductVotesRepo>, subscriptions: Arc<dyn SubscriptionsRepo>) -> Self {
        Self {
            repo,
            subscriptions,
        }
    }

    pub async fn ballot(&self) -> Result<Vec<CandidateProductRecord>, ProductVoteError> {
        let month = MonthKey::current();
        self.repo
            .list_products(month.as_str())
            .await
            .map_err(ProductVoteError::from)
    }

    pub async fn vote(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<VoteOutcome, ProductVoteError> {
        let month = MonthKey::current();
        let product = self
            .repo
            .find_product(product_id)
            .await?
            .ok_or(ProductVoteError::ProductNotFound)?;
        if product.month_key != month.as_str() {
            return Err(ProductVoteError::WrongMonth);
        }

        if self.repo.has_voted(user_id, product_id, month.as_str()).await? {
            return Err(ProductVoteError::AlreadyVoted);
        }

        let allowed = self.allowance(user_id).await?;
        let used = self.repo.count_user_votes(user_id, month.as_str()).await?;
        if used >= allowed {
            return Err(ProductVoteError::AllowanceExhausted);
        }

        self.repo
            .record_vote(user_id, product_id, month.as_str())
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => ProductVoteError::AlreadyVoted,
                other => ProductVoteError::Repo(other),
            })?;

        Ok(VoteOutcome {
            votes_used: used + 1,
            votes_allowed: allowed,
        })
    }

    pub async fn my_votes(&self, user_id: Uuid) -> Result<UserVotes, ProductVoteError> {
        let month = MonthKey::current();
        let product_ids = self.repo.list_user_votes(user_id, month.as_str()).await?;
        let votes_allowed = self.allowance(user_id).await?;
        Ok(UserVotes {
            month: month.as_str().to_string(),
            votes_used: product_ids.len() as u32,
            product_ids,
            votes_allowed,
        })
    }

    async fn allowance(&self, user_id: Uuid) -> Result<u32, ProductVoteError> {
        let active = self
            .subscriptions
            .find_active_for_user(user_id, OffsetDateTime::now_utc())
            .await?;
        Ok(match active {
            Some(subscription) if is_premium_plan(&subscription.plan_id) => PREMIUM_ALLOWANCE,
            _ => MEMBER_ALLOWANCE,
        })
    }
}
