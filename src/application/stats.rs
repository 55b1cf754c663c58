use std::sync::Arc;

use thiserror::Error;

use crate::application::repos::{
    ConcernsRepo, ProductVotesRepo, RepoError, UsersRepo, WaitlistRepo,
};

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommunityStats {
    pub waitlist_count: u64,
    pub member_count: u64,
    pub concern_votes: u64,
    pub product_votes: u64,
}

#[derive(Clone)]
pub struct StatsService {
    users: Arc<dyn UsersRepo>,
    waitlist: Arc<dyn WaitlistRepo>,
    concerns: Arc<dyn ConcernsRepo>,
    product_votes: Arc<dyn ProductVotesRepo>,
}

impl StatsService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        waitlist: Arc<dyn WaitlistRepo>,
        concerns: Arc<dyn ConcernsRepo>,
        product_votes: Arc<dyn ProductVotesRepo>,
    ) -> Self {
        Self {
            users,
            waitlist,
            concerns,
            product_votes,
        }
    }

    pub async fn community(&self) -> Result<CommunityStats, StatsError> {
        Ok(CommunityStats {
            waitlist_count: self.waitlist.count_entries().await?,
            member_count: self.users.count_users().await?,
            concern_votes: self.concerns.total_votes().await?,
            product_votes: self.product_votes.total_votes().await?,
        })
    }
}
