use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{ConcernsRepo, RepoError};
use crate::domain::entities::ConcernCategoryRecord;

#[derive(Debug, Error)]
pub enum VotingError {
    #[error("concern category not found")]
    CategoryNotFound,
    #[error("you have already voted for this concern")]
    AlreadyVoted,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct VotingService {
    concerns: Arc<dyn ConcernsRepo>,
}

impl VotingService {
    pub fn new(concerns: Arc<dyn ConcernsRepo>) -> Self {
        Self { concerns }
    }

    pub async fn categories(&self) -> Result<Vec<ConcernCategoryRecord>, VotingError> {
        self.concerns.list_categories().await.map_err(VotingError::from)
    }

    /// One vote per user per category; the unique key makes repeats a no-op.
    pub async fn vote(&self, user_id: Uuid, category_id: Uuid) -> Result<(), VotingError> {
        self.concerns
            .find_category(category_id)
            .await?
            .ok_or(VotingError::CategoryNotFound)?;

        self.concerns
            .record_vote(user_id, category_id)
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => VotingError::AlreadyVoted,
                other => VotingError::Repo(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubConcernsRepo {
        category: ConcernCategoryRecord,
        votes: Mutex<Vec<(Uuid, Uuid)>>,
    }

    #[async_trait]
    impl ConcernsRepo for StubConcernsRepo {
        async fn list_categories(&self) -> Result<Vec<ConcernCategoryRecord>, RepoError> {
            let votes = self.votes.lock().unwrap().len() as i64;
            let mut category = self.category.clone();
            category.votes = votes;
            Ok(vec![category])
        }

        async fn find_category(
            &self,
            id: Uuid,
        ) -> Result<Option<ConcernCategoryRecord>, RepoError> {
            Ok(Some(self.category.clone()).filter(|category| category.id == id))
        }

        async fn record_vote(&self, user_id: Uuid, category_id: Uuid) -> Result<(), RepoError> {
            let mut votes = self.votes.lock().unwrap();
            if votes.contains(&(user_id, category_id)) {
                return Err(RepoError::Duplicate {
                    constraint: "concern_votes_pkey".into(),
                });
            }
            votes.push((user_id, category_id));
            Ok(())
        }

        async fn total_votes(&self) -> Result<u64, RepoError> {
            Ok(self.votes.lock().unwrap().len() as u64)
        }
    }

    fn stub() -> StubConcernsRepo {
        StubConcernsRepo {
            category: ConcernCategoryRecord {
                id: Uuid::new_v4(),
                slug: "pesticides".into(),
                label: "Pesticide residue".into(),
                votes: 0,
            },
            votes: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn vote_counts_once_per_user() {
        let repo = Arc::new(stub());
        let category_id = repo.category.id;
        let service = VotingService::new(repo.clone());
        let user = Uuid::new_v4();

        service.vote(user, category_id).await.expect("first vote");
        let repeat = service.vote(user, category_id).await;

        assert!(matches!(repeat, Err(VotingError::AlreadyVoted)));
        assert_eq!(service.categories().await.unwrap()[0].votes, 1);
    }

    #[tokio::test]
    async fn unknown_category_is_rejected() {
        let repo = Arc::new(stub());
        let service = VotingService::new(repo);
        let result = service.vote(Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(matches!(result, Err(VotingError::CategoryNotFound)));
    }
}
