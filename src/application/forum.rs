use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{
    CreateForumCommentParams, CreateForumPostParams, ForumRepo, RepoError,
};
use crate::domain::entities::{ForumCommentRecord, ForumPostRecord};

const DEFAULT_LIST_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum ForumError {
    #[error("forum post not found")]
    PostNotFound,
    #[error("{0}")]
    Validation(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ForumService {
    repo: Arc<dyn ForumRepo>,
}

impl ForumService {
    pub fn new(repo: Arc<dyn ForumRepo>) -> Self {
        Self { repo }
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<ForumPostRecord, ForumError> {
        let title = title.trim();
        let body = body.trim();
        if title.is_empty() {
            return Err(ForumError::Validation("title must not be empty"));
        }
        if body.is_empty() {
            return Err(ForumError::Validation("body must not be empty"));
        }

        self.repo
            .create_post(CreateForumPostParams {
                author_id,
                title: title.to_string(),
                body: body.to_string(),
            })
            .await
            .map_err(ForumError::from)
    }

    pub async fn list_posts(&self) -> Result<Vec<ForumPostRecord>, ForumError> {
        self.repo
            .list_posts(DEFAULT_LIST_LIMIT)
            .await
            .map_err(ForumError::from)
    }

    pub async fn post_with_comments(
        &self,
        post_id: Uuid,
    ) -> Result<(ForumPostRecord, Vec<ForumCommentRecord>), ForumError> {
        let post = self
            .repo
            .find_post(post_id)
            .await?
            .ok_or(ForumError::PostNotFound)?;
        let comments = self.repo.list_comments(post_id).await?;
        Ok((post, comments))
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<ForumCommentRecord, ForumError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ForumError::Validation("comment must not be empty"));
        }
        self.repo
            .find_post(post_id)
            .await?
            .ok_or(ForumError::PostNotFound)?;

        self.repo
            .create_comment(CreateForumCommentParams {
                post_id,
                author_id,
                body: body.to_string(),
            })
            .await
            .map_err(ForumError::from)
    }

    pub async fn toggle_like(
        &self,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<(bool, u64), ForumError> {
        self.repo
            .find_post(post_id)
            .await?
            .ok_or(ForumError::PostNotFound)?;
        self.repo
            .toggle_like(post_id, user_id)
            .await
            .map_err(ForumError::from)
    }
}
