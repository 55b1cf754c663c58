use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::{BlogRepo, CreateBlogArticleParams, RepoError};
use crate::domain::entities::BlogArticleRecord;

const DEFAULT_LIST_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("article not found")]
    NotFound,
    #[error("{0}")]
    Validation(&'static str),
    #[error("an article with this title already exists")]
    DuplicateSlug,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct BlogService {
    repo: Arc<dyn BlogRepo>,
}

impl BlogService {
    pub fn new(repo: Arc<dyn BlogRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<BlogArticleRecord>, BlogError> {
        self.repo
            .list_published(DEFAULT_LIST_LIMIT)
            .await
            .map_err(BlogError::from)
    }

    pub async fn fetch(&self, slug: &str) -> Result<BlogArticleRecord, BlogError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or(BlogError::NotFound)
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        title: &str,
        excerpt: &str,
        body: &str,
    ) -> Result<BlogArticleRecord, BlogError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BlogError::Validation("title must not be empty"));
        }
        if body.trim().is_empty() {
            return Err(BlogError::Validation("body must not be empty"));
        }

        self.repo
            .create_article(CreateBlogArticleParams {
                slug: slugify(title),
                title: title.to_string(),
                excerpt: excerpt.trim().to_string(),
                body: body.trim().to_string(),
                author_id,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => BlogError::DuplicateSlug,
                other => BlogError::Repo(other),
            })
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("What's really in your honey?"), "what-s-really-in-your-honey");
        assert_eq!(slugify("  Lab Notes #12  "), "lab-notes-12");
    }
}
