use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{BlogRepo, CreateBlogArticleParams, RepoError},
    domain::entities::BlogArticleRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: Uuid,
    slug: String,
    title: String,
    excerpt: String,
    body: String,
    author_id: Uuid,
    author_name: String,
    published_at: OffsetDateTime,
    created_at: OffsetDateTime,
}

impl From<ArticleRow> for BlogArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            body: row.body,
            author_id: row.author_id,
            author_name: row.author_name,
            published_at: row.published_at,
            created_at: row.created_at,
        }
    }
}

const ARTICLE_QUERY: &str = "SELECT a.id, a.slug, a.title, a.excerpt, a.body, a.author_id, \
     u.display_name AS author_name, a.published_at, a.created_at \
     FROM blog_articles a INNER JOIN users u ON u.id = a.author_id";

#[async_trait]
impl BlogRepo for PostgresRepositories {
    async fn list_published(&self, limit: u32) -> Result<Vec<BlogArticleRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "{ARTICLE_QUERY} ORDER BY a.published_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BlogArticleRecord::from).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<BlogArticleRecord>, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!("{ARTICLE_QUERY} WHERE a.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(BlogArticleRecord::from))
    }

    async fn create_article(
        &self,
        params: CreateBlogArticleParams,
    ) -> Result<BlogArticleRecord, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(
            "WITH inserted AS ( \
                INSERT INTO blog_articles (slug, title, excerpt, body, author_id) \
                VALUES ($1, $2, $3, $4, $5) \
                RETURNING id, slug, title, excerpt, body, author_id, published_at, created_at \
             ) \
             SELECT i.id, i.slug, i.title, i.excerpt, i.body, i.author_id, \
                    u.display_name AS author_name, i.published_at, i.created_at \
             FROM inserted i INNER JOIN users u ON u.id = i.author_id",
        )
        .bind(&params.slug)
        .bind(&params.title)
        .bind(&params.excerpt)
        .bind(&params.body)
        .bind(params.author_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
