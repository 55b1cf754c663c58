use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CreateForumCommentParams, CreateForumPostParams, ForumRepo, RepoError,
    },
    domain::entities::{ForumCommentRecord, ForumPostRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    author_id: Uuid,
    author_name: String,
    title: String,
    body: String,
    comment_count: i64,
    like_count: i64,
    created_at: OffsetDateTime,
}

impl From<PostRow> for ForumPostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            author_name: row.author_name,
            title: row.title,
            body: row.body,
            comment_count: row.comment_count,
            like_count: row.like_count,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    author_name: String,
    body: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for ForumCommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_name: row.author_name,
            body: row.body,
            created_at: row.created_at,
        }
    }
}

const POST_QUERY: &str = "SELECT p.id, p.author_id, u.display_name AS author_name, p.title, \
     p.body, \
     (SELECT COUNT(*) FROM forum_comments c WHERE c.post_id = p.id) AS comment_count, \
     (SELECT COUNT(*) FROM forum_likes l WHERE l.post_id = p.id) AS like_count, \
     p.created_at \
     FROM forum_posts p INNER JOIN users u ON u.id = p.author_id";

#[async_trait]
impl ForumRepo for PostgresRepositories {
    async fn create_post(
        &self,
        params: CreateForumPostParams,
    ) -> Result<ForumPostRecord, RepoError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO forum_posts (author_id, title, body) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(params.author_id)
        .bind(&params.title)
        .bind(&params.body)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        self.find_post(id).await?.ok_or(RepoError::NotFound)
    }

    async fn list_posts(&self, limit: u32) -> Result<Vec<ForumPostRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_QUERY} ORDER BY p.created_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ForumPostRecord::from).collect())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<ForumPostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{POST_QUERY} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ForumPostRecord::from))
    }

    async fn create_comment(
        &self,
        params: CreateForumCommentParams,
    ) -> Result<ForumCommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "WITH inserted AS ( \
                INSERT INTO forum_comments (post_id, author_id, body) \
                VALUES ($1, $2, $3) \
                RETURNING id, post_id, author_id, body, created_at \
             ) \
             SELECT i.id, i.post_id, i.author_id, u.display_name AS author_name, i.body, \
                    i.created_at \
             FROM inserted i INNER JOIN users u ON u.id = i.author_id",
        )
        .bind(params.post_id)
        .bind(params.author_id)
        .bind(&params.body)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<ForumCommentRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT c.id, c.post_id, c.author_id, u.display_name AS author_name, c.body, \
                    c.created_at \
             FROM forum_comments c INNER JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ForumCommentRecord::from).collect())
    }

    async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<(bool, u64), RepoError> {
        let removed = sqlx::query(
            "DELETE FROM forum_likes WHERE post_id = $1 AND user_id = $2",
        )
        .bind(post_id)
        .bind(user_id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        let liked = if removed == 0 {
            sqlx::query("INSERT INTO forum_likes (post_id, user_id) VALUES ($1, $2)")
                .bind(post_id)
                .bind(user_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
            true
        } else {
            false
        };

        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM forum_likes WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok((liked, Self::convert_count(count)?))
    }
}
