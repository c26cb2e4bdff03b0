use sqlx::{Acquire, Executor, Sqlite};

use crate::db::models::Post;
use crate::db::now;
use crate::error::AppError;

pub struct PostRepository;

impl PostRepository {
    pub async fn create<'a, A>(conn: A, user_id: i64, body: &str) -> Result<Post, AppError>
    where
        A: Acquire<'a, Database = Sqlite>,
    {
        let mut conn = conn.acquire().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
INSERT INTO posts (body, timestamp, user_id)
VALUES (?, ?, ?)
RETURNING id
            "#,
        )
        .bind(body)
        .bind(now())
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        // Fetch with author joined
        let post = Self::get_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created post".to_string()))?;

        Ok(post)
    }

    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Post>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let post = sqlx::query_as::<_, Post>(
            r#"
SELECT p.id, p.body, p.timestamp, p.user_id, u.username AS author, u.email AS author_email
FROM posts p
JOIN users u ON p.user_id = u.id
WHERE p.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(post)
    }

    /// Every post, newest first.
    pub async fn all<'e, E>(executor: E) -> Result<Vec<Post>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let posts = sqlx::query_as::<_, Post>(
            r#"
SELECT p.id, p.body, p.timestamp, p.user_id, u.username AS author, u.email AS author_email
FROM posts p
JOIN users u ON p.user_id = u.id
ORDER BY p.timestamp DESC, p.id DESC
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(posts)
    }

    pub async fn by_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<Post>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let posts = sqlx::query_as::<_, Post>(
            r#"
SELECT p.id, p.body, p.timestamp, p.user_id, u.username AS author, u.email AS author_email
FROM posts p
JOIN users u ON p.user_id = u.id
WHERE p.user_id = ?
ORDER BY p.timestamp DESC, p.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(posts)
    }
}
