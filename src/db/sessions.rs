use sqlx::{Executor, Sqlite};
use uuid::Uuid;

use crate::db::models::Session;
use crate::db::now;
use crate::error::AppError;

pub struct SessionRepository;

impl SessionRepository {
    /// Open a session for `user_id` that stays valid for `lifetime_secs`.
    pub async fn create<'e, E>(
        executor: E,
        user_id: i64,
        lifetime_secs: i64,
        persistent: bool,
    ) -> Result<Session, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4().to_string();
        let token = Uuid::new_v4().simple().to_string();
        let created_at = now();
        let expires_at = created_at + lifetime_secs;

        let session = sqlx::query_as::<_, Session>(
            r#"
INSERT INTO sessions (id, user_id, token, persistent, expires_at, created_at)
VALUES (?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&token)
        .bind(persistent)
        .bind(expires_at)
        .bind(created_at)
        .fetch_one(executor)
        .await?;

        Ok(session)
    }

    pub async fn get_by_token<'e, E>(executor: E, token: &str) -> Result<Option<Session>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token = ? AND expires_at > ?",
        )
        .bind(token)
        .bind(now())
        .fetch_optional(executor)
        .await?;

        Ok(session)
    }

    pub async fn delete<'e, E>(executor: E, token: &str) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Returns the number of sessions removed.
    pub async fn cleanup_expired<'e, E>(executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now())
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, UserRepository};

    #[tokio::test]
    async fn expired_sessions_are_ignored_and_swept() {
        let pool = connect_in_memory().await.unwrap();
        let user = UserRepository::create(&pool, "susan", "susan@example.com", "x").await.unwrap();

        let live = SessionRepository::create(&pool, user.id, 3600, true).await.unwrap();
        let dead = SessionRepository::create(&pool, user.id, -1, false).await.unwrap();
        assert!(live.persistent);
        assert_ne!(live.token, dead.token);

        assert!(SessionRepository::get_by_token(&pool, &live.token).await.unwrap().is_some());
        assert!(SessionRepository::get_by_token(&pool, &dead.token).await.unwrap().is_none());

        assert_eq!(SessionRepository::cleanup_expired(&pool).await.unwrap(), 1);

        SessionRepository::delete(&pool, &live.token).await.unwrap();
        assert!(SessionRepository::get_by_token(&pool, &live.token).await.unwrap().is_none());
    }
}
