use sqlx::{Executor, Sqlite};

use crate::crypto::{hash_password, verify_password};
use crate::db::models::{Post, User};
use crate::db::now;
use crate::error::AppError;

pub struct UserRepository;

impl UserRepository {
    /// Insert a user, hashing `password` first. Duplicate username or email is a `Conflict`.
    pub async fn create<'e, E>(
        executor: E,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let password_hash = hash_password(password)?;

        sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (username, email, password_hash, about_me, last_seen)
VALUES (?, ?, ?, NULL, ?)
RETURNING *
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(now())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::on_unique_violation(e, "Username or email already registered"))
    }

    pub async fn get_by_username<'e, E>(
        executor: E,
        username: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    pub async fn get_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(user)
    }

    /// Look up `username` and check `password` against the stored hash.
    pub async fn authenticate<'e, E>(
        executor: E,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let Some(user) = Self::get_by_username(executor, username).await? else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn update_profile<'e, E>(
        executor: E,
        id: i64,
        username: &str,
        about_me: Option<&str>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE users SET username = ?, about_me = ? WHERE id = ?")
            .bind(username)
            .bind(about_me)
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| AppError::on_unique_violation(e, "Please use a different username."))?;

        Ok(())
    }

    pub async fn touch_last_seen<'e, E>(executor: E, id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
            .bind(now())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Add the follow edge. Returns `false` when it already existed.
    pub async fn follow<'e, E>(executor: E, follower_id: i64, followed_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if follower_id == followed_id {
            return Err(AppError::Validation("You cannot follow yourself!".to_string()));
        }

        let result =
            sqlx::query("INSERT OR IGNORE INTO followers (follower_id, followed_id) VALUES (?, ?)")
                .bind(follower_id)
                .bind(followed_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove the follow edge. Returns `false` when there was none.
    pub async fn unfollow<'e, E>(
        executor: E,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if follower_id == followed_id {
            return Err(AppError::Validation("You cannot unfollow yourself!".to_string()));
        }

        let result = sqlx::query("DELETE FROM followers WHERE follower_id = ? AND followed_id = ?")
            .bind(follower_id)
            .bind(followed_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn is_following<'e, E>(
        executor: E,
        follower_id: i64,
        followed_id: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM followers WHERE follower_id = ? AND followed_id = ?",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(executor)
        .await?;

        Ok(found.is_some())
    }

    /// (followers, followed) counts for `id`.
    pub async fn follow_counts<'e, E>(executor: E, id: i64) -> Result<(i64, i64), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let counts = sqlx::query_as::<_, (i64, i64)>(
            r#"
SELECT
    (SELECT COUNT(*) FROM followers WHERE followed_id = ?1),
    (SELECT COUNT(*) FROM followers WHERE follower_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(counts)
    }

    /// Own posts plus posts of followed users, newest first.
    pub async fn followed_posts<'e, E>(executor: E, id: i64) -> Result<Vec<Post>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let posts = sqlx::query_as::<_, Post>(
            r#"
SELECT p.id, p.body, p.timestamp, p.user_id, u.username AS author, u.email AS author_email
FROM posts p
JOIN users u ON p.user_id = u.id
WHERE p.user_id = ?1
   OR p.user_id IN (SELECT followed_id FROM followers WHERE follower_id = ?1)
ORDER BY p.timestamp DESC, p.id DESC
            "#,
        )
        .bind(id)
        .fetch_all(executor)
        .await?;

        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, PostRepository};

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected() {
        let pool = connect_in_memory().await.unwrap();
        UserRepository::create(&pool, "susan", "susan@example.com", "cat")
            .await
            .unwrap();

        let same_name = UserRepository::create(&pool, "susan", "other@example.com", "cat").await;
        assert!(matches!(same_name, Err(AppError::Conflict(_))));

        let same_email = UserRepository::create(&pool, "john", "susan@example.com", "cat").await;
        assert!(matches!(same_email, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn stores_only_the_hash() {
        let pool = connect_in_memory().await.unwrap();
        let user = UserRepository::create(&pool, "susan", "susan@example.com", "dog")
            .await
            .unwrap();
        assert_ne!(user.password_hash, "dog");

        assert!(UserRepository::authenticate(&pool, "susan", "dog")
            .await
            .unwrap()
            .is_some());
        assert!(UserRepository::authenticate(&pool, "susan", "cat")
            .await
            .unwrap()
            .is_none());
        assert!(UserRepository::authenticate(&pool, "nobody", "dog")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn follow_then_unfollow_restores_graph() {
        let pool = connect_in_memory().await.unwrap();
        let john = UserRepository::create(&pool, "john", "john@example.com", "x").await.unwrap();
        let susan = UserRepository::create(&pool, "susan", "susan@example.com", "x").await.unwrap();

        assert!(!UserRepository::is_following(&pool, john.id, susan.id).await.unwrap());

        assert!(UserRepository::follow(&pool, john.id, susan.id).await.unwrap());
        assert!(!UserRepository::follow(&pool, john.id, susan.id).await.unwrap());
        assert!(UserRepository::is_following(&pool, john.id, susan.id).await.unwrap());
        assert!(!UserRepository::is_following(&pool, susan.id, john.id).await.unwrap());
        assert_eq!(UserRepository::follow_counts(&pool, susan.id).await.unwrap(), (1, 0));
        assert_eq!(UserRepository::follow_counts(&pool, john.id).await.unwrap(), (0, 1));

        assert!(UserRepository::unfollow(&pool, john.id, susan.id).await.unwrap());
        assert!(!UserRepository::unfollow(&pool, john.id, susan.id).await.unwrap());
        assert!(!UserRepository::is_following(&pool, john.id, susan.id).await.unwrap());
        assert_eq!(UserRepository::follow_counts(&pool, susan.id).await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn self_follow_is_rejected() {
        let pool = connect_in_memory().await.unwrap();
        let john = UserRepository::create(&pool, "john", "john@example.com", "x").await.unwrap();

        assert!(matches!(
            UserRepository::follow(&pool, john.id, john.id).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            UserRepository::unfollow(&pool, john.id, john.id).await,
            Err(AppError::Validation(_))
        ));
        assert!(!UserRepository::is_following(&pool, john.id, john.id).await.unwrap());
    }

    #[tokio::test]
    async fn followed_posts_without_follows_is_own_posts_newest_first() {
        let pool = connect_in_memory().await.unwrap();
        let john = UserRepository::create(&pool, "john", "john@example.com", "x").await.unwrap();
        let susan = UserRepository::create(&pool, "susan", "susan@example.com", "x").await.unwrap();

        let first = PostRepository::create(&pool, john.id, "post from john").await.unwrap();
        PostRepository::create(&pool, susan.id, "post from susan").await.unwrap();
        let second = PostRepository::create(&pool, john.id, "another from john").await.unwrap();

        let posts = UserRepository::followed_posts(&pool, john.id).await.unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(posts.iter().all(|p| p.author == "john"));
    }

    #[tokio::test]
    async fn followed_posts_include_followed_users() {
        let pool = connect_in_memory().await.unwrap();
        let john = UserRepository::create(&pool, "john", "john@example.com", "x").await.unwrap();
        let susan = UserRepository::create(&pool, "susan", "susan@example.com", "x").await.unwrap();
        let mary = UserRepository::create(&pool, "mary", "mary@example.com", "x").await.unwrap();

        let own = PostRepository::create(&pool, john.id, "john").await.unwrap();
        let followed = PostRepository::create(&pool, susan.id, "susan").await.unwrap();
        PostRepository::create(&pool, mary.id, "mary").await.unwrap();

        UserRepository::follow(&pool, john.id, susan.id).await.unwrap();

        let ids: Vec<i64> = UserRepository::followed_posts(&pool, john.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![followed.id, own.id]);
    }

    #[tokio::test]
    async fn profile_update_respects_unique_username() {
        let pool = connect_in_memory().await.unwrap();
        let john = UserRepository::create(&pool, "john", "john@example.com", "x").await.unwrap();
        UserRepository::create(&pool, "susan", "susan@example.com", "x").await.unwrap();

        UserRepository::update_profile(&pool, john.id, "johnny", Some("hi there"))
            .await
            .unwrap();
        let johnny = UserRepository::get_by_id(&pool, john.id).await.unwrap().unwrap();
        assert_eq!(johnny.username, "johnny");
        assert_eq!(johnny.about_me.as_deref(), Some("hi there"));

        assert!(matches!(
            UserRepository::update_profile(&pool, john.id, "susan", None).await,
            Err(AppError::Conflict(_))
        ));
    }
}
