use sqlx::{Executor, Sqlite};

use crate::db::models::{Book, Owner};
use crate::error::AppError;

pub struct BookRepository;

impl BookRepository {
    pub async fn create<'e, E>(executor: E, name: &str) -> Result<Book, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let book = sqlx::query_as::<_, Book>("INSERT INTO books (name) VALUES (?) RETURNING *")
            .bind(name)
            .fetch_one(executor)
            .await?;

        Ok(book)
    }

    /// Book names are not unique; the oldest match wins.
    pub async fn get_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Book>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let book = sqlx::query_as::<_, Book>(
            "SELECT * FROM books WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(book)
    }

    pub async fn all<'e, E>(executor: E) -> Result<Vec<Book>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(executor)
            .await?;

        Ok(books)
    }

    /// Books whose name contains `query`, ignoring case (Unicode-aware).
    pub async fn search<'e, E>(executor: E, query: &str) -> Result<Vec<Book>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let needle = query.to_lowercase();
        let books = Self::all(executor).await?;

        Ok(books
            .into_iter()
            .filter(|b| b.name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Owners the book is linked to.
    pub async fn owners<'e, E>(executor: E, book_id: i64) -> Result<Vec<Owner>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let owners = sqlx::query_as::<_, Owner>(
            r#"
SELECT o.id, o.name, o.slug, o.body, o.created
FROM owners o
JOIN owner_books ob ON ob.owner_id = o.id
WHERE ob.book_id = ?
ORDER BY o.id
            "#,
        )
        .bind(book_id)
        .fetch_all(executor)
        .await?;

        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, OwnerRepository};

    #[tokio::test]
    async fn lookup_by_name_prefers_oldest() {
        let pool = connect_in_memory().await.unwrap();
        let first = BookRepository::create(&pool, "Poems").await.unwrap();
        BookRepository::create(&pool, "Poems").await.unwrap();

        assert_eq!(BookRepository::get_by_name(&pool, "Poems").await.unwrap(), Some(first));
        assert!(BookRepository::get_by_name(&pool, "poems").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_and_subscribers() {
        let pool = connect_in_memory().await.unwrap();
        let sawyer = BookRepository::create(&pool, "Tom Sawyer").await.unwrap();
        BookRepository::create(&pool, "Dead Souls").await.unwrap();
        let owner = OwnerRepository::create(&pool, "Mark Tven", "").await.unwrap();
        OwnerRepository::add_book(&pool, owner.id, sawyer.id).await.unwrap();

        assert_eq!(BookRepository::search(&pool, "sawy").await.unwrap(), vec![sawyer.clone()]);
        assert_eq!(BookRepository::all(&pool).await.unwrap().len(), 2);
        assert_eq!(BookRepository::owners(&pool, sawyer.id).await.unwrap(), vec![owner]);
    }

    #[tokio::test]
    async fn search_matches_non_ascii_case() {
        let pool = connect_in_memory().await.unwrap();
        let souls = BookRepository::create(&pool, "Мёртвые души").await.unwrap();

        assert_eq!(BookRepository::search(&pool, "МЁРТВЫЕ").await.unwrap(), vec![souls]);
        assert!(BookRepository::search(&pool, "шинель").await.unwrap().is_empty());
    }
}
