use sqlx::{Acquire, Executor, Sqlite};

use crate::db::models::{Book, Owner};
use crate::db::now;
use crate::db::pagination::{offset, Page};
use crate::error::AppError;
use crate::slug::slugify;

pub struct OwnerRepository;

impl OwnerRepository {
    /// Insert an owner; the slug is derived from `name` here and never changes.
    pub async fn create<'e, E>(executor: E, name: &str, body: &str) -> Result<Owner, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let slug = slugify(name);

        sqlx::query_as::<_, Owner>(
            r#"
INSERT INTO owners (name, slug, body, created)
VALUES (?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(name)
        .bind(&slug)
        .bind(body)
        .bind(now())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::on_unique_violation(e, format!("Author {} already exists", slug)))
    }

    pub async fn get_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Owner>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT * FROM owners WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(owner)
    }

    pub async fn get_by_slug<'e, E>(executor: E, slug: &str) -> Result<Option<Owner>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let owner = sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE slug = ?")
            .bind(slug)
            .fetch_optional(executor)
            .await?;

        Ok(owner)
    }

    /// Delete the owner with `slug`; its association rows go with it.
    /// Returns `false` when no owner had that slug.
    pub async fn delete_by_slug<'e, E>(executor: E, slug: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM owners WHERE slug = ?")
            .bind(slug)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn all<'e, E>(executor: E) -> Result<Vec<Owner>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let owners = sqlx::query_as::<_, Owner>("SELECT * FROM owners ORDER BY id")
            .fetch_all(executor)
            .await?;

        Ok(owners)
    }

    /// Owners whose name or body contains `query`, ignoring case.
    ///
    /// SQLite's `lower` only folds ASCII, so the match runs on Unicode
    /// lowercase forms here instead.
    pub async fn search<'e, E>(executor: E, query: &str) -> Result<Vec<Owner>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let needle = query.to_lowercase();
        let owners = Self::all(executor).await?;

        Ok(owners
            .into_iter()
            .filter(|o| {
                o.name.to_lowercase().contains(&needle) || o.body.to_lowercase().contains(&needle)
            })
            .collect())
    }

    /// Newest owners first, `per_page` at a time.
    pub async fn page<'a, A>(conn: A, page: u32, per_page: u32) -> Result<Page<Owner>, AppError>
    where
        A: Acquire<'a, Database = Sqlite>,
    {
        let mut conn = conn.acquire().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM owners")
            .fetch_one(&mut *conn)
            .await?;

        let owners = sqlx::query_as::<_, Owner>(
            "SELECT * FROM owners ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(i64::from(per_page))
        .bind(offset(page, per_page))
        .fetch_all(&mut *conn)
        .await?;

        Ok(Page::new(owners, page, per_page, total))
    }

    /// Books linked to the owner.
    pub async fn books<'e, E>(executor: E, owner_id: i64) -> Result<Vec<Book>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let books = sqlx::query_as::<_, Book>(
            r#"
SELECT b.id, b.name
FROM books b
JOIN owner_books ob ON ob.book_id = b.id
WHERE ob.owner_id = ?
ORDER BY b.id
            "#,
        )
        .bind(owner_id)
        .fetch_all(executor)
        .await?;

        Ok(books)
    }

    /// The owner's book called `name`, if one is linked.
    pub async fn linked_book<'e, E>(
        executor: E,
        owner_id: i64,
        name: &str,
    ) -> Result<Option<Book>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let book = sqlx::query_as::<_, Book>(
            r#"
SELECT b.id, b.name
FROM books b
JOIN owner_books ob ON ob.book_id = b.id
WHERE ob.owner_id = ? AND b.name = ?
ORDER BY b.id
LIMIT 1
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(book)
    }

    pub async fn has_book<'e, E>(executor: E, owner_id: i64, book_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM owner_books WHERE owner_id = ? AND book_id = ?")
                .bind(owner_id)
                .bind(book_id)
                .fetch_optional(executor)
                .await?;

        Ok(found.is_some())
    }

    /// Link a book. Returns `false` when the link already existed.
    pub async fn add_book<'e, E>(executor: E, owner_id: i64, book_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result =
            sqlx::query("INSERT OR IGNORE INTO owner_books (owner_id, book_id) VALUES (?, ?)")
                .bind(owner_id)
                .bind(book_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Unlink a book. Returns `false` when there was no link.
    pub async fn remove_book<'e, E>(
        executor: E,
        owner_id: i64,
        book_id: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM owner_books WHERE owner_id = ? AND book_id = ?")
            .bind(owner_id)
            .bind(book_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_in_memory, BookRepository};

    #[tokio::test]
    async fn slug_is_derived_on_create() {
        let pool = connect_in_memory().await.unwrap();
        let owner = OwnerRepository::create(&pool, "Mark Tven", "American writer")
            .await
            .unwrap();
        assert_eq!(owner.slug, "Mark-Tven");

        let found = OwnerRepository::get_by_slug(&pool, "Mark-Tven").await.unwrap();
        assert_eq!(found, Some(owner));
    }

    #[tokio::test]
    async fn slug_collision_is_a_conflict() {
        let pool = connect_in_memory().await.unwrap();
        OwnerRepository::create(&pool, "Mark Tven", "").await.unwrap();

        let again = OwnerRepository::create(&pool, "Mark, Tven", "").await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn linking_twice_does_not_duplicate() {
        let pool = connect_in_memory().await.unwrap();
        let owner = OwnerRepository::create(&pool, "Mark Tven", "").await.unwrap();
        let book = BookRepository::create(&pool, "Tom Sawyer").await.unwrap();

        assert!(OwnerRepository::add_book(&pool, owner.id, book.id).await.unwrap());
        assert!(!OwnerRepository::add_book(&pool, owner.id, book.id).await.unwrap());
        assert!(OwnerRepository::has_book(&pool, owner.id, book.id).await.unwrap());
        assert_eq!(OwnerRepository::books(&pool, owner.id).await.unwrap(), vec![book.clone()]);

        assert!(OwnerRepository::remove_book(&pool, owner.id, book.id).await.unwrap());
        assert!(!OwnerRepository::remove_book(&pool, owner.id, book.id).await.unwrap());
        assert!(OwnerRepository::books(&pool, owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn linked_book_ignores_namesakes_of_other_owners() {
        let pool = connect_in_memory().await.unwrap();
        let pushkin = OwnerRepository::create(&pool, "Pushkin", "").await.unwrap();
        let lermontov = OwnerRepository::create(&pool, "Lermontov", "").await.unwrap();
        let first = BookRepository::create(&pool, "Poems").await.unwrap();
        let second = BookRepository::create(&pool, "Poems").await.unwrap();
        OwnerRepository::add_book(&pool, pushkin.id, first.id).await.unwrap();
        OwnerRepository::add_book(&pool, lermontov.id, second.id).await.unwrap();

        let found = OwnerRepository::linked_book(&pool, lermontov.id, "Poems").await.unwrap();
        assert_eq!(found, Some(second));
        assert!(OwnerRepository::linked_book(&pool, lermontov.id, "Prose").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_links_and_reports_missing() {
        let pool = connect_in_memory().await.unwrap();
        let owner = OwnerRepository::create(&pool, "Mark Tven", "").await.unwrap();
        let book = BookRepository::create(&pool, "Tom Sawyer").await.unwrap();
        OwnerRepository::add_book(&pool, owner.id, book.id).await.unwrap();

        assert!(OwnerRepository::delete_by_slug(&pool, "Mark-Tven").await.unwrap());
        assert!(OwnerRepository::get_by_slug(&pool, "Mark-Tven").await.unwrap().is_none());
        assert!(BookRepository::owners(&pool, book.id).await.unwrap().is_empty());

        assert!(!OwnerRepository::delete_by_slug(&pool, "Mark-Tven").await.unwrap());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_name_and_body() {
        let pool = connect_in_memory().await.unwrap();
        let tven = OwnerRepository::create(&pool, "Mark Tven", "Wrote about the Mississippi")
            .await
            .unwrap();
        let gogol = OwnerRepository::create(&pool, "Nikolai Gogol", "Dead Souls").await.unwrap();

        assert_eq!(OwnerRepository::search(&pool, "mark").await.unwrap(), vec![tven.clone()]);
        assert_eq!(OwnerRepository::search(&pool, "MISSISSIPPI").await.unwrap(), vec![tven]);
        assert_eq!(OwnerRepository::search(&pool, "souls").await.unwrap(), vec![gogol]);
        assert!(OwnerRepository::search(&pool, "100%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_folds_cyrillic_case() {
        let pool = connect_in_memory().await.unwrap();
        let fyodor = OwnerRepository::create(&pool, "Фёдор Достоевский", "Братья Карамазовы")
            .await
            .unwrap();

        assert_eq!(OwnerRepository::search(&pool, "фёдор").await.unwrap(), vec![fyodor.clone()]);
        assert_eq!(OwnerRepository::search(&pool, "КАРАМАЗОВ").await.unwrap(), vec![fyodor]);
        assert!(OwnerRepository::search(&pool, "толстой").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pages_hold_ten_owners() {
        let pool = connect_in_memory().await.unwrap();
        for i in 0..25 {
            OwnerRepository::create(&pool, &format!("Author {}", i), "").await.unwrap();
        }

        let first = OwnerRepository::page(&pool, 1, 10).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.total, 25);
        assert_eq!(first.pages, 3);
        assert_eq!(first.items[0].name, "Author 24");

        let third = OwnerRepository::page(&pool, 3, 10).await.unwrap();
        assert_eq!(third.items.len(), 5);
        assert!(!third.has_next);
        assert_eq!(third.items[4].name, "Author 0");

        let beyond = OwnerRepository::page(&pool, 4, 10).await.unwrap();
        assert!(beyond.items.is_empty());
    }
}
