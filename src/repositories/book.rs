//! Book repository trait and implementation

use crate::error::{CatalogError, Result};
use crate::models::{Book, BookId, FieldViolation};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::debug;

/// Book repository interface for data access operations
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Find a book by its ID
    ///
    /// # Returns
    /// - `Ok(Some(book))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if a database error occurs
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>>;

    /// Find the first book with the given title
    async fn find_by_title(&self, title: &str) -> Result<Option<Book>>;

    /// List all books ordered by title
    async fn list_all(&self) -> Result<Vec<Book>>;

    /// Insert a new book
    ///
    /// # Errors
    /// Returns `CatalogError::Validation` with every violated field if the
    /// record fails validation; nothing is written in that case.
    async fn insert(&self, book: &Book) -> Result<()>;

    /// Insert several books in one transaction
    ///
    /// Every record is validated before anything is written; if any record
    /// is invalid or any insert fails, no book from the batch is persisted.
    async fn insert_many(&self, books: &[Book]) -> Result<()>;

    /// Update an existing book, re-running full validation
    ///
    /// # Errors
    /// - `CatalogError::Validation` if the record fails validation
    /// - `CatalogError::NotFound` if no book has this id
    async fn update(&self, book: &Book) -> Result<()>;

    /// Set the stock of a book without re-running the full validator set,
    /// returning the updated record
    ///
    /// The stock floor still applies. Returns `Ok(None)` if no book has
    /// this id.
    async fn set_stock(&self, id: &BookId, stock: i64) -> Result<Option<Book>>;

    /// Delete a book by ID
    ///
    /// # Returns
    /// - `Ok(true)` if the book was deleted
    /// - `Ok(false)` if the book was not found
    ///
    /// Library records referencing this book keep their dangling reference;
    /// populate skips it on read.
    async fn delete(&self, id: &BookId) -> Result<bool>;

    /// Count total books
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of BookRepository
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    /// Create a new SqliteBookRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn author_json(book: &Book) -> Result<String> {
    let trimmed: Vec<&str> = book.author.iter().map(|a| a.trim()).collect();
    Ok(serde_json::to_string(&trimmed)?)
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        let book = query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<Book>> {
        let book = query_as::<_, Book>("SELECT * FROM books WHERE title = ? LIMIT 1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    async fn list_all(&self) -> Result<Vec<Book>> {
        let books = query_as::<_, Book>("SELECT * FROM books ORDER BY title ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    async fn insert(&self, book: &Book) -> Result<()> {
        // Validate before insertion, collecting every violation
        book.validate().map_err(CatalogError::Validation)?;

        query("INSERT INTO books (id, title, isbn, stock, author) VALUES (?, ?, ?, ?, ?)")
            .bind(book.id.to_string())
            .bind(book.title.trim())
            .bind(book.isbn.trim())
            .bind(book.stock)
            .bind(author_json(book)?)
            .execute(&self.pool)
            .await?;

        debug!(book_id = %book.id, title = %book.title, "Inserted book");
        Ok(())
    }

    async fn insert_many(&self, books: &[Book]) -> Result<()> {
        // All records must be valid before anything is written
        for book in books {
            book.validate().map_err(CatalogError::Validation)?;
        }

        let mut tx = self.pool.begin().await?;

        for book in books {
            query("INSERT INTO books (id, title, isbn, stock, author) VALUES (?, ?, ?, ?, ?)")
                .bind(book.id.to_string())
                .bind(book.title.trim())
                .bind(book.isbn.trim())
                .bind(book.stock)
                .bind(author_json(book)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(count = books.len(), "Inserted book batch");
        Ok(())
    }

    async fn update(&self, book: &Book) -> Result<()> {
        book.validate().map_err(CatalogError::Validation)?;

        let result = query("UPDATE books SET title = ?, isbn = ?, stock = ?, author = ? WHERE id = ?")
            .bind(book.title.trim())
            .bind(book.isbn.trim())
            .bind(book.stock)
            .bind(author_json(book)?)
            .bind(book.id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound {
                entity_type: "Book".to_string(),
                id: book.id.to_string(),
            });
        }

        Ok(())
    }

    async fn set_stock(&self, id: &BookId, stock: i64) -> Result<Option<Book>> {
        // Conditional update: only the stock rule applies here
        if stock < 1 {
            return Err(CatalogError::Validation(vec![FieldViolation {
                field: "stock".to_string(),
                message: "Stock must be at least 1".to_string(),
            }]));
        }

        let result = query("UPDATE books SET stock = ? WHERE id = ?")
            .bind(stock)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: &BookId) -> Result<bool> {
        let result = query("DELETE FROM books WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM books")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup_repo() -> SqliteBookRepository {
        let pool = create_test_pool().await.unwrap();
        SqliteBookRepository::new(pool)
    }

    fn laskar_pelangi() -> Book {
        Book::new(
            "Laskar Pelangi",
            "979-3062-79-7",
            10,
            vec!["Andrea Hirata".to_string()],
        )
    }

    #[tokio::test]
    async fn test_insert_and_find_book() {
        let repo = setup_repo().await;

        let book = laskar_pelangi();
        repo.insert(&book).await.unwrap();

        let found = repo.find_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(found, book);
    }

    #[tokio::test]
    async fn test_find_by_title() {
        let repo = setup_repo().await;

        let book = laskar_pelangi();
        repo.insert(&book).await.unwrap();

        let found = repo.find_by_title("Laskar Pelangi").await.unwrap();
        assert_eq!(found.unwrap().id, book.id);

        let missing = repo.find_by_title("Lontar Anthology").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_book() {
        let repo = setup_repo().await;

        // 17-character isbn exceeds the 13-character maximum
        let book = Book::new(
            "Jakarta! Jakarta!",
            "978-979-9026-34-2",
            10,
            vec!["Putu Wijaya".to_string()],
        );

        let err = repo.insert(&book).await.unwrap_err();
        assert_eq!(err.violated_fields(), vec!["isbn"]);

        // Nothing was written
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_many() {
        let repo = setup_repo().await;

        let books = vec![
            Book::new(
                "Bumi Manusia",
                "979-97312-7-8",
                15,
                vec!["Pramoedya Ananta".to_string()],
            ),
            Book::new(
                "Negeri 5 Menara",
                "978-979-22-45",
                3,
                vec!["Ahmad Fuadi".to_string()],
            ),
            Book::new(
                "Lontar Anthology",
                "978-602-9144",
                8,
                vec![
                    "Goenawan Mohamad".to_string(),
                    "Seno Gumira Ajidarma".to_string(),
                    "et al".to_string(),
                ],
            ),
        ];

        repo.insert_many(&books).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insert_many_writes_nothing_on_invalid_record() {
        let repo = setup_repo().await;

        let books = vec![
            laskar_pelangi(),
            // Invalid: stock below 1
            Book::new("Saman", "979-655-2410", 0, vec!["Ayu Utami".to_string()]),
        ];

        assert!(repo.insert_many(&books).await.is_err());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_book() {
        let repo = setup_repo().await;

        let mut book = laskar_pelangi();
        repo.insert(&book).await.unwrap();

        book.title = "Sang Pemimpi".to_string();
        book.stock = 4;
        repo.update(&book).await.unwrap();

        let found = repo.find_by_id(&book.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Sang Pemimpi");
        assert_eq!(found.stock, 4);
    }

    #[tokio::test]
    async fn test_update_missing_book_is_not_found() {
        let repo = setup_repo().await;

        let book = laskar_pelangi();
        let err = repo.update(&book).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_set_stock() {
        let repo = setup_repo().await;

        let book = laskar_pelangi();
        repo.insert(&book).await.unwrap();

        let updated = repo.set_stock(&book.id, 6).await.unwrap().unwrap();
        assert_eq!(updated.stock, 6);
        // Other fields untouched
        assert_eq!(updated.title, book.title);
    }

    #[tokio::test]
    async fn test_set_stock_enforces_floor() {
        let repo = setup_repo().await;

        let book = laskar_pelangi();
        repo.insert(&book).await.unwrap();

        let err = repo.set_stock(&book.id, 0).await.unwrap_err();
        assert_eq!(err.violated_fields(), vec!["stock"]);
    }

    #[tokio::test]
    async fn test_set_stock_on_missing_book() {
        let repo = setup_repo().await;

        let result = repo.set_stock(&BookId::new(), 6).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_book() {
        let repo = setup_repo().await;

        let book = laskar_pelangi();
        repo.insert(&book).await.unwrap();

        assert!(repo.delete(&book.id).await.unwrap());
        assert!(repo.find_by_id(&book.id).await.unwrap().is_none());

        // Second delete finds nothing
        assert!(!repo.delete(&book.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_all_ordered_by_title() {
        let repo = setup_repo().await;

        repo.insert(&Book::new(
            "Negeri 5 Menara",
            "978-979-22-45",
            3,
            vec!["Ahmad Fuadi".to_string()],
        ))
        .await
        .unwrap();
        repo.insert(&laskar_pelangi()).await.unwrap();

        let books = repo.list_all().await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Laskar Pelangi");
        assert_eq!(books[1].title, "Negeri 5 Menara");
    }
}
