//! Library repository trait and implementation
//!
//! Uniqueness of a library's email and phone number is enforced twice: an
//! explicit pre-write existence check gives callers a clean conflict error,
//! and the unique indexes on the `libraries` table act as the storage-layer
//! backstop for the window between check and write. True atomicity of that
//! window rests on SQLite enforcing the index inside the write transaction.

use crate::error::{CatalogError, Result};
use crate::models::{Book, BookId, Library, LibraryId};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::debug;

/// Library repository interface for data access operations
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Find a library by its ID
    ///
    /// # Returns
    /// - `Ok(Some(library))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if a database error occurs
    async fn find_by_id(&self, id: &LibraryId) -> Result<Option<Library>>;

    /// Find the first library with the given name
    async fn find_by_name(&self, name: &str) -> Result<Option<Library>>;

    /// List all libraries ordered by name
    async fn list_all(&self) -> Result<Vec<Library>>;

    /// Insert a new library
    ///
    /// # Errors
    /// - `CatalogError::Validation` if the record fails validation
    /// - `CatalogError::UniqueConflict` if the email or phone number is
    ///   already claimed by another library
    async fn insert(&self, library: &Library) -> Result<()>;

    /// Update an existing library, re-running full validation
    ///
    /// # Errors
    /// - `CatalogError::Validation` if the record fails validation
    /// - `CatalogError::UniqueConflict` if the email or phone number is
    ///   claimed by a different library
    /// - `CatalogError::NotFound` if no library has this id
    async fn update(&self, library: &Library) -> Result<()>;

    /// Append a book reference to a library's `books` list
    ///
    /// This is the library side of the two-step link (persist the book,
    /// then attach it); the two steps are not atomic. The book's existence
    /// is not checked, so a reference may dangle.
    ///
    /// # Errors
    /// `CatalogError::NotFound` if no library has this id.
    async fn attach_book(&self, id: &LibraryId, book_id: &BookId) -> Result<()>;

    /// Dereference a library's book list into full book records
    ///
    /// Performs one lookup per reference, preserving list order, and
    /// silently omits references whose book no longer exists.
    ///
    /// # Errors
    /// `CatalogError::NotFound` if no library has this id.
    async fn populate_books(&self, id: &LibraryId) -> Result<Vec<Book>>;

    /// Delete a library by ID
    ///
    /// # Returns
    /// - `Ok(true)` if the library was deleted
    /// - `Ok(false)` if the library was not found
    ///
    /// Referenced books are left in place (no cascading delete).
    async fn delete(&self, id: &LibraryId) -> Result<bool>;

    /// Count total libraries
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of LibraryRepository
pub struct SqliteLibraryRepository {
    pool: SqlitePool,
}

impl SqliteLibraryRepository {
    /// Create a new SqliteLibraryRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Pre-write existence check for a contact field, excluding the record
    /// being written so updates don't conflict with themselves
    async fn email_claimed(&self, email: &str, exclude: &LibraryId) -> Result<bool> {
        let count: i64 =
            query_as("SELECT COUNT(*) as count FROM libraries WHERE email = ? AND id != ?")
                .bind(email)
                .bind(exclude.to_string())
                .fetch_one(&self.pool)
                .await
                .map(|row: (i64,)| row.0)?;

        Ok(count > 0)
    }

    async fn phone_claimed(&self, phone_number: &str, exclude: &LibraryId) -> Result<bool> {
        let count: i64 =
            query_as("SELECT COUNT(*) as count FROM libraries WHERE phone_number = ? AND id != ?")
                .bind(phone_number)
                .bind(exclude.to_string())
                .fetch_one(&self.pool)
                .await
                .map(|row: (i64,)| row.0)?;

        Ok(count > 0)
    }

    async fn check_contact_claims(&self, library: &Library) -> Result<()> {
        if self.email_claimed(library.email.trim(), &library.id).await? {
            return Err(CatalogError::UniqueConflict {
                field: "email".to_string(),
            });
        }
        if self
            .phone_claimed(library.phone_number.trim(), &library.id)
            .await?
        {
            return Err(CatalogError::UniqueConflict {
                field: "phone number".to_string(),
            });
        }
        Ok(())
    }
}

/// Map a unique-index rejection to a conflict error; anything else passes
/// through as a database error
fn map_unique_violation(err: sqlx::Error) -> CatalogError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if message.contains("libraries.email") {
                return CatalogError::UniqueConflict {
                    field: "email".to_string(),
                };
            }
            if message.contains("libraries.phone_number") {
                return CatalogError::UniqueConflict {
                    field: "phone number".to_string(),
                };
            }
        }
    }
    CatalogError::Database(err)
}

#[async_trait]
impl LibraryRepository for SqliteLibraryRepository {
    async fn find_by_id(&self, id: &LibraryId) -> Result<Option<Library>> {
        let library = query_as::<_, Library>("SELECT * FROM libraries WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(library)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Library>> {
        let library = query_as::<_, Library>("SELECT * FROM libraries WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(library)
    }

    async fn list_all(&self) -> Result<Vec<Library>> {
        let libraries = query_as::<_, Library>("SELECT * FROM libraries ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(libraries)
    }

    async fn insert(&self, library: &Library) -> Result<()> {
        // Validate before insertion, collecting every violation
        library.validate().map_err(CatalogError::Validation)?;

        self.check_contact_claims(library).await?;

        query(
            r#"
            INSERT INTO libraries (id, name, address, email, phone_number, books)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(library.id.to_string())
        .bind(library.name.trim())
        .bind(library.address.trim())
        .bind(library.email.trim())
        .bind(library.phone_number.trim())
        .bind(serde_json::to_string(&library.books)?)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        debug!(library_id = %library.id, name = %library.name, "Inserted library");
        Ok(())
    }

    async fn update(&self, library: &Library) -> Result<()> {
        library.validate().map_err(CatalogError::Validation)?;

        self.check_contact_claims(library).await?;

        let result = query(
            r#"
            UPDATE libraries
            SET name = ?, address = ?, email = ?, phone_number = ?, books = ?
            WHERE id = ?
            "#,
        )
        .bind(library.name.trim())
        .bind(library.address.trim())
        .bind(library.email.trim())
        .bind(library.phone_number.trim())
        .bind(serde_json::to_string(&library.books)?)
        .bind(library.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound {
                entity_type: "Library".to_string(),
                id: library.id.to_string(),
            });
        }

        Ok(())
    }

    async fn attach_book(&self, id: &LibraryId, book_id: &BookId) -> Result<()> {
        let row: Option<(String,)> = query_as("SELECT books FROM libraries WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some((books_json,)) = row else {
            return Err(CatalogError::NotFound {
                entity_type: "Library".to_string(),
                id: id.to_string(),
            });
        };

        let mut books: Vec<BookId> = serde_json::from_str(&books_json)?;
        books.push(*book_id);

        query("UPDATE libraries SET books = ? WHERE id = ?")
            .bind(serde_json::to_string(&books)?)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        debug!(library_id = %id, book_id = %book_id, "Attached book to library");
        Ok(())
    }

    async fn populate_books(&self, id: &LibraryId) -> Result<Vec<Book>> {
        let library = self.find_by_id(id).await?.ok_or_else(|| CatalogError::NotFound {
            entity_type: "Library".to_string(),
            id: id.to_string(),
        })?;

        let mut books = Vec::with_capacity(library.books.len());
        for book_id in &library.books {
            let found = query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
                .bind(book_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

            // Dangling references are skipped, not an error
            if let Some(book) = found {
                books.push(book);
            }
        }

        Ok(books)
    }

    async fn delete(&self, id: &LibraryId) -> Result<bool> {
        let result = query("DELETE FROM libraries WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM libraries")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }
}
