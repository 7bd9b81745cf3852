//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for the two record types.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//! - Validation runs in full before any write; a record that fails
//!   validation is never partially persisted
//!
//! ## Available Repositories
//!
//! - `BookRepository` - Catalog items with stock tracking
//! - `LibraryRepository` - Organizations with unique contact details and
//!   book references, including populate (reference dereferencing)

pub mod book;
pub mod library;

pub use book::{BookRepository, SqliteBookRepository};
pub use library::{LibraryRepository, SqliteLibraryRepository};
