//! # Catalog Data-Access Core
//!
//! Owns the catalog database (books and the libraries that hold them) and
//! provides repository patterns for data access.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite database schema and migrations
//! - Field-level validation for both record types, collecting every
//!   violation before any write
//! - Repository patterns for books and libraries
//! - Uniqueness enforcement for library contact details (pre-write check
//!   plus unique indexes as the storage-layer backstop)
//! - Reference dereferencing: a library's book list can be populated into
//!   full records, skipping references whose book has been deleted
//!
//! The link between a book and a library is a one-directional reference
//! list and is deliberately not transactional: a failure between "persist
//! the book" and "attach it to the library" leaves an orphaned book, never
//! a corrupted library.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{CatalogError, Result};
pub use models::{Book, BookId, FieldViolation, Library, LibraryId};
pub use repositories::{
    BookRepository, LibraryRepository, SqliteBookRepository, SqliteLibraryRepository,
};
