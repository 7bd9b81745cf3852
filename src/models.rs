//! Domain models for the catalog
//!
//! This module contains the two record types (books and libraries), their
//! identifier newtypes, and the validators that gate every write. Validators
//! collect every violation at once rather than stopping at the first, so a
//! caller can fix a whole record in one round trip.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(pub Uuid);

impl BookId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryId(pub Uuid);

impl LibraryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for LibraryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field the rule applies to; list elements are keyed `field.N`
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl FieldViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.-]+@([\w-]+\.)+[\w-]{2,4}$").unwrap());

// +62 or 0 followed by a non-leading-zero area digit, 9 to 13 digits total
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+62|0)[2-9][0-9]{7,11}$").unwrap());

// =============================================================================
// Domain Models
// =============================================================================

/// Catalog item held in stock by libraries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: BookId,
    /// Book title
    pub title: String,
    /// ISBN, hyphens included
    pub isbn: String,
    /// Copies in stock; the integer type is what keeps fractional
    /// values out, a JSON `stock` of 2.5 fails deserialization
    pub stock: i64,
    /// Author names, in credit order; may be empty
    pub author: Vec<String>,
}

impl Book {
    /// Create a new book with a fresh id. String inputs are trimmed.
    pub fn new(
        title: impl Into<String>,
        isbn: impl Into<String>,
        stock: i64,
        author: Vec<String>,
    ) -> Self {
        Self {
            id: BookId::new(),
            title: title.into().trim().to_string(),
            isbn: isbn.into().trim().to_string(),
            stock,
            author: author.into_iter().map(|a| a.trim().to_string()).collect(),
        }
    }

    /// Validate book data, collecting every violation.
    ///
    /// An empty `author` list passes: only the elements carry rules, the
    /// list itself has no minimum length.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();

        let title = self.title.trim();
        if title.is_empty() {
            violations.push(FieldViolation::new("title", "Title is required"));
        } else if title.chars().count() > 25 {
            violations.push(FieldViolation::new(
                "title",
                "Title cannot exceed 25 characters",
            ));
        }

        let isbn = self.isbn.trim();
        if isbn.is_empty() {
            violations.push(FieldViolation::new("isbn", "Isbn is required"));
        } else {
            let len = isbn.chars().count();
            if len < 10 {
                violations.push(FieldViolation::new(
                    "isbn",
                    "Isbn must be at least 10 characters",
                ));
            } else if len > 13 {
                violations.push(FieldViolation::new(
                    "isbn",
                    "Isbn cannot exceed 13 characters",
                ));
            }
        }

        if self.stock < 1 {
            violations.push(FieldViolation::new("stock", "Stock must be at least 1"));
        }

        for (i, author) in self.author.iter().enumerate() {
            let author = author.trim();
            if author.is_empty() {
                violations.push(FieldViolation::new(
                    format!("author.{i}"),
                    "Author is required",
                ));
            } else if author.chars().count() > 20 {
                violations.push(FieldViolation::new(
                    format!("author.{i}"),
                    "Author cannot exceed 20 characters",
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl FromRow<'_, SqliteRow> for Book {
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let id_str: String = row.try_get("id")?;
        let id = BookId::from_string(&id_str).map_err(|e| sqlx::Error::ColumnDecode {
            index: "id".into(),
            source: Box::new(e),
        })?;

        let author_json: String = row.try_get("author")?;
        let author: Vec<String> =
            serde_json::from_str(&author_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "author".into(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id,
            title: row.try_get("title")?,
            isbn: row.try_get("isbn")?,
            stock: row.try_get("stock")?,
            author,
        })
    }
}

/// Organization holding references to the books it stocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Unique identifier
    #[serde(rename = "_id")]
    pub id: LibraryId,
    /// Library name
    pub name: String,
    /// Street address
    pub address: String,
    /// Contact email, unique across all libraries
    pub email: String,
    /// Indonesian phone number, unique across all libraries
    #[serde(rename = "phoneNumber")]
    pub phone_number: String,
    /// References to books held by this library. Not a foreign key:
    /// entries may dangle after a book is deleted.
    pub books: Vec<BookId>,
}

impl Library {
    /// Create a new library with a fresh id and no book references.
    /// String inputs are trimmed.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        email: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            id: LibraryId::new(),
            name: name.into().trim().to_string(),
            address: address.into().trim().to_string(),
            email: email.into().trim().to_string(),
            phone_number: phone_number.into().trim().to_string(),
            books: Vec::new(),
        }
    }

    /// Validate library data, collecting every violation.
    ///
    /// Uniqueness of email and phone number is a storage concern and is
    /// checked by the repository at write time, not here.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            violations.push(FieldViolation::new("name", "Library name is required"));
        } else if name.chars().count() > 50 {
            violations.push(FieldViolation::new(
                "name",
                "Library name cannot exceed 50 characters",
            ));
        }

        let address = self.address.trim();
        if address.is_empty() {
            violations.push(FieldViolation::new("address", "Address is required"));
        } else if address.chars().count() > 100 {
            violations.push(FieldViolation::new(
                "address",
                "Address cannot exceed 100 characters",
            ));
        }

        let email = self.email.trim();
        if email.is_empty() {
            violations.push(FieldViolation::new("email", "Email is required"));
        } else if !EMAIL_PATTERN.is_match(email) {
            violations.push(FieldViolation::new(
                "email",
                "Please enter a valid email address",
            ));
        }

        let phone = self.phone_number.trim();
        if phone.is_empty() {
            violations.push(FieldViolation::new(
                "phoneNumber",
                "Phone number is required",
            ));
        } else if !PHONE_PATTERN.is_match(phone) {
            violations.push(FieldViolation::new(
                "phoneNumber",
                "Please enter a valid Indonesian phone number",
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl FromRow<'_, SqliteRow> for Library {
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let id_str: String = row.try_get("id")?;
        let id = LibraryId::from_string(&id_str).map_err(|e| sqlx::Error::ColumnDecode {
            index: "id".into(),
            source: Box::new(e),
        })?;

        let books_json: String = row.try_get("books")?;
        let books: Vec<BookId> =
            serde_json::from_str(&books_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "books".into(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            email: row.try_get("email")?,
            phone_number: row.try_get("phone_number")?,
            books,
        })
    }
}
