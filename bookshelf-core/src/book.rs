//! Book records and the payloads that create or modify them.
//!
//! Incoming payloads (`BookInput`, `BookUpdate`) are unvalidated. They are
//! turned into `NewBook` / validated patches through `validate`, which
//! enforces the publication year window and normalizes the ISBN.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Earliest accepted publication year (movable type).
pub const MIN_PUBLICATION_YEAR: i32 = 1450;

/// Accepted ISBN lengths after normalization (ISBN-10 and ISBN-13).
pub const ISBN_LENGTHS: [usize; 2] = [10, 13];

/// Current calendar year in UTC, the upper bound for `publication_year`.
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// A persisted catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub genre: String,
    pub isbn: String,
}

impl Book {
    /// Attach a store-assigned id to validated fields.
    pub fn from_new(id: u64, new: NewBook) -> Self {
        Self {
            id,
            title: new.title,
            author: new.author,
            publication_year: new.publication_year,
            genre: new.genre,
            isbn: new.isbn,
        }
    }

    /// Overwrite every field except `id`.
    pub fn replace_fields(&mut self, new: NewBook) {
        self.title = new.title;
        self.author = new.author;
        self.publication_year = new.publication_year;
        self.genre = new.genre;
        self.isbn = new.isbn;
    }

    /// Apply the fields present in a validated patch.
    pub fn apply(&mut self, patch: BookPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(year) = patch.publication_year {
            self.publication_year = year;
        }
        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(isbn) = patch.isbn {
            self.isbn = isbn;
        }
    }
}

/// Create payload as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub genre: String,
    pub isbn: String,
}

impl BookInput {
    /// Validate against the year window ending at `current_year` and
    /// normalize the ISBN.
    pub fn validate(self, current_year: i32) -> Result<NewBook, ValidationError> {
        check_year(self.publication_year, current_year)?;
        let isbn = normalize_isbn(&self.isbn)?;
        Ok(NewBook {
            title: self.title,
            author: self.author,
            publication_year: self.publication_year,
            genre: self.genre,
            isbn,
        })
    }
}

/// Validated record fields without an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub genre: String,
    pub isbn: String,
}

/// Partial update payload. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
}

impl BookUpdate {
    pub fn validate(self, current_year: i32) -> Result<BookPatch, ValidationError> {
        if let Some(year) = self.publication_year {
            check_year(year, current_year)?;
        }
        let isbn = self.isbn.as_deref().map(normalize_isbn).transpose()?;
        Ok(BookPatch {
            title: self.title,
            author: self.author,
            publication_year: self.publication_year,
            genre: self.genre,
            isbn,
        })
    }
}

/// Validated partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub isbn: Option<String>,
}

/// Strip hyphens and spaces; the result must be 10 or 13 characters long.
pub fn normalize_isbn(raw: &str) -> Result<String, ValidationError> {
    let cleaned: String = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();
    let len = cleaned.chars().count();
    if ISBN_LENGTHS.contains(&len) {
        Ok(cleaned)
    } else {
        Err(ValidationError::IsbnLength { len })
    }
}

fn check_year(year: i32, current_year: i32) -> Result<(), ValidationError> {
    if (MIN_PUBLICATION_YEAR..=current_year).contains(&year) {
        Ok(())
    } else {
        Err(ValidationError::PublicationYear {
            year,
            min: MIN_PUBLICATION_YEAR,
            max: current_year,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(year: i32, isbn: &str) -> BookInput {
        BookInput {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            publication_year: year,
            genre: "Science Fiction".into(),
            isbn: isbn.into(),
        }
    }

    #[test]
    fn test_isbn_hyphens_and_spaces_stripped() {
        assert_eq!(normalize_isbn("0-441-17271-7").unwrap(), "0441172717");
        assert_eq!(normalize_isbn("978 0 441 17271 9").unwrap(), "9780441172719");
    }

    #[test]
    fn test_isbn_wrong_length_rejected() {
        assert_eq!(
            normalize_isbn("12345").unwrap_err(),
            ValidationError::IsbnLength { len: 5 }
        );
        assert!(normalize_isbn("123456789012").is_err());
    }

    #[test]
    fn test_year_bounds_inclusive() {
        assert!(input(1450, "1234567890").validate(2026).is_ok());
        assert!(input(2026, "1234567890").validate(2026).is_ok());
        assert!(input(1449, "1234567890").validate(2026).is_err());
        assert!(matches!(
            input(2030, "1234567890").validate(2026),
            Err(ValidationError::PublicationYear { year: 2030, .. })
        ));
    }

    #[test]
    fn test_validate_normalizes_isbn() {
        let new = input(1965, "0-441-17271-7").validate(2026).unwrap();
        assert_eq!(new.isbn, "0441172717");
        assert_eq!(new.title, "Dune");
    }

    #[test]
    fn test_replace_fields_keeps_id() {
        let mut book = Book::from_new(7, input(1965, "0441172717").validate(2026).unwrap());
        let mut other = input(1966, "9780441172719");
        other.title = "Dune Messiah".into();
        book.replace_fields(other.validate(2026).unwrap());
        assert_eq!(book.id, 7);
        assert_eq!(book.title, "Dune Messiah");
        assert_eq!(book.isbn, "9780441172719");
    }

    #[test]
    fn test_update_applies_present_fields_only() {
        let mut book = Book::from_new(3, input(1965, "0441172717").validate(2026).unwrap());
        let patch = BookUpdate {
            genre: Some("Classic".into()),
            isbn: Some("978-0-441-17271-9".into()),
            ..BookUpdate::default()
        }
        .validate(2026)
        .unwrap();
        book.apply(patch);
        assert_eq!(book.genre, "Classic");
        assert_eq!(book.isbn, "9780441172719");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.publication_year, 1965);
    }

    #[test]
    fn test_update_validates_present_fields() {
        let bad_year = BookUpdate {
            publication_year: Some(1200),
            ..BookUpdate::default()
        };
        assert!(bad_year.validate(2026).is_err());
        assert!(BookUpdate::default().validate(2026).is_ok());
    }

    #[test]
    fn test_book_wire_field_names() {
        let book = Book::from_new(1, input(1965, "0441172717").validate(2026).unwrap());
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["publication_year"], 1965);
        assert_eq!(json["id"], 1);
        assert!(json.get("publicationYear").is_none());
    }
}
