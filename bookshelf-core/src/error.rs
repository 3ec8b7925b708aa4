use thiserror::Error;

/// Malformed or out-of-range client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("publication_year {year} must be between {min} and {max}")]
    PublicationYear { year: i32, min: i32, max: i32 },
    #[error("ISBN must be 10 or 13 characters, got {len}")]
    IsbnLength { len: usize },
    #[error("page must be at least 1, got {0}")]
    Page(u32),
    #[error("limit must be between 1 and {max}, got {limit}")]
    Limit { limit: u32, max: u32 },
}

/// The ISBN and the (title, author, publication_year) triple point at two
/// different records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Conflict: ISBN matches one book, but title/author/year matches a different book")]
pub struct IdentityConflict {
    /// Id of the record whose ISBN matched.
    pub isbn_match: u64,
    /// Id of the record whose natural key matched.
    pub natural_key_match: u64,
}

/// Every id up to `u64::MAX` is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No book id left after {max}")]
pub struct IdsExhausted {
    pub max: u64,
}
