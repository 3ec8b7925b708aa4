//! Identity resolution for upserts.
//!
//! A candidate can be recognized by its ISBN or by its natural key
//! (title, author, publication_year). Both are checked in a single pass;
//! the last occurrence of each wins when the collection holds duplicates.
//! If the two keys land on different records the candidate is ambiguous.

use crate::book::{Book, NewBook};
use crate::error::{IdentityConflict, IdsExhausted};

/// Result of a successful resolution: the position and record the candidate
/// refers to, or `None` for a brand new record.
pub type Resolution<'a> = Option<(usize, &'a Book)>;

pub fn resolve<'a>(
    candidate: &NewBook,
    books: &'a [Book],
) -> Result<Resolution<'a>, IdentityConflict> {
    let mut isbn_match: Option<(usize, &Book)> = None;
    let mut natural_key_match: Option<(usize, &Book)> = None;

    for (index, book) in books.iter().enumerate() {
        if book.isbn == candidate.isbn {
            isbn_match = Some((index, book));
        }
        if book.title == candidate.title
            && book.author == candidate.author
            && book.publication_year == candidate.publication_year
        {
            natural_key_match = Some((index, book));
        }
    }

    match (isbn_match, natural_key_match) {
        (Some((i, by_isbn)), Some((j, by_key))) if i != j => {
            log::debug!(
                "Identity conflict: isbn {} -> book {}, natural key -> book {}",
                candidate.isbn,
                by_isbn.id,
                by_key.id
            );
            Err(IdentityConflict {
                isbn_match: by_isbn.id,
                natural_key_match: by_key.id,
            })
        }
        (Some(found), _) | (None, Some(found)) => Ok(Some(found)),
        (None, None) => Ok(None),
    }
}

/// Find a record other than `exclude_id` that already holds `isbn`.
pub fn isbn_taken<'a>(isbn: &str, exclude_id: u64, books: &'a [Book]) -> Option<&'a Book> {
    books.iter().find(|b| b.isbn == isbn && b.id != exclude_id)
}

/// Next store-assigned id: one past the current maximum, or 1 when empty.
pub fn next_id(books: &[Book]) -> Result<u64, IdsExhausted> {
    match books.iter().map(|b| b.id).max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or(IdsExhausted { max }),
    }
}
