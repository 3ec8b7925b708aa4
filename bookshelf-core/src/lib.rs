//! # bookshelf-core: catalog model and identity rules
//!
//! Synchronous building blocks shared by the sync server:
//!
//! - [`book`]: `Book` records, create/update payloads, ISBN normalization
//! - [`resolver`]: upsert identity resolution (ISBN vs. natural key)
//! - [`listing`]: filter / sort / paginate over a collection snapshot
//! - [`error`]: validation and conflict errors

pub mod book;
pub mod error;
pub mod listing;
pub mod resolver;

pub use book::{
    current_year, normalize_isbn, Book, BookInput, BookPatch, BookUpdate, NewBook,
    MIN_PUBLICATION_YEAR,
};
pub use error::{IdentityConflict, IdsExhausted, ValidationError};
pub use listing::{BookPage, ListQuery, SortKey, MAX_LIMIT};
pub use resolver::{isbn_taken, next_id, resolve};
