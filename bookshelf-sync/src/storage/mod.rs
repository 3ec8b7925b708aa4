//! Persistent storage for the book catalog.
//!
//! ```text
//! ┌─────────────┐   load_all / save_all   ┌──────────────┐
//! │   Catalog   │ ──────────────────────► │  BookStore   │
//! │ (upserts)   │                         │ (JSON file)  │
//! └─────────────┘                         └──────┬───────┘
//!                                                │ write tmp + rename
//!                                                ▼
//!                                         books.json
//! ```

pub mod json;

pub use json::{BookStore, StoreError};
