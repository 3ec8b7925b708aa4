//! Change-notification wire format.
//!
//! Events are JSON objects tagged by `action`:
//! ```text
//! {"action": "initial_load", "books": [ {...}, ... ]}
//! {"action": "created",      "book":  {...}}
//! {"action": "updated",      "book":  {...}}
//! {"action": "deleted",      "book":  {...}}
//! ```
//! An event is encoded once and the same frame is shared by every subscriber.

use std::sync::Arc;

use bookshelf_core::Book;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Encoded event frame, shared across subscriber queues.
pub type Frame = Arc<str>;

/// Event pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// Full snapshot, sent once to a newly registered subscriber.
    InitialLoad { books: Vec<Book> },
    Created { book: Book },
    Updated { book: Book },
    Deleted { book: Book },
}

impl CatalogEvent {
    pub fn action(&self) -> &'static str {
        match self {
            CatalogEvent::InitialLoad { .. } => "initial_load",
            CatalogEvent::Created { .. } => "created",
            CatalogEvent::Updated { .. } => "updated",
            CatalogEvent::Deleted { .. } => "deleted",
        }
    }

    pub fn encode(&self) -> Result<Frame, ProtocolError> {
        let text = serde_json::to_string(self).map_err(ProtocolError::Encode)?;
        Ok(Arc::from(text))
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode event: {0}")]
    Decode(#[source] serde_json::Error),
}
