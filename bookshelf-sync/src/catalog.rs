//! Catalog service: upsert, update, delete, list and subscribe.
//!
//! ```text
//!  upsert ─► validate ─► load_all ─► resolve ─┬─ None ──► append (next id)
//!                                             └─ Some ──► replace in place
//!                                                   │
//!                                      save_all ◄───┘
//!                                         │
//!                                   bus.broadcast
//! ```
//!
//! Mutations and subscription snapshots run under one mutation guard that
//! spans read, decision, write and broadcast. Two overlapping upserts of the
//! same record therefore cannot lose an update, and every subscriber sees
//! events in the order they reached disk. `list` reads without the guard.

use bookshelf_core::{
    current_year, isbn_taken, next_id, resolve, Book, BookInput, BookPage, BookUpdate,
    IdentityConflict, IdsExhausted, ListQuery, ValidationError,
};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::broadcast::{BusStats, NotificationBus, Subscription};
use crate::protocol::{CatalogEvent, ProtocolError};
use crate::storage::{BookStore, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] IdentityConflict),
    #[error("Conflict: ISBN {isbn} already belongs to book {owner}")]
    IsbnTaken { isbn: String, owner: u64 },
    #[error("Book not found")]
    NotFound(u64),
    #[error(transparent)]
    IdsExhausted(#[from] IdsExhausted),
    #[error("Failed to save data")]
    Persist(#[from] StoreError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl CatalogError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            CatalogError::Validation(_) => 422,
            CatalogError::Conflict(_) => 400,
            CatalogError::IsbnTaken { .. } => 400,
            CatalogError::NotFound(_) => 404,
            CatalogError::IdsExhausted(_) => 500,
            CatalogError::Persist(_) => 500,
            CatalogError::Protocol(_) => 500,
        }
    }
}

/// Which branch an upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub book: Book,
    pub action: UpsertAction,
}

pub struct Catalog {
    store: BookStore,
    bus: NotificationBus,
    mutation_guard: Mutex<()>,
    /// Upper bound for publication_year
    year_source: fn() -> i32,
}

impl Catalog {
    pub fn new(store: BookStore, bus: NotificationBus) -> Self {
        Self {
            store,
            bus,
            mutation_guard: Mutex::new(()),
            year_source: current_year,
        }
    }

    /// Replace the clock used for the publication year bound.
    pub fn with_year_source(mut self, year_source: fn() -> i32) -> Self {
        self.year_source = year_source;
        self
    }

    pub fn store(&self) -> &BookStore {
        &self.store
    }

    /// Create a new record, or update the one the candidate resolves to.
    pub async fn upsert(&self, input: BookInput) -> Result<Upserted, CatalogError> {
        let candidate = input.validate((self.year_source)())?;

        let _guard = self.mutation_guard.lock().await;
        let mut books = self.store.load_all().await;
        let matched = resolve(&candidate, &books)?.map(|(index, _)| index);

        let (book, action) = match matched {
            Some(index) => {
                books[index].replace_fields(candidate);
                (books[index].clone(), UpsertAction::Updated)
            }
            None => {
                let book = Book::from_new(next_id(&books)?, candidate);
                books.push(book.clone());
                (book, UpsertAction::Created)
            }
        };

        self.store.save_all(&books).await?;

        let event = match action {
            UpsertAction::Created => CatalogEvent::Created { book: book.clone() },
            UpsertAction::Updated => CatalogEvent::Updated { book: book.clone() },
        };
        self.notify(&event).await;
        log::info!("Book {} {}", book.id, event.action());

        Ok(Upserted { book, action })
    }

    /// Patch the record with `id`. The resulting ISBN may not belong to a
    /// different record.
    pub async fn update(&self, id: u64, update: BookUpdate) -> Result<Book, CatalogError> {
        let patch = update.validate((self.year_source)())?;

        let _guard = self.mutation_guard.lock().await;
        let mut books = self.store.load_all().await;
        let index = books
            .iter()
            .position(|b| b.id == id)
            .ok_or(CatalogError::NotFound(id))?;

        let mut book = books[index].clone();
        book.apply(patch);
        if let Some(other) = isbn_taken(&book.isbn, id, &books) {
            return Err(CatalogError::IsbnTaken {
                isbn: book.isbn,
                owner: other.id,
            });
        }
        books[index] = book.clone();

        self.store.save_all(&books).await?;
        self.notify(&CatalogEvent::Updated { book: book.clone() }).await;
        log::info!("Book {id} updated");
        Ok(book)
    }

    /// Remove the record with `id`, returning it.
    pub async fn delete(&self, id: u64) -> Result<Book, CatalogError> {
        let _guard = self.mutation_guard.lock().await;
        let mut books = self.store.load_all().await;
        let index = books
            .iter()
            .position(|b| b.id == id)
            .ok_or(CatalogError::NotFound(id))?;

        let book = books.remove(index);
        self.store.save_all(&books).await?;
        self.notify(&CatalogEvent::Deleted { book: book.clone() }).await;
        log::info!("Book {id} deleted");
        Ok(book)
    }

    /// Fan out a committed change. The write already reached disk, so a
    /// failure here is logged and does not fail the mutation.
    async fn notify(&self, event: &CatalogEvent) {
        if let Err(e) = self.bus.broadcast(event).await {
            log::error!("Failed to broadcast {}: {e}", event.action());
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<BookPage, CatalogError> {
        query.validate()?;
        let books = self.store.load_all().await;
        Ok(query.apply(books)?)
    }

    /// Register a subscriber whose first frame is the current collection.
    pub async fn subscribe(&self) -> Result<Subscription, CatalogError> {
        let _guard = self.mutation_guard.lock().await;
        let books = self.store.load_all().await;
        let count = books.len();
        let subscription = self.bus.register(&CatalogEvent::InitialLoad { books }).await?;
        log::info!("Subscriber {} joined with {count} books", subscription.id());
        Ok(subscription)
    }

    pub async fn unsubscribe(&self, id: &Uuid) -> bool {
        self.bus.unregister(id).await
    }

    pub async fn bus_stats(&self) -> BusStats {
        self.bus.stats().await
    }
}
