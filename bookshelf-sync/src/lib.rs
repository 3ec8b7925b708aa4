//! # bookshelf-sync: live book catalog server
//!
//! Serves the catalog over HTTP and pushes every change to WebSocket
//! subscribers.
//!
//! ## Architecture
//!
//! ```text
//!  HTTP client                         WebSocket client
//!      │ POST/PUT/DELETE /books              ▲  initial_load, created,
//!      ▼                                     │  updated, deleted
//! ┌─────────────┐   broadcast   ┌────────────┴────┐
//! │   Catalog   │ ────────────► │ NotificationBus │
//! │  (upserts)  │               │   (fan-out)     │
//! └──────┬──────┘               └─────────────────┘
//!        │ load_all / save_all
//!        ▼
//! ┌─────────────┐
//! │  BookStore  │  books.json
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`]: JSON change events (`CatalogEvent`)
//! - [`broadcast`]: subscriber registry and fan-out
//! - [`storage`]: single-document JSON store
//! - [`catalog`]: upsert engine, update, delete, listing
//! - [`server`]: axum routes and WebSocket feed

pub mod broadcast;
pub mod catalog;
pub mod protocol;
pub mod server;
pub mod storage;

pub use broadcast::{BusStats, NotificationBus, Subscription};
pub use catalog::{Catalog, CatalogError, UpsertAction, Upserted};
pub use protocol::{CatalogEvent, Frame, ProtocolError};
pub use server::{router, ApiError, BookServer, ServerConfig};
pub use storage::{BookStore, StoreError};
