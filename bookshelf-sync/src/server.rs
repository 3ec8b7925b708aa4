//! HTTP + WebSocket front end for the catalog.
//!
//! Routes:
//! ```text
//! GET    /books        ── list (page, limit, sort_by, genre, author)
//! POST   /books        ── upsert by ISBN or (title, author, year)
//! PUT    /books/:id    ── partial update
//! DELETE /books/:id    ── delete
//! GET    /health       ── liveness + bus stats
//! GET    /ws           ── change feed (initial_load, then created/updated/deleted)
//! ```
//!
//! Errors are returned as `{"detail": "..."}` with the status from
//! `CatalogError::status_code`. Every route accepts cross-origin requests
//! from any origin.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use bookshelf_core::{Book, BookInput, BookPage, BookUpdate, ListQuery};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::broadcast::NotificationBus;
use crate::catalog::{Catalog, CatalogError};
use crate::storage::{BookStore, StoreError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: String,
    /// JSON document holding the collection
    pub data_file: PathBuf,
    /// Frames buffered per WebSocket subscriber before it is dropped
    pub subscriber_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            data_file: PathBuf::from("books.json"),
            subscriber_capacity: 256,
        }
    }
}

impl ServerConfig {
    /// Config for tests: ephemeral port, caller-owned data file.
    pub fn for_testing(data_file: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            data_file: data_file.into(),
            subscriber_capacity: 64,
        }
    }

    /// Defaults overlaid with `BOOKSHELF_BIND_ADDR`, `BOOKSHELF_DATA_FILE`
    /// and `BOOKSHELF_SUBSCRIBER_CAPACITY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(addr) = lookup("BOOKSHELF_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(path) = lookup("BOOKSHELF_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup("BOOKSHELF_SUBSCRIBER_CAPACITY") {
            match raw.parse() {
                Ok(capacity) => config.subscriber_capacity = capacity,
                Err(e) => log::warn!(
                    "Ignoring BOOKSHELF_SUBSCRIBER_CAPACITY={raw}: {e}, using {}",
                    config.subscriber_capacity
                ),
            }
        }
        config
    }
}

/// Error body returned by every route.
#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogError),
    /// Request could not be extracted (bad JSON, query or path).
    Rejected { status: StatusCode, detail: String },
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Catalog(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
            ApiError::Rejected { status, detail } => (status, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// The catalog server.
pub struct BookServer {
    config: ServerConfig,
    catalog: Arc<Catalog>,
}

impl BookServer {
    /// Create a server, creating the data file's directory if needed.
    pub async fn new(config: ServerConfig) -> Result<Self, StoreError> {
        let store = BookStore::open(&config.data_file).await?;
        let bus = NotificationBus::new(config.subscriber_capacity);
        Ok(Self {
            config,
            catalog: Arc::new(Catalog::new(store, bus)),
        })
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    pub fn router(&self) -> Router {
        router(self.catalog.clone())
    }

    /// Bind `bind_addr` and serve until the listener fails.
    pub async fn run(self) -> io::Result<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let addr = listener.local_addr()?;
        log::info!(
            "Book server listening on {addr} (data file {})",
            self.config.data_file.display()
        );
        axum::serve(listener, self.router()).await
    }
}

/// Build the axum `Router` over a shared catalog.
pub fn router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/:id", put(update_book).delete(delete_book))
        .route("/health", get(health))
        .route("/ws", get(ws_upgrade))
        .layer(CorsLayer::permissive())
        .with_state(catalog)
}

async fn list_books(
    State(catalog): State<Arc<Catalog>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<BookPage>, ApiError> {
    let Query(query) = query?;
    Ok(Json(catalog.list(&query).await?))
}

async fn create_book(
    State(catalog): State<Arc<Catalog>>,
    body: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let Json(input) = body?;
    let upserted = catalog.upsert(input).await?;
    Ok(Json(upserted.book))
}

async fn update_book(
    State(catalog): State<Arc<Catalog>>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<BookUpdate>, JsonRejection>,
) -> Result<Json<Book>, ApiError> {
    let Path(id) = id?;
    let Json(update) = body?;
    Ok(Json(catalog.update(id, update).await?))
}

async fn delete_book(
    State(catalog): State<Arc<Catalog>>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    catalog.delete(id).await?;
    Ok(Json(json!({ "message": "Book deleted successfully" })))
}

async fn health(State(catalog): State<Arc<Catalog>>) -> Json<Value> {
    let stats = catalog.bus_stats().await;
    Json(json!({
        "ok": true,
        "subscribers": stats.active_subscribers,
        "events_sent": stats.events_sent,
        "subscribers_dropped": stats.subscribers_dropped,
    }))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(catalog): State<Arc<Catalog>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, catalog))
}

/// Pump bus frames to the socket until either side goes away.
async fn handle_socket(socket: WebSocket, catalog: Arc<Catalog>) {
    let mut subscription = match catalog.subscribe().await {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to register subscriber: {e}");
            return;
        }
    };
    let id = subscription.id();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    loop {
        tokio::select! {
            frame = subscription.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = ws_sender.send(Message::Text(frame.to_string())).await {
                            log::debug!("Subscriber {id} send failed: {e}");
                            break;
                        }
                    }
                    None => {
                        // dropped by the bus after a failed send
                        let _ = ws_sender.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    // client frames only keep the connection alive
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::debug!("Subscriber {id} receive error: {e}");
                        break;
                    }
                }
            }
        }
    }

    catalog.unsubscribe(&id).await;
    log::info!("Subscriber {id} disconnected");
}
