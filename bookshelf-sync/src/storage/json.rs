//! Single-document JSON store.
//!
//! The whole collection lives in one pretty-printed JSON array and is read
//! or written in full. Writes go to a sibling `*.tmp` file that is renamed
//! over the document, so a reader sees either the old or the new array.
//! One mutex serializes every file access made through a `BookStore`.

use std::io;
use std::path::{Path, PathBuf};

use bookshelf_core::Book;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed book document {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub struct BookStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl BookStore {
    /// Store backed by the document at `path`. Nothing is read until the
    /// first load.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    /// Like `new`, but creates the parent directory if it is missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(path);
        if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the collection, falling back to an empty one.
    ///
    /// A missing document is the normal first-run state. Any other read or
    /// parse failure is logged and also treated as empty.
    pub async fn load_all(&self) -> Vec<Book> {
        match self.try_load_all().await {
            Ok(books) => books,
            Err(StoreError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Vec::new()
            }
            Err(e) => {
                log::warn!("Treating book store as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Read the collection, surfacing every failure.
    pub async fn try_load_all(&self) -> Result<Vec<Book>, StoreError> {
        let bytes = {
            let _guard = self.io_lock.lock().await;
            tokio::fs::read(&self.path)
                .await
                .map_err(|e| StoreError::io(&self.path, e))?
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the document with `books`.
    pub async fn save_all(&self, books: &[Book]) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(books).map_err(|source| {
            StoreError::Serialization {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.temp_path();
        let _guard = self.io_lock.lock().await;
        let result = async {
            tokio::fs::write(&tmp, &bytes)
                .await
                .map_err(|e| StoreError::io(&tmp, e))?;
            tokio::fs::rename(&tmp, &self.path)
                .await
                .map_err(|e| StoreError::io(&self.path, e))
        }
        .await;

        if let Err(e) = &result {
            log::error!("Failed to save {} books: {e}", books.len());
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "books.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
