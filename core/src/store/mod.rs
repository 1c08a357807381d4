//! Document store collaborator.
//!
//! A store exposes live queries over a collection path and keyed partial
//! updates. Live queries are delivered to a [`SnapshotObserver`] as full-list
//! snapshots until the returned [`Subscription`] is cancelled or dropped.

mod local;

use std::fmt;
use std::path::{Component, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::CryptoError;

pub use local::LocalDocumentStore;

pub type Fields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("invalid collection path: {0}")]
    InvalidPath(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("collection data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("collection could not be decrypted: {0}")]
    Crypto(#[from] CryptoError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Slash-separated logical path of a collection, e.g.
/// `artifacts/young-ats/public/data/candidates`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn parse(value: &str) -> Result<Self, StoreError> {
        let segments: Vec<&str> = value.split('/').collect();
        let valid = segments
            .iter()
            .all(|seg| !seg.trim().is_empty() && *seg != "." && *seg != ".." && !seg.contains('\\'));
        if !valid {
            return Err(StoreError::InvalidPath(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn candidates(app_id: &str) -> Self {
        Self(format!("artifacts/{app_id}/public/data/candidates"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative file location for this collection, rejecting anything that
    /// would escape the storage root.
    pub fn relative_file(&self) -> Result<PathBuf, StoreError> {
        let mut out = PathBuf::new();
        for component in PathBuf::from(self.0.as_str()).components() {
            match component {
                Component::Normal(part) => out.push(part),
                _ => return Err(StoreError::InvalidPath(self.0.clone())),
            }
        }
        if out.as_os_str().is_empty() {
            return Err(StoreError::InvalidPath(self.0.clone()));
        }
        out.set_extension("json");
        Ok(out)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait SnapshotObserver: Send + Sync {
    fn on_next(&self, documents: Vec<Document>);
    fn on_error(&self, error: StoreError);
}

/// Handle for a live query. Cancelling is idempotent and also happens on drop.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

pub trait DocumentStore: Send + Sync {
    /// Opens a live query. The current snapshot (or an error) is delivered
    /// before this returns, then again after every change.
    fn subscribe(
        &self,
        path: &CollectionPath,
        observer: Arc<dyn SnapshotObserver>,
    ) -> Result<Subscription, StoreError>;

    /// Merges `fields` into the document `id`.
    fn update(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Creates a document and returns its store-assigned id.
    fn insert(&self, path: &CollectionPath, fields: Fields) -> Result<String, StoreError>;
}
