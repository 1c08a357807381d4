use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CollectionPath, Document, DocumentStore, Fields, SnapshotObserver, StoreError, Subscription};
use crate::crypto::{self, CryptoEnvelope};
use crate::lock;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    #[serde(default)]
    documents: Vec<Document>,
}

struct Watcher {
    id: u64,
    observer: Arc<dyn SnapshotObserver>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<CollectionPath, Vec<Document>>,
    watchers: HashMap<CollectionPath, Vec<Watcher>>,
    next_watcher: u64,
    // Collections with a delivery in progress; `true` once a newer commit lands.
    delivering: HashMap<CollectionPath, bool>,
    // Salt and derived key of the collection file, reused across writes.
    crypto: HashMap<CollectionPath, (Vec<u8>, [u8; 32])>,
}

/// File-backed document store. Each collection is one JSON file under `root`,
/// sealed in a [`CryptoEnvelope`] when a passphrase is configured.
pub struct LocalDocumentStore {
    root: PathBuf,
    passphrase: Option<String>,
    iterations: u32,
    inner: Arc<Mutex<Inner>>,
}

impl LocalDocumentStore {
    pub fn open(root: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        Self::with_iterations(root, passphrase, crypto::DEFAULT_PBKDF2_ITERATIONS)
    }

    pub fn with_iterations(
        root: impl Into<PathBuf>,
        passphrase: Option<String>,
        iterations: u32,
    ) -> Self {
        Self {
            root: root.into(),
            passphrase: passphrase.filter(|p| !p.is_empty()),
            iterations: iterations.max(1),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_encrypted(&self) -> bool {
        self.passphrase.is_some()
    }

    pub fn documents(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let mut inner = lock(&self.inner);
        self.ensure_loaded(&mut inner, path)?;
        Ok(inner.collections.get(path).cloned().unwrap_or_default())
    }

    fn file_path(&self, path: &CollectionPath) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(path.relative_file()?))
    }

    fn ensure_loaded(&self, inner: &mut Inner, path: &CollectionPath) -> Result<(), StoreError> {
        if inner.collections.contains_key(path) {
            return Ok(());
        }
        let file = self.file_path(path)?;
        let documents = if file.exists() {
            let raw = fs::read_to_string(&file)?;
            self.decode(inner, path, raw.as_str())?
        } else {
            Vec::new()
        };
        debug!(collection = %path, count = documents.len(), "collection loaded");
        inner.collections.insert(path.clone(), documents);
        Ok(())
    }

    fn decode(
        &self,
        inner: &mut Inner,
        path: &CollectionPath,
        raw: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let plaintext = match &self.passphrase {
            None => raw.to_string(),
            Some(passphrase) => {
                let envelope: CryptoEnvelope = serde_json::from_str(raw)?;
                let salt = crypto::decode_b64(envelope.salt.as_str())?;
                let key = match inner.crypto.get(path) {
                    Some((cached_salt, key)) if *cached_salt == salt => *key,
                    _ => crypto::derive_key(passphrase, salt.as_slice(), self.iterations),
                };
                let text = crypto::decrypt_envelope_with_key(&envelope, &key)?;
                inner.crypto.insert(path.clone(), (salt, key));
                text
            }
        };
        let file: CollectionFile = serde_json::from_str(plaintext.as_str())?;
        Ok(file.documents)
    }

    fn persist(
        &self,
        inner: &mut Inner,
        path: &CollectionPath,
        documents: &[Document],
    ) -> Result<(), StoreError> {
        let file = CollectionFile {
            documents: documents.to_vec(),
        };
        let content = match &self.passphrase {
            None => serde_json::to_string_pretty(&file)?,
            Some(passphrase) => {
                let plaintext = serde_json::to_string(&file)?;
                let (salt, key) = match inner.crypto.get(path) {
                    Some(cached) => cached.clone(),
                    None => {
                        let salt = crypto::random_salt();
                        let key = crypto::derive_key(passphrase, &salt, self.iterations);
                        (salt.to_vec(), key)
                    }
                };
                let envelope = crypto::encrypt_text_with_key(plaintext.as_str(), &salt, &key)?;
                inner.crypto.insert(path.clone(), (salt, key));
                serde_json::to_string(&envelope)?
            }
        };
        write_text_file(self.file_path(path)?, content.as_str())
    }

    /// Applies `change` to a copy of the collection, persists it, then commits it
    /// in memory.
    fn mutate<T>(
        &self,
        path: &CollectionPath,
        change: impl FnOnce(&mut Vec<Document>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut inner = lock(&self.inner);
        self.ensure_loaded(&mut inner, path)?;
        let mut documents = inner.collections.get(path).cloned().unwrap_or_default();
        let out = change(&mut documents)?;
        self.persist(&mut inner, path, documents.as_slice())?;
        inner.collections.insert(path.clone(), documents);
        Ok(out)
    }

    /// Sends the latest snapshot of `path` to its watchers, outside the lock.
    ///
    /// One caller delivers per collection at a time. A commit landing during a
    /// delivery marks the collection and the deliverer goes round again, so a
    /// watcher never receives an older list after a newer one. Writes made from
    /// inside `on_next` are delivered after the current call returns.
    fn publish(&self, path: &CollectionPath) {
        {
            let mut inner = lock(&self.inner);
            if let Some(pending) = inner.delivering.get_mut(path) {
                *pending = true;
                return;
            }
            inner.delivering.insert(path.clone(), false);
        }
        loop {
            let (observers, documents) = {
                let mut inner = lock(&self.inner);
                inner.delivering.insert(path.clone(), false);
                let observers: Vec<Arc<dyn SnapshotObserver>> = inner
                    .watchers
                    .get(path)
                    .map(|list| list.iter().map(|w| Arc::clone(&w.observer)).collect())
                    .unwrap_or_default();
                (observers, inner.collections.get(path).cloned().unwrap_or_default())
            };
            for observer in observers {
                observer.on_next(documents.clone());
            }
            let mut inner = lock(&self.inner);
            if inner.delivering.get(path).copied() != Some(true) {
                inner.delivering.remove(path);
                return;
            }
        }
    }
}

fn remove_watcher(inner: &Weak<Mutex<Inner>>, path: &CollectionPath, id: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut guard = lock(&inner);
    if let Some(list) = guard.watchers.get_mut(path) {
        list.retain(|watcher| watcher.id != id);
        if list.is_empty() {
            guard.watchers.remove(path);
        }
    }
}

impl DocumentStore for LocalDocumentStore {
    fn subscribe(
        &self,
        path: &CollectionPath,
        observer: Arc<dyn SnapshotObserver>,
    ) -> Result<Subscription, StoreError> {
        let (id, loaded) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_watcher;
            inner.next_watcher += 1;
            inner.watchers.entry(path.clone()).or_default().push(Watcher {
                id,
                observer: Arc::clone(&observer),
            });
            (id, self.ensure_loaded(&mut inner, path))
        };

        match loaded {
            Ok(()) => self.publish(path),
            Err(err) => {
                warn!(collection = %path, error = %err, "live query failed to load");
                observer.on_error(err);
            }
        }

        let weak = Arc::downgrade(&self.inner);
        let path = path.clone();
        Ok(Subscription::new(move || remove_watcher(&weak, &path, id)))
    }

    fn update(&self, path: &CollectionPath, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.mutate(path, |documents| {
            let doc = documents.iter_mut().find(|doc| doc.id == id).ok_or_else(|| {
                StoreError::NotFound {
                    collection: path.to_string(),
                    id: id.to_string(),
                }
            })?;
            for (key, value) in fields {
                doc.fields.insert(key, value);
            }
            Ok(())
        })?;
        self.publish(path);
        Ok(())
    }

    fn insert(&self, path: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let id = self.mutate(path, |documents| {
            let id = crypto::new_id();
            documents.push(Document {
                id: id.clone(),
                fields,
            });
            Ok(id)
        })?;
        self.publish(path);
        Ok(id)
    }
}

fn write_text_file(path: PathBuf, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
