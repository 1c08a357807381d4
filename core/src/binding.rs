//! Live binding between the candidate collection and the dashboard.
//!
//! At most one subscription is open at a time, scoped to the signed-in user.
//! Writes are applied locally first; when the store rejects one, the local
//! record is reverted and the write is kept in [`CandidateBinding::failed_writes`]
//! so it can be retried or discarded.

use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::lock;
use crate::model::{Candidate, CandidatePatch, User};
use crate::store::{CollectionPath, Document, DocumentStore, SnapshotObserver, StoreError, Subscription};

pub type ChangeHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BindingError {
    #[error("candidate not found: {0}")]
    UnknownCandidate(String),

    #[error("no failed write recorded for candidate {0}")]
    NoFailedWrite(String),

    #[error("failed to save candidate {id}: {source}")]
    Write {
        id: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedWrite {
    pub id: String,
    pub patch: CandidatePatch,
    pub error: String,
}

#[derive(Default)]
struct BindingState {
    candidates: Vec<Candidate>,
    loading: bool,
    error: Option<String>,
    failed_writes: Vec<FailedWrite>,
    // Bumped on every (re)bind so callbacks from a cancelled query are dropped.
    generation: u64,
}

struct ActiveQuery {
    uid: String,
    subscription: Subscription,
}

pub struct CandidateBinding {
    store: Arc<dyn DocumentStore>,
    path: CollectionPath,
    state: Arc<Mutex<BindingState>>,
    active: Mutex<Option<ActiveQuery>>,
    hook: Option<ChangeHook>,
}

struct BindingObserver {
    state: Weak<Mutex<BindingState>>,
    generation: u64,
    hook: Option<ChangeHook>,
}

impl BindingObserver {
    fn with_current<R>(&self, f: impl FnOnce(&mut BindingState) -> R) -> Option<R> {
        let state = self.state.upgrade()?;
        let mut guard = lock(&state);
        if guard.generation != self.generation {
            return None;
        }
        Some(f(&mut guard))
    }

    fn changed(&self) {
        if let Some(hook) = &self.hook {
            hook();
        }
    }
}

impl SnapshotObserver for BindingObserver {
    fn on_next(&self, documents: Vec<Document>) {
        let candidates: Vec<Candidate> = documents
            .iter()
            .filter_map(|doc| match Candidate::from_document(doc) {
                Ok(candidate) => Some(candidate),
                Err(err) => {
                    warn!(id = %doc.id, error = %err, "skipping malformed candidate document");
                    None
                }
            })
            .collect();
        let count = candidates.len();
        let applied = self.with_current(move |state| {
            state.candidates = candidates;
            state.loading = false;
            state.error = None;
        });
        if applied.is_some() {
            debug!(count, "candidate snapshot applied");
            self.changed();
        }
    }

    fn on_error(&self, error: StoreError) {
        warn!(error = %error, "candidate subscription failed");
        let message = error.to_string();
        let applied = self.with_current(move |state| {
            state.error = Some(message);
            state.loading = false;
        });
        if applied.is_some() {
            self.changed();
        }
    }
}

impl CandidateBinding {
    pub fn new(store: Arc<dyn DocumentStore>, path: CollectionPath) -> Self {
        Self {
            store,
            path,
            state: Arc::new(Mutex::new(BindingState::default())),
            active: Mutex::new(None),
            hook: None,
        }
    }

    /// Runs `hook` after every change to the bound list or its flags. The hook
    /// must not call back into the binding.
    pub fn with_change_hook(mut self, hook: ChangeHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Follows the session: opens the query for `Some(user)`, tears it down and
    /// clears the list for `None`. Rebinding the same user is a no-op.
    pub fn bind(&self, user: Option<&User>) {
        let previous = {
            let mut active = lock(&self.active);
            if let (Some(user), Some(query)) = (user, active.as_ref()) {
                if query.uid == user.uid {
                    return;
                }
            }
            active.take()
        };
        if let Some(mut query) = previous {
            query.subscription.cancel();
            info!(collection = %self.path, uid = %query.uid, "candidate subscription closed");
        }

        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.error = None;
            state.failed_writes.clear();
            match user {
                Some(_) => state.loading = true,
                None => {
                    state.candidates.clear();
                    state.loading = false;
                }
            }
            state.generation
        };

        let Some(user) = user else {
            self.changed();
            return;
        };

        let observer = Arc::new(BindingObserver {
            state: Arc::downgrade(&self.state),
            generation,
            hook: self.hook.clone(),
        });
        match self.store.subscribe(&self.path, observer) {
            Ok(subscription) => {
                // Install only if no newer bind ran while the store was subscribing.
                let stale = {
                    let mut active = lock(&self.active);
                    if lock(&self.state).generation == generation {
                        *active = Some(ActiveQuery {
                            uid: user.uid.clone(),
                            subscription,
                        });
                        None
                    } else {
                        Some(subscription)
                    }
                };
                match stale {
                    None => {
                        info!(collection = %self.path, uid = %user.uid, "candidate subscription opened");
                    }
                    Some(mut subscription) => {
                        subscription.cancel();
                        debug!(uid = %user.uid, "candidate subscription superseded");
                    }
                }
            }
            Err(err) => {
                warn!(collection = %self.path, error = %err, "candidate subscription refused");
                let mut state = lock(&self.state);
                if state.generation == generation {
                    state.error = Some(err.to_string());
                    state.loading = false;
                }
            }
        }
        self.changed();
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.active).is_some()
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        lock(&self.state).candidates.clone()
    }

    pub fn candidate(&self, id: &str) -> Option<Candidate> {
        lock(&self.state)
            .candidates
            .iter()
            .find(|candidate| candidate.id == id)
            .cloned()
    }

    pub fn loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    pub fn dismiss_error(&self) {
        lock(&self.state).error = None;
        self.changed();
    }

    pub fn failed_writes(&self) -> Vec<FailedWrite> {
        lock(&self.state).failed_writes.clone()
    }

    /// Optimistically applies `patch`, then writes it to the store. On failure
    /// the patched keys are restored and the write is recorded as failed.
    pub fn update_candidate(&self, id: &str, patch: CandidatePatch) -> Result<Candidate, BindingError> {
        let (previous, updated) = {
            let mut state = lock(&self.state);
            let candidate = state
                .candidates
                .iter_mut()
                .find(|candidate| candidate.id == id)
                .ok_or_else(|| BindingError::UnknownCandidate(id.to_string()))?;
            let previous = candidate.clone();
            patch.apply(candidate);
            let updated = candidate.clone();
            state.failed_writes.retain(|failed| failed.id != id);
            (previous, updated)
        };
        self.changed();

        match self.store.update(&self.path, id, patch.to_fields()) {
            Ok(()) => {
                debug!(id, "candidate saved");
                Ok(updated)
            }
            Err(err) => {
                warn!(id, error = %err, "candidate write failed, reverting");
                {
                    let mut state = lock(&self.state);
                    if let Some(candidate) = state.candidates.iter_mut().find(|c| c.id == id) {
                        patch.revert(candidate, &previous);
                    }
                    state.failed_writes.push(FailedWrite {
                        id: id.to_string(),
                        patch,
                        error: err.to_string(),
                    });
                }
                self.changed();
                Err(BindingError::Write {
                    id: id.to_string(),
                    source: err,
                })
            }
        }
    }

    pub fn retry_write(&self, id: &str) -> Result<Candidate, BindingError> {
        let patch = {
            let mut state = lock(&self.state);
            let pos = state
                .failed_writes
                .iter()
                .position(|failed| failed.id == id)
                .ok_or_else(|| BindingError::NoFailedWrite(id.to_string()))?;
            state.failed_writes.remove(pos).patch
        };
        self.update_candidate(id, patch)
    }

    pub fn discard_failed_write(&self, id: &str) -> Result<(), BindingError> {
        {
            let mut state = lock(&self.state);
            let before = state.failed_writes.len();
            state.failed_writes.retain(|failed| failed.id != id);
            if state.failed_writes.len() == before {
                return Err(BindingError::NoFailedWrite(id.to_string()));
            }
        }
        self.changed();
        Ok(())
    }

    fn changed(&self) {
        if let Some(hook) = &self.hook {
            hook();
        }
    }
}

impl Drop for CandidateBinding {
    fn drop(&mut self) {
        if let Some(mut query) = lock(&self.active).take() {
            query.subscription.cancel();
        }
    }
}
