//! Young Talents recruiting pipeline.
//!
//! Staff sign in, watch the candidate collection live, and move candidates
//! through a fixed sequence of hiring stages on a kanban board or a table.
//! The identity provider and the document store are injected collaborators;
//! [`identity::LocalIdentityProvider`] and [`store::LocalDocumentStore`] are
//! the file-backed implementations used by the desktop runtime.
//!
//! [`shell::Dashboard`] is the entry point: it owns the session gate, the
//! candidate binding, the filters, and the editor, and renders everything into
//! a serializable [`shell::DashboardSnapshot`].

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod binding;
pub mod config;
pub mod crypto;
pub mod demo;
pub mod editor;
pub mod export;
pub mod filter;
pub mod identity;
pub mod model;
pub mod session;
pub mod shell;
pub mod stage;
pub mod stats;
pub mod store;
pub mod views;

pub use binding::{BindingError, CandidateBinding, FailedWrite};
pub use config::{AppConfig, ConfigError};
pub use editor::{CandidateEditor, EditorError, FieldKey, Tab};
pub use filter::{filter_candidates, FilterCriteria};
pub use identity::{AuthError, Credentials, IdentityProvider, LocalIdentityProvider};
pub use model::{Candidate, CandidatePatch, User};
pub use session::SessionGate;
pub use shell::{Dashboard, DashboardSnapshot, ShellError, View};
pub use stage::{Direction, Stage, StageModel, PIPELINE_STAGES};
pub use store::{CollectionPath, DocumentStore, LocalDocumentStore, StoreError};

// Shared state stays usable after a panicking callback; every critical section
// leaves it consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
