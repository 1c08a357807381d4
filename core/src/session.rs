//! Session gate over the identity provider's session-changed stream.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::identity::{AuthError, Credentials, IdentityProvider, ListenerHandle};
use crate::lock;
use crate::model::User;

struct GateState {
    current_user: Option<User>,
    auth_loading: bool,
    auth_error: Option<String>,
}

/// Holds the current user and a loading flag that clears on the first
/// notification. The provider listener is released when the gate is dropped.
pub struct SessionGate {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<Mutex<GateState>>,
    listener: ListenerHandle,
}

impl SessionGate {
    /// Registers with `provider`. `on_change` runs after every notification,
    /// once the gate state has been replaced.
    pub fn attach<F>(provider: Arc<dyn IdentityProvider>, on_change: F) -> Self
    where
        F: Fn(Option<&User>) + Send + Sync + 'static,
    {
        let state = Arc::new(Mutex::new(GateState {
            current_user: None,
            auth_loading: true,
            auth_error: None,
        }));
        let sink = Arc::clone(&state);
        let listener = provider.subscribe(Box::new(move |user: Option<User>| {
            {
                let mut gate = lock(&sink);
                gate.current_user = user.clone();
                gate.auth_loading = false;
            }
            on_change(user.as_ref());
        }));
        Self {
            provider,
            state,
            listener,
        }
    }

    pub fn current_user(&self) -> Option<User> {
        lock(&self.state).current_user.clone()
    }

    pub fn auth_loading(&self) -> bool {
        lock(&self.state).auth_loading
    }

    /// Last sign-in failure, shown as a blocking alert until dismissed or a
    /// new attempt starts.
    pub fn auth_error(&self) -> Option<String> {
        lock(&self.state).auth_error.clone()
    }

    pub fn dismiss_auth_error(&self) {
        lock(&self.state).auth_error = None;
    }

    pub fn sign_in(&self, credentials: &Credentials) -> Result<User, AuthError> {
        lock(&self.state).auth_error = None;
        match self.provider.sign_in(credentials) {
            Ok(user) => {
                info!(uid = %user.uid, "session established");
                Ok(user)
            }
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                lock(&self.state).auth_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out()
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_active()
    }
}
