//! Identity collaborator: interactive sign-in, sign-out, and a session-changed
//! notification stream.

mod local;

use thiserror::Error;

use crate::model::User;

pub use local::LocalIdentityProvider;

/// Dropping the handle unregisters the listener.
pub type ListenerHandle = crate::store::Subscription;

pub type SessionListener = Box<dyn Fn(Option<User>) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("e-mail domain is not authorized: {domain}")]
    UnauthorizedDomain { domain: String },

    #[error("invalid e-mail or password")]
    InvalidCredentials,

    #[error("invalid e-mail address: {0}")]
    InvalidEmail(String),

    #[error("password is required")]
    PasswordRequired,

    #[error("an account already exists for {0}")]
    AccountExists(String),

    #[error("account storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("account file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, credentials: &Credentials) -> Result<User, AuthError>;

    fn sign_out(&self) -> Result<(), AuthError>;

    fn current_user(&self) -> Option<User>;

    /// Registers `listener`. It is called with the current session before this
    /// returns, and again on every sign-in or sign-out.
    fn subscribe(&self, listener: SessionListener) -> ListenerHandle;
}

/// Lower-cased domain part of an e-mail address.
pub fn email_domain(email: &str) -> Option<String> {
    let (local, domain) = email.trim().rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return None;
    }
    Some(domain.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_domain_extracts_lowercase_domain() {
        assert_eq!(
            email_domain(" Ana@Young.com.br ").as_deref(),
            Some("young.com.br")
        );
        assert_eq!(email_domain("no-at-sign"), None);
        assert_eq!(email_domain("@young.com.br"), None);
        assert_eq!(email_domain("ana@localhost"), None);
    }
}
