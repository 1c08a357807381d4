use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use super::{email_domain, AuthError, Credentials, IdentityProvider, ListenerHandle, SessionListener};
use crate::config::IdentityConfig;
use crate::crypto;
use crate::lock;
use crate::model::User;

pub const ACCOUNTS_FILE: &str = "accounts.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    uid: String,
    email: String,
    display_name: String,
    #[serde(default)]
    photo_url: Option<String>,
    salt: String,
    hash: String,
    #[serde(default = "default_iterations")]
    iterations: u32,
}

fn default_iterations() -> u32 {
    crypto::DEFAULT_PBKDF2_ITERATIONS
}

impl AccountRecord {
    fn user(&self) -> User {
        User {
            uid: self.uid.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            photo_url: self.photo_url.clone(),
        }
    }

    fn verify(&self, password: &str) -> bool {
        let (Ok(salt), Ok(stored)) = (
            crypto::decode_b64(self.salt.as_str()),
            crypto::decode_b64(self.hash.as_str()),
        ) else {
            return false;
        };
        let key = crypto::derive_key(password, salt.as_slice(), self.iterations.max(1));
        // Length mismatch compares unequal without inspecting the bytes.
        key.as_slice().ct_eq(stored.as_slice()).into()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<AccountRecord>,
}

type SharedListener = Arc<dyn Fn(Option<User>) + Send + Sync>;

#[derive(Default)]
struct SessionInner {
    current: Option<User>,
    listeners: Vec<(u64, SharedListener)>,
    next_listener: u64,
}

/// Password accounts stored in `accounts.json`, hashed with PBKDF2.
pub struct LocalIdentityProvider {
    accounts_path: PathBuf,
    allowed_domains: Vec<String>,
    iterations: u32,
    session: Arc<Mutex<SessionInner>>,
}

impl LocalIdentityProvider {
    pub fn open(root: impl Into<PathBuf>, config: &IdentityConfig) -> Self {
        Self {
            accounts_path: root.into().join(ACCOUNTS_FILE),
            allowed_domains: config
                .allowed_domains
                .iter()
                .map(|domain| domain.trim().trim_start_matches('@').to_lowercase())
                .filter(|domain| !domain.is_empty())
                .collect(),
            iterations: config.pbkdf2_iterations.max(1),
            session: Arc::new(Mutex::new(SessionInner::default())),
        }
    }

    pub fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email)?;
        self.check_domain(email.as_str())?;
        if password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }
        let mut file = self.read_accounts()?;
        if file.accounts.iter().any(|acc| acc.email == email) {
            return Err(AuthError::AccountExists(email));
        }

        let salt = crypto::random_salt();
        let key = crypto::derive_key(password, &salt, self.iterations);
        let display_name = display_name.trim();
        let record = AccountRecord {
            uid: crypto::new_id(),
            display_name: if display_name.is_empty() {
                email.clone()
            } else {
                display_name.to_string()
            },
            email,
            photo_url: None,
            salt: crypto::encode_b64(&salt),
            hash: crypto::encode_b64(key.as_slice()),
            iterations: self.iterations,
        };
        let user = record.user();
        file.accounts.push(record);
        self.write_accounts(&file)?;
        info!(email = %user.email, "account registered");
        Ok(user)
    }

    fn check_domain(&self, email: &str) -> Result<(), AuthError> {
        if self.allowed_domains.is_empty() {
            return Ok(());
        }
        let domain = email_domain(email).ok_or_else(|| AuthError::InvalidEmail(email.to_string()))?;
        if self.allowed_domains.iter().any(|allowed| *allowed == domain) {
            Ok(())
        } else {
            Err(AuthError::UnauthorizedDomain { domain })
        }
    }

    fn read_accounts(&self) -> Result<AccountsFile, AuthError> {
        if !self.accounts_path.exists() {
            return Ok(AccountsFile::default());
        }
        let raw = fs::read_to_string(&self.accounts_path)?;
        Ok(serde_json::from_str(raw.as_str())?)
    }

    fn write_accounts(&self, file: &AccountsFile) -> Result<(), AuthError> {
        if let Some(parent) = self.accounts_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(file)?;
        fs::write(&self.accounts_path, content)?;
        Ok(())
    }

    fn set_session(&self, user: Option<User>) {
        let listeners: Vec<SharedListener> = {
            let mut inner = lock(&self.session);
            inner.current = user.clone();
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(user.clone());
        }
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    if email_domain(email.as_str()).is_none() {
        return Err(AuthError::InvalidEmail(email));
    }
    Ok(email)
}

fn remove_listener(session: &Weak<Mutex<SessionInner>>, id: u64) {
    if let Some(session) = session.upgrade() {
        lock(&session).listeners.retain(|(lid, _)| *lid != id);
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn sign_in(&self, credentials: &Credentials) -> Result<User, AuthError> {
        let email = normalize_email(credentials.email.as_str())?;
        if let Err(err) = self.check_domain(email.as_str()) {
            warn!(email = %email, error = %err, "sign-in rejected");
            return Err(err);
        }
        if credentials.password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }
        let file = self.read_accounts()?;
        let user = file
            .accounts
            .iter()
            .find(|acc| acc.email == email && acc.verify(credentials.password.as_str()))
            .map(AccountRecord::user)
            .ok_or(AuthError::InvalidCredentials)?;
        info!(email = %user.email, "signed in");
        self.set_session(Some(user.clone()));
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        info!("signed out");
        self.set_session(None);
        Ok(())
    }

    fn current_user(&self) -> Option<User> {
        lock(&self.session).current.clone()
    }

    fn subscribe(&self, listener: SessionListener) -> ListenerHandle {
        let listener: SharedListener = Arc::from(listener);
        let (id, current) = {
            let mut inner = lock(&self.session);
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.push((id, Arc::clone(&listener)));
            (id, inner.current.clone())
        };
        listener(current);
        let weak = Arc::downgrade(&self.session);
        ListenerHandle::new(move || remove_listener(&weak, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(dir: &std::path::Path, domains: &[&str]) -> LocalIdentityProvider {
        LocalIdentityProvider::open(
            dir,
            &IdentityConfig {
                allowed_domains: domains.iter().map(|d| d.to_string()).collect(),
                pbkdf2_iterations: 10,
            },
        )
    }

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn register_then_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let idp = provider(dir.path(), &[]);
        let registered = idp.register("Ana@Young.com.br", "Ana Silva", "senha").unwrap();
        assert_eq!(registered.email, "ana@young.com.br");

        let user = idp.sign_in(&creds("ana@young.com.br", "senha")).unwrap();
        assert_eq!(user, registered);
        assert_eq!(idp.current_user(), Some(user));
    }

    #[test]
    fn stored_hash_must_match_in_full() {
        let salt = [7u8; 16];
        let key = crypto::derive_key("senha", &salt, 10);
        let mut record = AccountRecord {
            uid: "u1".into(),
            email: "ana@young.com.br".into(),
            display_name: "Ana".into(),
            photo_url: None,
            salt: crypto::encode_b64(&salt),
            hash: crypto::encode_b64(key.as_slice()),
            iterations: 10,
        };
        assert!(record.verify("senha"));
        assert!(!record.verify("senhA"));

        record.hash = crypto::encode_b64(&key[..16]);
        assert!(!record.verify("senha"));
        record.hash = "not base64!".into();
        assert!(!record.verify("senha"));
    }

    #[test]
    fn wrong_password_is_rejected_and_session_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let idp = provider(dir.path(), &[]);
        idp.register("ana@young.com.br", "Ana", "senha").unwrap();
        assert!(matches!(
            idp.sign_in(&creds("ana@young.com.br", "errada")),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(idp.current_user().is_none());
    }

    #[test]
    fn unauthorized_domain_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let idp = provider(dir.path(), &["young.com.br"]);
        let err = idp.sign_in(&creds("ana@gmail.com", "senha")).unwrap_err();
        assert!(matches!(err, AuthError::UnauthorizedDomain { domain } if domain == "gmail.com"));
        assert!(idp.register("ana@gmail.com", "Ana", "senha").is_err());
    }

    #[test]
    fn duplicate_account_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let idp = provider(dir.path(), &[]);
        idp.register("ana@young.com.br", "Ana", "senha").unwrap();
        assert!(matches!(
            idp.register("ANA@young.com.br", "Ana", "outra"),
            Err(AuthError::AccountExists(_))
        ));
    }

    #[test]
    fn listeners_see_current_session_then_changes() {
        let dir = tempfile::tempdir().unwrap();
        let idp = provider(dir.path(), &[]);
        idp.register("ana@young.com.br", "Ana", "senha").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = idp.subscribe(Box::new(move |user: Option<User>| {
            lock(&sink).push(user.map(|u| u.email));
        }));
        idp.sign_in(&creds("ana@young.com.br", "senha")).unwrap();
        idp.sign_out().unwrap();
        drop(handle);
        idp.sign_in(&creds("ana@young.com.br", "senha")).unwrap();

        assert_eq!(
            *lock(&seen),
            vec![None, Some("ana@young.com.br".to_string()), None]
        );
    }
}
