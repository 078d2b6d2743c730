//! Credential lookup for the completion endpoint
//!
//! The orchestrator asks a [`CredentialStore`] for the API key on every
//! request and drops it once the request has been built. Setting or
//! rotating the key belongs to the host (`atchat auth`).

use crate::error::Result;
use std::collections::HashMap;

/// Read access to named secrets
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Fetch a secret; `Ok(None)` when nothing is stored under `name`
    fn get_secret(&self, name: &str) -> Result<Option<String>>;
}

/// Secrets kept in the system keyring under a fixed service name
///
/// # Examples
///
/// ```no_run
/// use atchat::credentials::{CredentialStore, KeyringStore};
///
/// let store = KeyringStore::new("atchat");
/// let key = store.get_secret("geminiApiKey").unwrap();
/// println!("key present: {}", key.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Store bound to a keyring service
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Keyring service name
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Save a secret in the keyring
    pub fn set_secret(&self, name: &str, value: &str) -> Result<()> {
        let entry = keyring::Entry::new(&self.service, name)?;
        entry.set_password(value)?;
        tracing::info!(service = %self.service, name, "Stored secret in keyring");
        Ok(())
    }

    /// Delete a secret from the keyring; missing entries are not an error
    pub fn delete_secret(&self, name: &str) -> Result<()> {
        let entry = keyring::Entry::new(&self.service, name)?;
        match entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for KeyringStore {
    fn get_secret(&self, name: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(&self.service, name)?;
        match entry.get_password() {
            Ok(secret) if secret.is_empty() => Ok(None),
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Secrets read from an environment variable
///
/// Every secret name maps to the same variable; handy for CI and for
/// headless hosts without a keyring daemon.
#[derive(Debug, Clone)]
pub struct EnvStore {
    variable: String,
}

impl EnvStore {
    /// Store reading `variable`
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

impl CredentialStore for EnvStore {
    fn get_secret(&self, _name: &str) -> Result<Option<String>> {
        Ok(std::env::var(&self.variable)
            .ok()
            .filter(|value| !value.trim().is_empty()))
    }
}

/// Fixed in-memory secrets
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    secrets: HashMap<String, String>,
}

impl StaticStore {
    /// Empty store; every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    /// Store holding one secret
    pub fn with_secret(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert(name.into(), value.into());
        Self { secrets }
    }
}

impl CredentialStore for StaticStore {
    fn get_secret(&self, name: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(name).cloned())
    }
}
