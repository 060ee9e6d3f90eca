use std::collections::HashMap;
use std::sync::Mutex;

use branchtag_core::error::TaggerError;

/// Environment variable holding the scan-platform token.
pub const SNYK_TOKEN: &str = "SNYK_TOKEN";
/// Environment variable holding the hosting-platform token.
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

/// Trait for credential lookup backends.
pub trait CredentialStore: Send + Sync {
    /// Retrieve a token by key. Empty values count as absent.
    fn get(&self, key: &str) -> Result<Option<String>, TaggerError>;
}

/// Reads tokens from process environment variables.
#[derive(Debug, Default)]
pub struct EnvStore;

impl EnvStore {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialStore for EnvStore {
    fn get(&self, key: &str) -> Result<Option<String>, TaggerError> {
        match std::env::var(key) {
            Ok(v) if !v.trim().is_empty() => Ok(Some(v)),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(TaggerError::Config {
                message: format!("{key}: {e}"),
            }),
        }
    }
}

/// In-memory credential store for testing.
pub struct MemoryStore {
    store: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self, key: &str, token: &str) {
        self.store
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), token.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, TaggerError> {
        Ok(self
            .store
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned())
    }
}

/// Both platform tokens, resolved before any network call.
#[derive(Clone)]
pub struct Credentials {
    pub snyk_token: String,
    pub github_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("snyk_token", &"<redacted>")
            .field("github_token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Load both tokens, failing on the first one that is missing.
    pub fn load(store: &dyn CredentialStore) -> Result<Self, TaggerError> {
        let snyk_token = require(store, SNYK_TOKEN)?;
        let github_token = require(store, GITHUB_TOKEN)?;
        tracing::debug!("loaded scan-platform and hosting-platform tokens");
        Ok(Self {
            snyk_token,
            github_token,
        })
    }
}

fn require(store: &dyn CredentialStore, key: &str) -> Result<String, TaggerError> {
    store
        .get(key)?
        .ok_or_else(|| TaggerError::MissingCredential {
            name: key.to_string(),
        })
}
