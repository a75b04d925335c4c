//! Persisted session and auth credentials, keyed by accounts domain.
//!
//! The request wrapper only ever reads both values and writes the session
//! id back; the auth token is never written by this crate.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

/// Read/write access to stored credentials.
///
/// Implementations are responsible for their own write consistency under
/// concurrent callers; the wrapper takes no lock of its own.
pub trait CredentialStore: Send + Sync {
    /// Current session identifier for the domain, if any.
    fn session_id(&self, domain: &str) -> Option<String>;

    /// Replace the session identifier for the domain.
    fn set_session_id(&self, domain: &str, session_id: &str);

    /// Current auth token for the domain, if any.
    fn session_token(&self, domain: &str) -> Option<String>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DomainCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// In-memory credential store, for embedding and for tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    domains: Mutex<HashMap<String, DomainCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an auth token, e.g. before exercising `use_auth_header`.
    pub fn set_session_token(&self, domain: &str, token: &str) {
        let mut domains = self.domains.lock().expect("credential store poisoned");
        domains.entry(domain.to_string()).or_default().token = Some(token.to_string());
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn session_id(&self, domain: &str) -> Option<String> {
        let domains = self.domains.lock().expect("credential store poisoned");
        domains.get(domain).and_then(|creds| creds.session.clone())
    }

    fn set_session_id(&self, domain: &str, session_id: &str) {
        let mut domains = self.domains.lock().expect("credential store poisoned");
        domains.entry(domain.to_string()).or_default().session = Some(session_id.to_string());
    }

    fn session_token(&self, domain: &str) -> Option<String> {
        let domains = self.domains.lock().expect("credential store poisoned");
        domains.get(domain).and_then(|creds| creds.token.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    sessions: HashMap<String, DomainCredentials>,
}

/// JSON-file-backed credential store.
///
/// The file is read on every lookup and rewritten whole on every session-id
/// update, so external edits between calls are picked up.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialStore { path: path.into() }
    }

    /// Store under `.meteorsession` in the home directory.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| FetchError::Config("Cannot determine home directory".to_string()))?;
        Ok(Self::new(home.join(".meteorsession")))
    }

    fn read(&self) -> SessionFile {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("ignoring unreadable session file {:?}: {}", self.path, e);
                SessionFile::default()
            }),
            Err(_) => SessionFile::default(),
        }
    }

    fn write(&self, file: &SessionFile) -> Result<()> {
        let contents = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn session_id(&self, domain: &str) -> Option<String> {
        self.read()
            .sessions
            .get(domain)
            .and_then(|creds| creds.session.clone())
    }

    fn set_session_id(&self, domain: &str, session_id: &str) {
        let mut file = self.read();
        file.sessions.entry(domain.to_string()).or_default().session =
            Some(session_id.to_string());
        if let Err(e) = self.write(&file) {
            log::warn!("failed to persist session id to {:?}: {}", self.path, e);
        }
    }

    fn session_token(&self, domain: &str) -> Option<String> {
        self.read()
            .sessions
            .get(domain)
            .and_then(|creds| creds.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_session_id() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.session_id("www.meteor.com"), None);

        store.set_session_id("www.meteor.com", "abc123");
        assert_eq!(
            store.session_id("www.meteor.com"),
            Some("abc123".to_string())
        );
        assert_eq!(store.session_id("other.example.com"), None);
    }

    #[test]
    fn memory_store_keeps_token_and_session_separate() {
        let store = MemoryCredentialStore::new();
        store.set_session_token("www.meteor.com", "tok");
        store.set_session_id("www.meteor.com", "sess");

        assert_eq!(store.session_token("www.meteor.com"), Some("tok".to_string()));
        assert_eq!(store.session_id("www.meteor.com"), Some("sess".to_string()));
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.session_id("www.meteor.com"), None);
        store.set_session_id("www.meteor.com", "abc123");

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(
            reopened.session_id("www.meteor.com"),
            Some("abc123".to_string())
        );
        assert_eq!(reopened.session_token("www.meteor.com"), None);
    }

    #[test]
    fn file_store_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").expect("write");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.session_id("www.meteor.com"), None);
        store.set_session_id("www.meteor.com", "fresh");
        assert_eq!(
            store.session_id("www.meteor.com"),
            Some("fresh".to_string())
        );
    }
}
