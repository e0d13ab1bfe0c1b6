//! Durable client-side key-value storage.
//!
//! The browser build of ShopLive keeps its session in `localStorage`; this
//! SDK mirrors that contract with a small string key-value store. Two
//! implementations ship: a JSON file written atomically for real use, and an
//! in-memory map for tests and throwaway sessions.
//!
//! Credential writes flow only through the session manager (login, refresh,
//! logout); everything else reads the store fresh per request.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::SecretString;
use thiserror::Error;

use shoplive_core::CredentialPair;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the customer id.
pub const CUSTOMER_ID_KEY: &str = "customerId";
/// Storage key for the display username.
pub const USERNAME_KEY: &str = "username";
/// Storage key for the wishlist. Independent of the session lifecycle.
pub const WISHLIST_KEY: &str = "wishlist";

const CREDENTIAL_KEYS: [&str; 4] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    CUSTOMER_ID_KEY,
    USERNAME_KEY,
];

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value storage, the `localStorage` analog.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the underlying storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries (test helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// JSON-file-backed store.
///
/// The whole map is rewritten on every mutation via a temp file + rename so
/// a crash mid-write never leaves a half-written session file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if an existing file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|source| {
                StoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                });
            }
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// CredentialStore
// =============================================================================

/// Typed credential access over any [`KeyValueStore`].
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for components that share it (e.g. wishlist).
    #[must_use]
    pub fn raw(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    /// Load the full credential pair, or `None` if any piece is missing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure.
    pub fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
        let access_token = self.store.get(ACCESS_TOKEN_KEY)?;
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY)?;
        let customer_id = self.store.get(CUSTOMER_ID_KEY)?;
        let username = self.store.get(USERNAME_KEY)?;

        match (access_token, refresh_token, customer_id, username) {
            (Some(access_token), Some(refresh_token), Some(customer_id), Some(username)) => {
                Ok(Some(CredentialPair {
                    access_token: SecretString::from(access_token),
                    refresh_token: SecretString::from(refresh_token),
                    customer_id,
                    username,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Persist a freshly issued credential pair (login path).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure.
    pub fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, pair.access_token())?;
        self.store.set(REFRESH_TOKEN_KEY, pair.refresh_token())?;
        self.store.set(CUSTOMER_ID_KEY, &pair.customer_id)?;
        self.store.set(USERNAME_KEY, &pair.username)
    }

    /// Read the current access token, fresh from storage.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure.
    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    /// Read the current refresh token, fresh from storage.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure.
    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Read the stored customer id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure.
    pub fn customer_id(&self) -> Result<Option<String>, StoreError> {
        self.store.get(CUSTOMER_ID_KEY)
    }

    /// Overwrite only the access token (silent-refresh path).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure.
    pub fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, token)
    }

    /// Remove the credential keys. The wishlist and any other non-session
    /// keys are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure.
    pub fn clear(&self) -> Result<(), StoreError> {
        for key in CREDENTIAL_KEYS {
            self.store.remove(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_pair() -> CredentialPair {
        CredentialPair {
            access_token: SecretString::from("at"),
            refresh_token: SecretString::from("rt"),
            customer_id: "c1".to_string(),
            username: "ada".to_string(),
        }
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        // Removing an absent key is a no-op
        store.remove("k").unwrap();
    }

    #[test]
    fn test_credential_store_save_load_clear() {
        let credentials = CredentialStore::new(Arc::new(MemoryStore::new()));
        assert!(credentials.load().unwrap().is_none());

        credentials.save(&sample_pair()).unwrap();
        let loaded = credentials.load().unwrap().unwrap();
        assert_eq!(loaded.access_token(), "at");
        assert_eq!(loaded.username, "ada");

        credentials.clear().unwrap();
        assert!(credentials.load().unwrap().is_none());
        assert_eq!(credentials.access_token().unwrap(), None);
    }

    #[test]
    fn test_clear_leaves_wishlist_alone() {
        let raw = Arc::new(MemoryStore::new());
        let credentials = CredentialStore::new(Arc::clone(&raw) as Arc<dyn KeyValueStore>);
        credentials.save(&sample_pair()).unwrap();
        raw.set(WISHLIST_KEY, r#"["p1","p2"]"#).unwrap();

        credentials.clear().unwrap();

        assert_eq!(
            raw.get(WISHLIST_KEY).unwrap().as_deref(),
            Some(r#"["p1","p2"]"#)
        );
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn test_partial_credentials_load_as_none() {
        let raw = Arc::new(MemoryStore::new());
        raw.set(ACCESS_TOKEN_KEY, "at").unwrap();
        let credentials = CredentialStore::new(raw);
        assert!(credentials.load().unwrap().is_none());
    }

    #[test]
    fn test_set_access_token_only_touches_access_token() {
        let credentials = CredentialStore::new(Arc::new(MemoryStore::new()));
        credentials.save(&sample_pair()).unwrap();
        credentials.set_access_token("fresh").unwrap();

        let loaded = credentials.load().unwrap().unwrap();
        assert_eq!(loaded.access_token(), "fresh");
        assert_eq!(loaded.refresh_token(), "rt");
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("k", "v").unwrap();
        }

        // Reopen and observe the persisted value
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
