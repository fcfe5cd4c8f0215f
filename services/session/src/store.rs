//! Durable mirror of the session in client storage
//!
//! The session is kept as two string entries: the bearer token and the
//! JSON-serialized user profile. Storage failures never escape this module;
//! they are logged and the session keeps working from memory.

use std::sync::Arc;

use common::storage::KeyValueStore;
use tracing::warn;

use crate::models::{PersistedRecord, UserProfile};

/// Storage key of the bearer token
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key of the serialized user profile
pub const USER_KEY: &str = "auth_user";

/// Persisted session record accessor
///
/// Reads are public; writes are reserved to the session controller.
#[derive(Clone)]
pub struct PersistedSessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl PersistedSessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Read the persisted record; absent when either entry is missing or
    /// unreadable
    pub fn get(&self) -> Option<PersistedRecord> {
        let token = self.read(TOKEN_KEY)?;
        let raw_user = self.read(USER_KEY)?;

        match serde_json::from_str::<UserProfile>(&raw_user) {
            Ok(user) => Some(PersistedRecord { token, user }),
            Err(e) => {
                warn!("Ignoring unreadable persisted user profile: {}", e);
                None
            }
        }
    }

    /// Persist both entries
    pub(crate) fn set(&self, record: &PersistedRecord) {
        let user = match serde_json::to_string(&record.user) {
            Ok(user) => user,
            Err(e) => {
                warn!("Failed to serialize user profile for storage: {}", e);
                return;
            }
        };

        if let Err(e) = self.backend.set(TOKEN_KEY, &record.token) {
            warn!("Failed to persist session token: {}", e);
        }
        if let Err(e) = self.backend.set(USER_KEY, &user) {
            warn!("Failed to persist user profile: {}", e);
        }
    }

    /// Remove both entries
    pub(crate) fn clear(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.backend.delete(key) {
                warn!("Failed to remove persisted entry {}: {}", key, e);
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(Some(value)) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read persisted entry {}: {}", key, e);
                None
            }
        }
    }
}
