//! Ephemeral auth storage
//!
//! Typed, fail-soft accessors over a [`SessionStore`] for the values that
//! must survive the redirect round trip to the identity provider: the PKCE
//! code verifier, the CSRF state, the pre-login path, and a last-activity
//! timestamp.
//!
//! Fail-soft: storage reads and writes can fail in restricted environments,
//! and a broken store must not break the auth flow. Failed writes are logged
//! and dropped; failed reads are logged and treated as absent. The security
//! backstop is CSRF validation failing closed when the stored state is
//! missing.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::traits::SessionStore;

/// Storage key for the PKCE code verifier.
pub const KEY_CODE_VERIFIER: &str = "auth_code_verifier";

/// Storage key for the CSRF state value.
pub const KEY_STATE: &str = "auth_state";

/// Storage key for the path to restore after the callback completes.
pub const KEY_REDIRECT_PATH: &str = "auth_redirect_path";

/// Storage key for the last-activity timestamp (epoch milliseconds).
pub const KEY_LAST_ACTIVITY: &str = "auth_last_activity";

/// Probe key used by [`AuthStorage::is_available`].
const KEY_AVAILABILITY_PROBE: &str = "auth_storage_probe";

/// Error raised by a [`SessionStore`] implementation.
#[derive(Debug, Error)]
#[error("session storage failure: {reason}")]
pub struct StorageError {
    pub reason: String,
}

impl StorageError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Fail-soft wrapper owning the crate's view of ephemeral storage.
#[derive(Clone)]
pub struct AuthStorage {
    store: Arc<dyn SessionStore>,
}

impl AuthStorage {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Whether the underlying store accepts writes at all.
    ///
    /// Writes and removes a probe key. Hosts can surface this before starting
    /// a login that would silently fail at the callback.
    #[must_use]
    pub fn is_available(&self) -> bool {
        match self.store.set(KEY_AVAILABILITY_PROBE, "1") {
            Ok(()) => {
                let _ = self.store.remove(KEY_AVAILABILITY_PROBE);
                true
            }
            Err(error) => {
                warn!(%error, "session storage unavailable");
                false
            }
        }
    }

    pub fn set_code_verifier(&self, verifier: &str) {
        self.set(KEY_CODE_VERIFIER, verifier);
    }

    #[must_use]
    pub fn code_verifier(&self) -> Option<String> {
        self.get(KEY_CODE_VERIFIER)
    }

    pub fn set_state(&self, state: &str) {
        self.set(KEY_STATE, state);
    }

    #[must_use]
    pub fn state(&self) -> Option<String> {
        self.get(KEY_STATE)
    }

    pub fn set_redirect_path(&self, path: &str) {
        self.set(KEY_REDIRECT_PATH, path);
    }

    #[must_use]
    pub fn redirect_path(&self) -> Option<String> {
        self.get(KEY_REDIRECT_PATH)
    }

    /// Record the current instant as the last user activity.
    pub fn touch_last_activity(&self) {
        self.set(KEY_LAST_ACTIVITY, &Utc::now().timestamp_millis().to_string());
    }

    /// Last recorded activity, if present and parseable.
    #[must_use]
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        let raw = self.get(KEY_LAST_ACTIVITY)?;
        let millis: i64 = raw.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    /// Remove every auth key. Safe to call when nothing is stored.
    pub fn clear_all(&self) {
        for key in [KEY_CODE_VERIFIER, KEY_STATE, KEY_REDIRECT_PATH, KEY_LAST_ACTIVITY] {
            if let Err(error) = self.store.remove(key) {
                warn!(key, %error, "failed to remove auth storage key");
            }
        }
        debug!("cleared auth storage");
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(error) = self.store.set(key, value) {
            warn!(key, %error, "failed to write auth storage key");
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "failed to read auth storage key");
                None
            }
        }
    }
}

/// In-memory [`SessionStore`] for hosts whose process survives the redirect
/// (webview shells) and for tests.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: parking_lot::Mutex<std::collections::HashMap<String, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
