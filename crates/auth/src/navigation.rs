//! "Go to login" navigation signal.
//!
//! The access-control layer never navigates itself; it hands the UI a
//! [`LoginRedirect`] and leaves the two transient keys behind for the login
//! page to pick up.

use serde::Serialize;
use tracing::warn;

use vitrine_core::{KeyValueStore, StorageError};

/// Storage key holding the location to restore after login.
pub const REDIRECT_KEY: &str = "auth-redirect";

/// Storage key holding the message the login page should display.
pub const MESSAGE_KEY: &str = "auth-message";

/// Request to send the user to the login entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRedirect {
    /// Explanation shown on the login page.
    pub message: String,
    /// Location the user was at, for post-login restoration.
    pub return_to: String,
}

impl LoginRedirect {
    pub fn new(message: impl Into<String>, return_to: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            return_to: return_to.into(),
        }
    }

    /// Write the transient redirect keys as JSON strings. Failures are logged, not raised.
    pub(crate) fn persist<S: KeyValueStore>(&self, store: &mut S) {
        for (key, value) in [(REDIRECT_KEY, &self.return_to), (MESSAGE_KEY, &self.message)] {
            let result = serde_json::to_string(value)
                .map_err(StorageError::from)
                .and_then(|raw| store.set(key, raw));
            if let Err(err) = result {
                warn!(key, error = %err, "failed to persist login redirect key");
            }
        }
    }

    /// Consume the transient redirect keys, if a redirect is pending.
    pub(crate) fn take<S: KeyValueStore>(store: &mut S) -> Option<Self> {
        let return_to = read_key(store, REDIRECT_KEY);
        let message = read_key(store, MESSAGE_KEY);

        for key in [REDIRECT_KEY, MESSAGE_KEY] {
            if let Err(err) = store.remove(key) {
                warn!(key, error = %err, "failed to clear login redirect key");
            }
        }

        match (message, return_to) {
            (None, None) => None,
            (message, return_to) => Some(Self {
                message: message.unwrap_or_default(),
                return_to: return_to.unwrap_or_else(|| "/".to_string()),
            }),
        }
    }
}

fn read_key<S: KeyValueStore>(store: &S, key: &str) -> Option<String> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(err) => {
            warn!(key, error = %err, "failed to read login redirect key");
            return None;
        }
    };
    match serde_json::from_str::<String>(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "login redirect key is not a JSON string; using it verbatim");
            Some(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::InMemoryStore;

    #[test]
    fn persist_then_take_consumes_keys() {
        let mut store = InMemoryStore::new();
        LoginRedirect::new("Session expired", "/dashboard#reports").persist(&mut store);
        assert_eq!(
            store.get(REDIRECT_KEY).unwrap().as_deref(),
            Some("\"/dashboard#reports\"")
        );
        assert_eq!(store.get(MESSAGE_KEY).unwrap().as_deref(), Some("\"Session expired\""));

        let taken = LoginRedirect::take(&mut store).unwrap();
        assert_eq!(taken.message, "Session expired");
        assert_eq!(taken.return_to, "/dashboard#reports");
        assert!(store.is_empty());
        assert_eq!(LoginRedirect::take(&mut store), None);
    }

    #[test]
    fn take_tolerates_plain_string_values() {
        let mut store = InMemoryStore::new();
        store.set(MESSAGE_KEY, "hello".to_string()).unwrap();

        let taken = LoginRedirect::take(&mut store).unwrap();
        assert_eq!(taken.message, "hello");
        assert_eq!(taken.return_to, "/");
    }
}
