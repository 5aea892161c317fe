//! Short-lived values carried from one step of a flow to the next.
//!
//! Holds things like the email typed on the OTP request screen until the
//! verify step runs. Never holds credentials.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Key under which the OTP flow keeps the email being verified.
pub const OTP_EMAIL_KEY: &str = "otp.email";

#[derive(Clone, Default)]
pub struct HandoffStore {
    values: Arc<Mutex<HashMap<&'static str, String>>>,
}

impl HandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &'static str, value: impl Into<String>) {
        self.lock().insert(key, value.into());
    }

    /// Read without clearing.
    pub fn peek(&self, key: &'static str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Read and clear.
    pub fn take(&self, key: &'static str) -> Option<String> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<&'static str, String>> {
        // Every write is a single map call, so a poisoned map is still consistent.
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears() {
        let store = HandoffStore::new();
        store.put(OTP_EMAIL_KEY, "ann@example.com");

        assert_eq!(store.peek(OTP_EMAIL_KEY).as_deref(), Some("ann@example.com"));
        assert_eq!(store.take(OTP_EMAIL_KEY).as_deref(), Some("ann@example.com"));
        assert!(store.peek(OTP_EMAIL_KEY).is_none());
        assert!(store.take(OTP_EMAIL_KEY).is_none());
    }

    #[test]
    fn test_clones_share_values() {
        let store = HandoffStore::new();
        let other = store.clone();
        store.put(OTP_EMAIL_KEY, "a");
        other.put(OTP_EMAIL_KEY, "b");
        assert_eq!(store.peek(OTP_EMAIL_KEY).as_deref(), Some("b"));

        other.clear();
        assert!(store.peek(OTP_EMAIL_KEY).is_none());
    }
}
