//! In-memory session state.
//!
//! The access token lives only here. Every change goes through
//! [`Session::apply`]; [`SessionStore`] wraps it in a `watch` channel so
//! feeds can react to login and logout.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use gavel_shared::User;

use crate::api::AuthGrant;

/// Coarse session phase, as route guards see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Restore attempt still running.
    Uninitialized,
    Authenticated,
    Guest,
}

/// Inputs of the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Restored(AuthGrant),
    RestoreFailed,
    LoggedIn(AuthGrant),
    LoggedOut,
    /// The backend rejected the token.
    AuthCleared,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    access_token: Option<String>,
    pub is_initializing: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("is_initializing", &self.is_initializing)
            .finish()
    }
}

impl Session {
    /// State at process start, before the restore attempt resolves.
    pub fn booting() -> Self {
        Self {
            user: None,
            access_token: None,
            is_initializing: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_initializing {
            SessionPhase::Uninitialized
        } else if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Guest
        }
    }

    /// Transition function. Returns whether anything changed.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let before = self.clone();
        match event {
            SessionEvent::Restored(grant) => {
                // A login that finished first wins over a late restore.
                if self.is_initializing {
                    self.grant(grant);
                }
                self.is_initializing = false;
            }
            SessionEvent::RestoreFailed => {
                if self.is_initializing {
                    self.clear();
                }
                self.is_initializing = false;
            }
            SessionEvent::LoggedIn(grant) => {
                self.grant(grant);
                self.is_initializing = false;
            }
            SessionEvent::LoggedOut | SessionEvent::AuthCleared => {
                self.clear();
                self.is_initializing = false;
            }
        }
        *self != before
    }

    fn grant(&mut self, grant: AuthGrant) {
        self.access_token = Some(grant.access_token);
        self.user = Some(grant.user);
    }

    fn clear(&mut self) {
        self.access_token = None;
        self.user = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::booting()
    }
}

/// Shared handle to the process's session.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::booting());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn dispatch(&self, event: SessionEvent) {
        let label = event_label(&event);
        let changed = self.tx.send_if_modified(|session| session.apply(event));
        if changed {
            info!(event = label, phase = ?self.tx.borrow().phase(), "Session updated");
        } else {
            debug!(event = label, "Session event had no effect");
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().access_token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }
}

fn event_label(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::Restored(_) => "restored",
        SessionEvent::RestoreFailed => "restore_failed",
        SessionEvent::LoggedIn(_) => "logged_in",
        SessionEvent::LoggedOut => "logged_out",
        SessionEvent::AuthCleared => "auth_cleared",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_shared::{UserId, UserRole};

    fn grant(id: i64, token: &str) -> AuthGrant {
        AuthGrant {
            access_token: token.to_string(),
            user: User {
                id: UserId(id),
                email: format!("user{id}@example.com"),
                nickname: format!("user{id}"),
                role: UserRole::User,
            },
        }
    }

    #[test]
    fn test_boot_is_uninitialized() {
        let session = Session::booting();
        assert_eq!(session.phase(), SessionPhase::Uninitialized);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_restore_failure_resolves_to_guest() {
        let mut session = Session::booting();
        assert!(session.apply(SessionEvent::RestoreFailed));

        assert!(session.user.is_none());
        assert!(session.access_token().is_none());
        assert!(!session.is_authenticated());
        assert!(!session.is_initializing);
        assert_eq!(session.phase(), SessionPhase::Guest);
    }

    #[test]
    fn test_restore_success() {
        let mut session = Session::booting();
        session.apply(SessionEvent::Restored(grant(1, "t1")));
        assert_eq!(session.phase(), SessionPhase::Authenticated);
        assert_eq!(session.access_token(), Some("t1"));
    }

    #[test]
    fn test_login_replaces_token_and_logout_discards_it() {
        let mut session = Session::booting();
        session.apply(SessionEvent::Restored(grant(1, "t1")));
        session.apply(SessionEvent::LoggedIn(grant(2, "t2")));
        assert_eq!(session.access_token(), Some("t2"));
        assert_eq!(session.user.as_ref().map(|u| u.id), Some(UserId(2)));

        session.apply(SessionEvent::LoggedOut);
        assert_eq!(session.phase(), SessionPhase::Guest);
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_late_restore_does_not_override_login() {
        let mut session = Session::booting();
        session.apply(SessionEvent::LoggedIn(grant(2, "fresh")));
        assert!(!session.apply(SessionEvent::Restored(grant(1, "stale"))));
        assert_eq!(session.access_token(), Some("fresh"));

        assert!(!session.apply(SessionEvent::RestoreFailed));
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut session = Session::booting();
        session.apply(SessionEvent::LoggedIn(grant(1, "very-secret")));
        assert!(!format!("{session:?}").contains("very-secret"));
    }

    #[tokio::test]
    async fn test_store_notifies_subscribers() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.dispatch(SessionEvent::LoggedIn(grant(1, "t1")));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());

        // No-op events do not wake subscribers.
        store.dispatch(SessionEvent::RestoreFailed);
        assert!(!rx.has_changed().unwrap());

        store.dispatch(SessionEvent::AuthCleared);
        assert_eq!(store.snapshot().phase(), SessionPhase::Guest);
        assert!(store.access_token().is_none());
    }
}
