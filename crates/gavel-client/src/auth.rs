//! Authentication flows driving the session state machine.

use tracing::{info, warn};

use crate::api::AuthApi;
use crate::error::{ClientError, Result};
use crate::handoff::{HandoffStore, OTP_EMAIL_KEY};
use crate::session::{SessionEvent, SessionPhase, SessionStore};

/// Silent restore at startup. Always resolves the session out of
/// `Uninitialized`, whatever the refresh call returns.
pub async fn restore_session(api: &dyn AuthApi, store: &SessionStore) -> SessionPhase {
    match api.refresh().await {
        Ok(Some(grant)) => {
            info!(user = %grant.user.id, "Session restored");
            store.dispatch(SessionEvent::Restored(grant));
        }
        Ok(None) => {
            store.dispatch(SessionEvent::RestoreFailed);
        }
        Err(e) => {
            warn!(error = %e, "Session restore failed");
            store.dispatch(SessionEvent::RestoreFailed);
        }
    }
    store.snapshot().phase()
}

pub async fn login(
    api: &dyn AuthApi,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<()> {
    let grant = api.login(email, password).await?;
    info!(user = %grant.user.id, "Logged in");
    store.dispatch(SessionEvent::LoggedIn(grant));
    Ok(())
}

/// Drop the session locally, then tell the backend.
///
/// The backend call is best effort; its failure is logged and the user stays
/// signed out.
pub async fn logout(api: &dyn AuthApi, store: &SessionStore) {
    let token = store.access_token();
    store.dispatch(SessionEvent::LoggedOut);

    if let Some(token) = token {
        if let Err(e) = api.logout(&token).await {
            warn!(error = %e, "Backend logout failed");
        }
    }
}

/// Ask for a one-time code and remember the email for the verify step.
pub async fn request_otp(api: &dyn AuthApi, handoff: &HandoffStore, email: &str) -> Result<()> {
    api.request_otp(email).await?;
    handoff.put(OTP_EMAIL_KEY, email);
    Ok(())
}

/// Verify a one-time code for the email stored by [`request_otp`].
///
/// The email is only cleared once verification succeeds, so a mistyped code
/// can be retried.
pub async fn verify_otp(
    api: &dyn AuthApi,
    store: &SessionStore,
    handoff: &HandoffStore,
    code: &str,
) -> Result<()> {
    let email = handoff
        .peek(OTP_EMAIL_KEY)
        .ok_or(ClientError::MissingHandoff(OTP_EMAIL_KEY))?;

    let grant = api.verify_otp(&email, code).await?;
    handoff.take(OTP_EMAIL_KEY);
    info!(user = %grant.user.id, "Logged in with one-time code");
    store.dispatch(SessionEvent::LoggedIn(grant));
    Ok(())
}

/// Re-read the signed-in user's profile.
pub async fn reload_user(api: &dyn AuthApi, store: &SessionStore) -> Result<()> {
    let token = store.access_token().ok_or(ClientError::NotAuthenticated)?;
    match api.me(&token).await {
        Ok(user) => {
            store.dispatch(SessionEvent::LoggedIn(crate::api::AuthGrant {
                access_token: token,
                user,
            }));
            Ok(())
        }
        Err(e) => {
            handle_auth_failure(store, &e);
            Err(e)
        }
    }
}

/// Resolve the session to guest if `error` means the token is no good.
/// Returns whether the session was cleared.
pub fn handle_auth_failure(store: &SessionStore, error: &ClientError) -> bool {
    if !error.clears_session() {
        return false;
    }
    warn!(error = %error, "Access token rejected, signing out");
    store.dispatch(SessionEvent::AuthCleared);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthGrant;
    use async_trait::async_trait;
    use gavel_shared::{User, UserId, UserRole};
    use std::sync::Mutex;

    fn user(id: i64) -> User {
        User {
            id: UserId(id),
            email: format!("user{id}@example.com"),
            nickname: format!("user{id}"),
            role: UserRole::User,
        }
    }

    #[derive(Default)]
    struct MockAuthApi {
        refresh_grant: Option<AuthGrant>,
        refresh_fails: bool,
        valid_code: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockAuthApi {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthApi for MockAuthApi {
        async fn login(&self, email: &str, password: &str) -> Result<AuthGrant> {
            self.record(format!("login {email}"));
            if password != "correct" {
                return Err(ClientError::Api {
                    status: 400,
                    message: "Bad credentials".to_string(),
                });
            }
            Ok(AuthGrant {
                access_token: "login-token".to_string(),
                user: user(7),
            })
        }

        async fn refresh(&self) -> Result<Option<AuthGrant>> {
            self.record("refresh".to_string());
            if self.refresh_fails {
                return Err(ClientError::Api {
                    status: 503,
                    message: "Service Unavailable".to_string(),
                });
            }
            Ok(self.refresh_grant.clone())
        }

        async fn logout(&self, token: &str) -> Result<()> {
            self.record(format!("logout {token}"));
            Err(ClientError::Api {
                status: 500,
                message: "boom".to_string(),
            })
        }

        async fn request_otp(&self, email: &str) -> Result<()> {
            self.record(format!("request_otp {email}"));
            Ok(())
        }

        async fn verify_otp(&self, email: &str, code: &str) -> Result<AuthGrant> {
            self.record(format!("verify_otp {email} {code}"));
            if self.valid_code.as_deref() != Some(code) {
                return Err(ClientError::Api {
                    status: 400,
                    message: "Invalid code".to_string(),
                });
            }
            Ok(AuthGrant {
                access_token: "otp-token".to_string(),
                user: user(9),
            })
        }

        async fn me(&self, _token: &str) -> Result<User> {
            Err(ClientError::Unauthorized)
        }
    }

    #[tokio::test]
    async fn test_restore_failure_resolves_to_guest() {
        let api = MockAuthApi {
            refresh_fails: true,
            ..Default::default()
        };
        let store = SessionStore::new();

        let phase = restore_session(&api, &store).await;

        let session = store.snapshot();
        assert_eq!(phase, SessionPhase::Guest);
        assert!(session.user.is_none());
        assert!(session.access_token().is_none());
        assert!(!session.is_authenticated());
        assert!(!session.is_initializing);
    }

    #[tokio::test]
    async fn test_restore_with_grant() {
        let api = MockAuthApi {
            refresh_grant: Some(AuthGrant {
                access_token: "restored".to_string(),
                user: user(1),
            }),
            ..Default::default()
        };
        let store = SessionStore::new();

        assert_eq!(restore_session(&api, &store).await, SessionPhase::Authenticated);
        assert_eq!(store.access_token().as_deref(), Some("restored"));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_session() {
        let api = MockAuthApi::default();
        let store = SessionStore::new();
        restore_session(&api, &store).await;

        let err = login(&api, &store, "a@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 400, .. }));
        assert_eq!(store.snapshot().phase(), SessionPhase::Guest);

        login(&api, &store, "a@example.com", "correct").await.unwrap();
        assert_eq!(store.access_token().as_deref(), Some("login-token"));
    }

    #[tokio::test]
    async fn test_logout_discards_token_even_if_backend_fails() {
        let api = MockAuthApi::default();
        let store = SessionStore::new();
        login(&api, &store, "a@example.com", "correct").await.unwrap();

        logout(&api, &store).await;

        assert_eq!(store.snapshot().phase(), SessionPhase::Guest);
        assert!(api.calls().contains(&"logout login-token".to_string()));
    }

    #[tokio::test]
    async fn test_otp_flow_uses_handoff() {
        let api = MockAuthApi {
            valid_code: Some("123456".to_string()),
            ..Default::default()
        };
        let store = SessionStore::new();
        let handoff = HandoffStore::new();

        request_otp(&api, &handoff, "otp@example.com").await.unwrap();
        assert_eq!(handoff.peek(OTP_EMAIL_KEY).as_deref(), Some("otp@example.com"));

        // Wrong code keeps the email for a retry.
        assert!(verify_otp(&api, &store, &handoff, "000000").await.is_err());
        assert!(handoff.peek(OTP_EMAIL_KEY).is_some());

        verify_otp(&api, &store, &handoff, "123456").await.unwrap();
        assert!(handoff.peek(OTP_EMAIL_KEY).is_none());
        assert_eq!(store.access_token().as_deref(), Some("otp-token"));
        assert!(api
            .calls()
            .contains(&"verify_otp otp@example.com 123456".to_string()));
    }

    #[tokio::test]
    async fn test_verify_without_request_fails() {
        let api = MockAuthApi::default();
        let err = verify_otp(&api, &SessionStore::new(), &HandoffStore::new(), "1")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingHandoff(OTP_EMAIL_KEY)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_token_clears_session() {
        let api = MockAuthApi::default();
        let store = SessionStore::new();
        login(&api, &store, "a@example.com", "correct").await.unwrap();

        let err = reload_user(&api, &store).await.unwrap_err();
        assert!(err.clears_session());
        assert_eq!(store.snapshot().phase(), SessionPhase::Guest);

        assert!(!handle_auth_failure(&store, &ClientError::EmptyResponse));
    }
}
