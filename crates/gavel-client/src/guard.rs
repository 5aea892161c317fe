//! Route access decisions derived from the session.

use crate::session::{Session, SessionPhase};

/// What a route needs from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRequirement {
    /// Anyone.
    Public,
    /// A signed-in user.
    Authenticated,
    /// A signed-in admin.
    Admin,
    /// Only guests (login, signup, OTP screens).
    GuestOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session restore has not resolved yet; render a placeholder.
    Loading,
    Allow,
    RedirectToLogin,
    Forbidden,
    RedirectHome,
}

/// Decide whether the current session may enter a route.
///
/// An uninitialized session is never treated as a guest, so a page reload
/// does not bounce a signed-in user to the login screen.
pub fn evaluate_guard(session: &Session, requirement: GuardRequirement) -> GuardDecision {
    if requirement == GuardRequirement::Public {
        return GuardDecision::Allow;
    }

    match (session.phase(), requirement) {
        (SessionPhase::Uninitialized, _) => GuardDecision::Loading,
        (SessionPhase::Guest, GuardRequirement::GuestOnly) => GuardDecision::Allow,
        (SessionPhase::Guest, _) => GuardDecision::RedirectToLogin,
        (SessionPhase::Authenticated, GuardRequirement::GuestOnly) => GuardDecision::RedirectHome,
        (SessionPhase::Authenticated, GuardRequirement::Admin) => {
            if session.user.as_ref().is_some_and(|u| u.is_admin()) {
                GuardDecision::Allow
            } else {
                GuardDecision::Forbidden
            }
        }
        (SessionPhase::Authenticated, _) => GuardDecision::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AuthGrant;
    use crate::session::SessionEvent;
    use gavel_shared::{User, UserId, UserRole};

    fn signed_in(role: UserRole) -> Session {
        let mut session = Session::booting();
        session.apply(SessionEvent::LoggedIn(AuthGrant {
            access_token: "t".to_string(),
            user: User {
                id: UserId(1),
                email: "a@example.com".to_string(),
                nickname: "a".to_string(),
                role,
            },
        }));
        session
    }

    fn guest() -> Session {
        let mut session = Session::booting();
        session.apply(SessionEvent::RestoreFailed);
        session
    }

    #[test]
    fn test_uninitialized_is_loading() {
        let session = Session::booting();
        assert_eq!(
            evaluate_guard(&session, GuardRequirement::Authenticated),
            GuardDecision::Loading
        );
        assert_eq!(
            evaluate_guard(&session, GuardRequirement::GuestOnly),
            GuardDecision::Loading
        );
        assert_eq!(
            evaluate_guard(&session, GuardRequirement::Public),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_guest_decisions() {
        let session = guest();
        assert_eq!(
            evaluate_guard(&session, GuardRequirement::Authenticated),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            evaluate_guard(&session, GuardRequirement::Admin),
            GuardDecision::RedirectToLogin
        );
        assert_eq!(
            evaluate_guard(&session, GuardRequirement::GuestOnly),
            GuardDecision::Allow
        );
    }

    #[test]
    fn test_signed_in_decisions() {
        let user = signed_in(UserRole::User);
        assert_eq!(
            evaluate_guard(&user, GuardRequirement::Authenticated),
            GuardDecision::Allow
        );
        assert_eq!(
            evaluate_guard(&user, GuardRequirement::Admin),
            GuardDecision::Forbidden
        );
        assert_eq!(
            evaluate_guard(&user, GuardRequirement::GuestOnly),
            GuardDecision::RedirectHome
        );

        let admin = signed_in(UserRole::Admin);
        assert_eq!(
            evaluate_guard(&admin, GuardRequirement::Admin),
            GuardDecision::Allow
        );
    }
}
