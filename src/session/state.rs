//! Explicit session state machine.
//!
//! | from          | event          | to                       |
//! |---------------|----------------|--------------------------|
//! | Anonymous     | LoggedIn       | Authenticated            |
//! | Anonymous     | RefreshStarted | Refreshing               |
//! | Authenticated | RefreshStarted | Refreshing               |
//! | Authenticated | ProfileLoaded  | Authenticated (with user)|
//! | Authenticated | LoggedIn       | Authenticated            |
//! | Refreshing    | Refreshed      | Authenticated            |
//! | Refreshing    | RefreshFailed  | Anonymous                |
//! | any           | LoggedOut      | Anonymous                |

use std::fmt;

use crate::api::User;

/// An established session: the current access token and, once loaded, the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Session),
    /// A token exchange is in flight. Keeps the previous user for display.
    Refreshing { user: Option<User> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn(Session),
    RefreshStarted,
    /// New access token from a successful exchange.
    Refreshed(String),
    RefreshFailed,
    ProfileLoaded(User),
    LoggedOut,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid session transition: {event} while {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub event: &'static str,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated(_) => "authenticated",
            SessionState::Refreshing { .. } => "refreshing",
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(session) => session.user.as_ref(),
            SessionState::Refreshing { user } => user.as_ref(),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated(session) => Some(&session.access_token),
            _ => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::Authenticated(Session { user: Some(_), .. }))
    }

    /// Apply `event`, returning the next state.
    pub fn apply(self, event: SessionEvent) -> Result<SessionState, TransitionError> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (_, E::LoggedOut) => Ok(S::Anonymous),
            (S::Anonymous | S::Authenticated(_), E::LoggedIn(session)) => {
                Ok(S::Authenticated(session))
            }
            (S::Anonymous, E::RefreshStarted) => Ok(S::Refreshing { user: None }),
            (S::Authenticated(session), E::RefreshStarted) => {
                Ok(S::Refreshing { user: session.user })
            }
            (S::Authenticated(session), E::ProfileLoaded(user)) => {
                Ok(S::Authenticated(Session {
                    access_token: session.access_token,
                    user: Some(user),
                }))
            }
            (S::Refreshing { user }, E::Refreshed(access_token)) => {
                Ok(S::Authenticated(Session { access_token, user }))
            }
            (S::Refreshing { .. }, E::RefreshFailed) => Ok(S::Anonymous),
            (from, event) => Err(TransitionError {
                from: from.name(),
                event: event.name(),
            }),
        }
    }
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::LoggedIn(_) => "logged_in",
            SessionEvent::RefreshStarted => "refresh_started",
            SessionEvent::Refreshed(_) => "refreshed",
            SessionEvent::RefreshFailed => "refresh_failed",
            SessionEvent::ProfileLoaded(_) => "profile_loaded",
            SessionEvent::LoggedOut => "logged_out",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({ "email": "ana@example.com" })).unwrap()
    }

    fn session(token: &str) -> Session {
        Session {
            access_token: token.into(),
            user: None,
        }
    }

    #[test]
    fn test_login_then_profile() {
        let state = SessionState::Anonymous
            .apply(SessionEvent::LoggedIn(session("t1")))
            .unwrap();
        assert!(!state.is_logged_in());
        assert_eq!(state.access_token(), Some("t1"));

        let state = state.apply(SessionEvent::ProfileLoaded(user())).unwrap();
        assert!(state.is_logged_in());
        assert_eq!(state.user(), Some(&user()));
    }

    #[test]
    fn test_refresh_keeps_user() {
        let state = SessionState::Authenticated(Session {
            access_token: "old".into(),
            user: Some(user()),
        });
        let state = state.apply(SessionEvent::RefreshStarted).unwrap();
        assert_eq!(state.access_token(), None);
        assert_eq!(state.user(), Some(&user()));

        let state = state
            .apply(SessionEvent::Refreshed("new".into()))
            .unwrap();
        assert_eq!(state.access_token(), Some("new"));
        assert!(state.is_logged_in());
    }

    #[test]
    fn test_refresh_failure_is_terminal() {
        let state = SessionState::Anonymous
            .apply(SessionEvent::RefreshStarted)
            .unwrap()
            .apply(SessionEvent::RefreshFailed)
            .unwrap();
        assert_eq!(state, SessionState::Anonymous);
    }

    #[test]
    fn test_logout_from_anywhere() {
        for state in [
            SessionState::Anonymous,
            SessionState::Authenticated(session("t")),
            SessionState::Refreshing { user: Some(user()) },
        ] {
            assert_eq!(
                state.apply(SessionEvent::LoggedOut).unwrap(),
                SessionState::Anonymous
            );
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let err = SessionState::Anonymous
            .apply(SessionEvent::Refreshed("t".into()))
            .unwrap_err();
        assert_eq!(err.from, "anonymous");
        assert_eq!(err.event, "refreshed");

        assert!(
            SessionState::Refreshing { user: None }
                .apply(SessionEvent::RefreshStarted)
                .is_err()
        );
        assert!(
            SessionState::Anonymous
                .apply(SessionEvent::ProfileLoaded(user()))
                .is_err()
        );
    }
}
