//! Token refresh decision and exchange, shared by the request gate and the
//! client-side session controller.

use tracing::{info, warn};

use super::store::{
    CookieStore, SessionCredentials, StoredCredentials, clear_cookies, save_auth_cookies,
};
use super::token::{TokenError, should_refresh};
use crate::api::AuthService;

/// What to do with the stored credentials at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshDecision {
    /// Nothing usable is stored.
    NoSession,
    /// The access token has more than the refresh threshold left.
    UseToken(String),
    /// Exchange the refresh token for a new pair.
    Refresh {
        email: String,
        refresh_token: String,
    },
}

/// Pure refresh decision.
///
/// An access token inside the refresh window is treated as absent. A refresh
/// token is only usable together with its account email.
pub fn decide(stored: &StoredCredentials, now: u64) -> RefreshDecision {
    let token = stored
        .access_token
        .as_deref()
        .filter(|token| !should_refresh(token, now));

    if let Some(token) = token {
        return RefreshDecision::UseToken(token.to_string());
    }

    match (stored.refresh_token.as_deref(), stored.email.as_deref()) {
        (Some(refresh_token), Some(email)) => RefreshDecision::Refresh {
            email: email.to_string(),
            refresh_token: refresh_token.to_string(),
        },
        _ => RefreshDecision::NoSession,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The API refused the exchange or could not be reached.
    #[error("refresh-session failed: {0}")]
    Rejected(String),
    #[error("refresh-session returned an unusable token: {0}")]
    InvalidToken(#[from] TokenError),
}

/// Exchange `refresh_token` and persist the rotated credentials in `store`.
pub async fn exchange<S: CookieStore + ?Sized>(
    auth: &AuthService,
    store: &mut S,
    email: &str,
    refresh_token: &str,
) -> Result<SessionCredentials, RefreshError> {
    let response = auth
        .refresh_session(email, refresh_token)
        .await
        .into_result()
        .map_err(RefreshError::Rejected)?;
    Ok(save_auth_cookies(store, &response, email)?)
}

/// Result of [`establish_token`].
#[derive(Debug)]
pub enum TokenOutcome {
    /// The stored access token is still good.
    Current(String),
    /// A new pair was obtained and persisted.
    Refreshed(SessionCredentials),
    /// No session; the store has been cleared.
    Absent,
    /// The exchange failed; the store has been cleared.
    RefreshFailed(RefreshError),
}

impl TokenOutcome {
    pub fn token(&self) -> Option<&str> {
        match self {
            TokenOutcome::Current(token) => Some(token),
            TokenOutcome::Refreshed(creds) => Some(&creds.access_token),
            TokenOutcome::Absent | TokenOutcome::RefreshFailed(_) => None,
        }
    }

    pub fn was_refreshed(&self) -> bool {
        matches!(self, TokenOutcome::Refreshed(_))
    }
}

/// Read the stored credentials, apply [`decide`] and run the exchange if needed.
///
/// Any exchange failure is terminal: every session cookie is cleared.
pub async fn establish_token<S: CookieStore + ?Sized>(
    auth: &AuthService,
    store: &mut S,
    now: u64,
) -> TokenOutcome {
    let stored = StoredCredentials::read(&*store);
    match decide(&stored, now) {
        RefreshDecision::UseToken(token) => TokenOutcome::Current(token),
        RefreshDecision::NoSession => {
            clear_cookies(store);
            TokenOutcome::Absent
        }
        RefreshDecision::Refresh {
            email,
            refresh_token,
        } => match exchange(auth, store, &email, &refresh_token).await {
            Ok(creds) => {
                info!(email = %creds.account_email, "Session refreshed");
                TokenOutcome::Refreshed(creds)
            }
            Err(e) => {
                warn!(email = %email, error = %e, "Session refresh failed");
                clear_cookies(store);
                TokenOutcome::RefreshFailed(e)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};

    fn token(exp: u64) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            &serde_json::json!({ "exp": exp }),
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap()
    }

    fn stored(access: Option<String>, refresh: Option<&str>, email: Option<&str>) -> StoredCredentials {
        StoredCredentials {
            access_token: access,
            refresh_token: refresh.map(String::from),
            email: email.map(String::from),
        }
    }

    #[test]
    fn test_nothing_stored() {
        assert_eq!(decide(&stored(None, None, None), 0), RefreshDecision::NoSession);
    }

    #[test]
    fn test_fresh_token_is_used() {
        let now = 10_000;
        let t = token(now + 3600);
        assert_eq!(
            decide(&stored(Some(t.clone()), Some("r"), Some("a@b.co")), now),
            RefreshDecision::UseToken(t)
        );
    }

    #[test]
    fn test_expiring_token_triggers_refresh() {
        let now = 10_000;
        assert_eq!(
            decide(&stored(Some(token(now + 60)), Some("r"), Some("a@b.co")), now),
            RefreshDecision::Refresh {
                email: "a@b.co".into(),
                refresh_token: "r".into(),
            }
        );
    }

    #[test]
    fn test_missing_access_token_triggers_refresh() {
        assert!(matches!(
            decide(&stored(None, Some("r"), Some("a@b.co")), 0),
            RefreshDecision::Refresh { .. }
        ));
    }

    #[test]
    fn test_refresh_token_needs_email() {
        assert_eq!(
            decide(&stored(None, Some("r"), None), 0),
            RefreshDecision::NoSession
        );
    }

    #[test]
    fn test_expiring_token_without_refresh_token() {
        let now = 10_000;
        assert_eq!(
            decide(&stored(Some(token(now + 30)), None, Some("a@b.co")), now),
            RefreshDecision::NoSession
        );
    }
}
