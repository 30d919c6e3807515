//! Cookie storage backends and the session cookie operations on top of them.
//!
//! Two stores implement [`CookieStore`]:
//! - [`MemoryCookieStore`]: a client-side jar that drops entries once they expire.
//! - [`RequestCookieJar`]: built from an incoming request's `Cookie` header,
//!   recording writes so they can be sent back as `Set-Cookie` and forwarded
//!   to downstream handlers.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderValue, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use tracing::warn;

use super::cookie::{
    ACCESS_COOKIE_NAME, CookieExpirations, EMAIL_COOKIE_NAME, REFRESH_COOKIE_NAME,
    SESSION_COOKIE_NAMES, USER_COOKIE_NAME, clear_cookie_header, parse_cookie_header,
    set_cookie_header,
};
use super::token::{TokenError, decode_claims, now_secs, token_expiration};
use crate::api::{LoginResponse, User};

/// Key/value cookie storage with per-entry expiration.
pub trait CookieStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str, expires_at: u64);
    fn remove(&mut self, name: &str);
}

/// Credentials persisted by a successful login or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    pub access_token: String,
    pub refresh_token: String,
    pub account_email: String,
    pub expirations: CookieExpirations,
}

/// Raw session cookies as currently stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub email: Option<String>,
}

impl StoredCredentials {
    pub fn read<S: CookieStore + ?Sized>(store: &S) -> Self {
        let non_empty = |name: &str| store.get(name).filter(|v| !v.is_empty());
        Self {
            access_token: non_empty(ACCESS_COOKIE_NAME),
            refresh_token: non_empty(REFRESH_COOKIE_NAME),
            email: non_empty(EMAIL_COOKIE_NAME),
        }
    }
}

/// Persist a token pair. The email comes from the access token's `email`
/// claim, falling back to `fallback_email` (the address used to sign in or
/// refresh).
pub fn save_auth_cookies<S: CookieStore + ?Sized>(
    store: &mut S,
    response: &LoginResponse,
    fallback_email: &str,
) -> Result<SessionCredentials, TokenError> {
    let claims = decode_claims(&response.access_token)?;
    let exp = claims.exp.ok_or(TokenError::MissingExpiration)?;
    let account_email = claims
        .email
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| fallback_email.to_string());
    let expirations = CookieExpirations::for_access_expiry(exp);

    store.set(EMAIL_COOKIE_NAME, &account_email, expirations.email);
    store.set(ACCESS_COOKIE_NAME, &response.access_token, expirations.access);
    store.set(REFRESH_COOKIE_NAME, &response.refresh_token, expirations.refresh);

    Ok(SessionCredentials {
        access_token: response.access_token.clone(),
        refresh_token: response.refresh_token.clone(),
        account_email,
        expirations,
    })
}

/// Cache `user` until the current access token expires, or drop the cache when `None`.
pub fn save_user_cookie<S: CookieStore + ?Sized>(store: &mut S, user: Option<&User>) {
    let Some(user) = user else {
        store.remove(USER_COOKIE_NAME);
        return;
    };
    let Some(exp) = store
        .get(ACCESS_COOKIE_NAME)
        .and_then(|token| token_expiration(&token))
    else {
        return;
    };
    match serde_json::to_vec(user) {
        Ok(json) => store.set(USER_COOKIE_NAME, &URL_SAFE_NO_PAD.encode(json), exp),
        Err(e) => warn!(error = %e, "Failed to serialize user for cookie"),
    }
}

/// The cached user, only trusted while an access token is present.
pub fn read_user<S: CookieStore + ?Sized>(store: &S) -> Option<User> {
    store.get(ACCESS_COOKIE_NAME).filter(|t| !t.is_empty())?;
    let encoded = store.get(USER_COOKIE_NAME)?;
    let json = URL_SAFE_NO_PAD.decode(encoded.as_bytes()).ok()?;
    serde_json::from_slice(&json).ok()
}

/// Remove every session cookie.
pub fn clear_cookies<S: CookieStore + ?Sized>(store: &mut S) {
    for name in SESSION_COOKIE_NAMES {
        store.remove(name);
    }
}

// =============================================================================
// Memory store
// =============================================================================

#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
    expires_at: u64,
}

/// In-process cookie jar. Expired entries read as absent.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieStore {
    cookies: HashMap<String, StoredCookie>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expiration of `name`, if stored (expired or not).
    pub fn expires_at(&self, name: &str) -> Option<u64> {
        self.cookies.get(name).map(|c| c.expires_at)
    }

    pub fn is_empty(&self) -> bool {
        let now = now_secs();
        self.cookies.values().all(|c| c.expires_at <= now)
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        let now = now_secs();
        self.cookies
            .get(name)
            .filter(|c| c.expires_at > now)
            .map(|c| c.value.clone())
    }

    fn set(&mut self, name: &str, value: &str, expires_at: u64) {
        self.cookies.insert(
            name.to_string(),
            StoredCookie {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    fn remove(&mut self, name: &str) {
        self.cookies.remove(name);
    }
}

// =============================================================================
// Request jar
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum CookieWrite {
    Set { value: String, expires_at: u64 },
    Remove,
}

/// Cookies of one incoming request plus the writes made while handling it.
#[derive(Debug, Clone, Default)]
pub struct RequestCookieJar {
    incoming: Vec<(String, String)>,
    writes: Vec<(String, CookieWrite)>,
}

impl RequestCookieJar {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            incoming: parse_cookie_header(headers),
            writes: Vec::new(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.writes.is_empty()
    }

    /// `Set-Cookie` values for every write, in order.
    pub fn set_cookie_headers(&self, secure: bool) -> Vec<String> {
        self.writes
            .iter()
            .map(|(name, write)| match write {
                CookieWrite::Set { value, expires_at } => {
                    set_cookie_header(name, value, *expires_at, secure)
                }
                CookieWrite::Remove => clear_cookie_header(name, secure),
            })
            .collect()
    }

    /// Append the pending writes to a response's headers.
    pub fn apply_to_response(&self, headers: &mut HeaderMap, secure: bool) {
        for cookie in self.set_cookie_headers(secure) {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => warn!(error = %e, "Dropping unencodable Set-Cookie"),
            }
        }
    }

    /// `Cookie` header reflecting the incoming cookies with writes applied.
    pub fn cookie_header(&self) -> String {
        let now = now_secs();
        let mut current: Vec<(String, String)> = self.incoming.clone();
        for (name, write) in &self.writes {
            current.retain(|(key, _)| key != name);
            if let CookieWrite::Set { value, expires_at } = write {
                if *expires_at > now {
                    current.push((name.clone(), value.clone()));
                }
            }
        }
        current
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Replace the request's `Cookie` header with [`cookie_header`](Self::cookie_header).
    pub fn apply_to_request(&self, headers: &mut HeaderMap) {
        headers.remove(header::COOKIE);
        let cookies = self.cookie_header();
        if cookies.is_empty() {
            return;
        }
        match HeaderValue::from_str(&cookies) {
            Ok(value) => {
                headers.insert(header::COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Dropping unencodable Cookie header"),
        }
    }

    fn last_write(&self, name: &str) -> Option<&CookieWrite> {
        self.writes
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, write)| write)
    }
}

impl CookieStore for RequestCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        match self.last_write(name) {
            Some(CookieWrite::Set { value, expires_at }) if *expires_at > now_secs() => {
                Some(value.clone())
            }
            Some(_) => None,
            None => self
                .incoming
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
        }
    }

    fn set(&mut self, name: &str, value: &str, expires_at: u64) {
        self.writes.retain(|(key, _)| key != name);
        self.writes.push((
            name.to_string(),
            CookieWrite::Set {
                value: value.to_string(),
                expires_at,
            },
        ));
    }

    /// Drops any pending write; a deletion is only sent for cookies the
    /// browser actually holds.
    fn remove(&mut self, name: &str) {
        self.writes.retain(|(key, _)| key != name);
        if self.incoming.iter().any(|(key, _)| key == name) {
            self.writes.push((name.to_string(), CookieWrite::Remove));
        }
    }
}
