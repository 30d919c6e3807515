//! Session cookie names, expiration policy and header formatting.

use axum::http::header;
use time::{OffsetDateTime, macros::format_description};

/// Short-lived access token, expires with its `exp` claim.
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Long-lived refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Account email paired with the refresh token.
pub const EMAIL_COOKIE_NAME: &str = "email";

/// Cached user profile (base64url JSON), expires with the access token.
pub const USER_COOKIE_NAME: &str = "user";

/// Every cookie that makes up a session, cleared together.
pub const SESSION_COOKIE_NAMES: [&str; 4] = [
    EMAIL_COOKIE_NAME,
    ACCESS_COOKIE_NAME,
    REFRESH_COOKIE_NAME,
    USER_COOKIE_NAME,
];

/// How far the refresh token and email outlive the access token.
pub const REFRESH_GRACE_SECS: u64 = 30 * 24 * 60 * 60;

/// Expiration of each session cookie, derived from the access token's `exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieExpirations {
    pub access: u64,
    pub refresh: u64,
    pub email: u64,
    pub user: u64,
}

impl CookieExpirations {
    pub fn for_access_expiry(access_exp: u64) -> Self {
        let long_lived = access_exp.saturating_add(REFRESH_GRACE_SECS);
        Self {
            access: access_exp,
            refresh: long_lived,
            email: long_lived,
            user: access_exp,
        }
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                if key.trim() == name {
                    return Some(value.trim());
                }
            }
        }
    }
    None
}

/// Parse every `name=value` pair of the Cookie header(s), in order.
pub fn parse_cookie_header(headers: &axum::http::HeaderMap) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            if let Some((key, value)) = part.trim().split_once('=') {
                pairs.push((key.trim().to_string(), value.trim().to_string()));
            }
        }
    }
    pairs
}

/// Format a Unix timestamp as an HTTP date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(unix_secs: u64) -> String {
    let format = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    let secs = i64::try_from(unix_secs).unwrap_or(i64::MAX);
    OffsetDateTime::from_unix_timestamp(secs)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .format(&format)
        .unwrap_or_else(|_| "Thu, 01 Jan 1970 00:00:00 GMT".to_string())
}

/// `Set-Cookie` value storing `value` until `expires_at`.
pub fn set_cookie_header(name: &str, value: &str, expires_at: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Expires={}{}",
        name,
        value,
        http_date(expires_at),
        secure
    )
}

/// `Set-Cookie` value deleting `name`.
pub fn clear_cookie_header(name: &str, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
        name, secure
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken=abc123"));

        assert_eq!(get_cookie(&headers, "accessToken"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; accessToken=abc123; refreshToken=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "accessToken"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "refreshToken"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
        assert_eq!(get_cookie(&headers, "email"), None);
    }

    #[test]
    fn test_get_cookie_across_headers() {
        let mut headers = axum::http::HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("foo=bar"));
        headers.append(header::COOKIE, HeaderValue::from_static("email=a%40b.co"));

        assert_eq!(get_cookie(&headers, "email"), Some("a%40b.co"));
    }

    #[test]
    fn test_get_cookie_no_header() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(get_cookie(&headers, "accessToken"), None);
    }

    #[test]
    fn test_parse_cookie_header_keeps_order() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=t ;broken"),
        );
        assert_eq!(
            parse_cookie_header(&headers),
            vec![
                ("theme".to_string(), "dark".to_string()),
                ("accessToken".to_string(), "t".to_string()),
            ]
        );
    }

    #[test]
    fn test_long_lived_cookies_outlive_access_by_thirty_days() {
        let exp = 1_700_000_000;
        let expirations = CookieExpirations::for_access_expiry(exp);
        assert_eq!(expirations.access, exp);
        assert_eq!(expirations.user, exp);
        assert_eq!(expirations.refresh, exp + 30 * 86_400);
        assert_eq!(expirations.email, exp + 30 * 86_400);
    }

    #[test]
    fn test_http_date() {
        assert_eq!(http_date(784_111_777), "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(http_date(0), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_set_cookie_header() {
        let cookie = set_cookie_header(ACCESS_COOKIE_NAME, "tok", 0, false);
        assert_eq!(
            cookie,
            "accessToken=tok; HttpOnly; SameSite=Strict; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
        assert!(set_cookie_header(ACCESS_COOKIE_NAME, "tok", 0, true).ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_header() {
        assert_eq!(
            clear_cookie_header(USER_COOKIE_NAME, false),
            "user=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0"
        );
    }
}
