//! Rate limiting for login submissions.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down credential
//! stuffing against the backend.

use std::net::SocketAddr;
use std::{num::NonZeroU32, sync::Arc};

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use tracing::warn;

use crate::pages::ErrorBody;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: u32 = 1;
const LOGIN_BURST: u32 = 5;

pub const TOO_MANY_ATTEMPTS: &str = "Too many sign-in attempts. Please wait before trying again.";

/// Shared limiter for `POST /login`.
#[derive(Clone)]
pub struct LoginRateLimit {
    limiter: Arc<IpLimiter>,
}

impl LoginRateLimit {
    /// 5 attempts per IP, refilled at one per second.
    pub fn new() -> Self {
        Self::with_quota(LOGIN_PER_SEC, LOGIN_BURST)
    }

    /// Custom quota. Zero values are raised to one.
    pub fn with_quota(per_second: u32, burst: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(RateLimiter::keyed(
                Quota::per_second(per_second).allow_burst(burst),
            )),
        }
    }

    pub fn check(&self, ip: &str) -> bool {
        self.limiter.check_key(&ip.to_string()).is_ok()
    }
}

impl Default for LoginRateLimit {
    fn default() -> Self {
        Self::new()
    }
}

/// Client address used as the limiter key.
///
/// Prefers the peer address from `ConnectInfo`, then the first hop of
/// `X-Forwarded-For`. Requests with neither share one bucket.
pub fn client_ip(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware for rate limiting login submissions.
pub async fn rate_limit_login(
    State(limit): State<LoginRateLimit>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    if limit.check(&ip) {
        return next.run(request).await;
    }

    warn!(ip = %ip, "Login rate limit exceeded");
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody {
            error: TOO_MANY_ATTEMPTS.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_burst_then_reject() {
        let limit = LoginRateLimit::with_quota(1, 2);
        assert!(limit.check("10.0.0.1"));
        assert!(limit.check("10.0.0.1"));
        assert!(!limit.check("10.0.0.1"));
        assert!(limit.check("10.0.0.2"));
    }

    #[test]
    fn test_client_ip_sources() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&request), "203.0.113.7");

        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(client_ip(&request), "127.0.0.1");

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&request), "unknown");
    }
}
