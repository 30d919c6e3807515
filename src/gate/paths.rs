//! Route surface seen by the gate.

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGOUT_PATH: &str = "/logout";

/// Public pages. Signed-in users are sent to the dashboard instead.
pub const AUTH_PAGES: [&str; 4] = ["/login", "/register", "/forgot-password", "/reset-password"];

/// Prefixes and files the gate never intercepts.
const UNGATED_PREFIXES: [&str; 2] = ["/api/", "/static/"];
const UNGATED_FILES: [&str; 4] = ["/api", "/favicon.ico", "/robots.txt", "/sitemap.xml"];

pub fn is_auth_page(path: &str) -> bool {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    AUTH_PAGES.contains(&path)
}

/// Whether a request path goes through the gate.
pub fn is_gated(path: &str) -> bool {
    !UNGATED_FILES.contains(&path) && !UNGATED_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// `/login?redirect=<original>` with the original path and query encoded.
pub fn login_redirect(original: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
    format!("{}?redirect={}", LOGIN_PATH, encoded)
}
