#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use jsonwebtoken::{EncodingKey, Header};
use paydash::api::{ApiClient, AppEnvironment, User};
use paydash::rate_limit::LoginRateLimit;
use paydash::session::{ACCESS_COOKIE_NAME, CookieStore, MemoryCookieStore, USER_COOKIE_NAME, now_secs, save_user_cookie};
use paydash::{ServerConfig, create_app_with_limit};
use serde_json::json;
use wiremock::MockServer;

pub const EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "correct-horse";

/// Unsigned-looking HS256 token; the app never verifies signatures.
pub fn mint_token(exp: u64, email: Option<&str>) -> String {
    let claims = match email {
        Some(email) => json!({ "exp": exp, "email": email, "sub": "user-1" }),
        None => json!({ "exp": exp, "sub": "user-1" }),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("Failed to mint token")
}

/// Access token valid for another hour.
pub fn fresh_token() -> String {
    mint_token(now_secs() + 3600, Some(EMAIL))
}

/// Access token already past its expiration.
pub fn expired_token() -> String {
    mint_token(now_secs().saturating_sub(60), Some(EMAIL))
}

pub fn user_json() -> serde_json::Value {
    json!({ "email": EMAIL, "firstName": "Ana", "lastName": "Lopez", "id": "user-1" })
}

pub fn test_user() -> User {
    serde_json::from_value(user_json()).expect("Invalid test user")
}

pub fn test_config(server: &MockServer) -> ServerConfig {
    ServerConfig {
        api: ApiClient::new(&format!("{}/", server.uri()), AppEnvironment::Development)
            .expect("Failed to create API client"),
        secure_cookies: false,
    }
}

pub fn create_test_app(server: &MockServer) -> Router {
    create_app_with_limit(&test_config(server), LoginRateLimit::with_quota(1000, 1000))
}

/// Encoded `user` cookie value for `user`, cached against `access_token`.
pub fn user_cookie_value(access_token: &str, user: &User) -> String {
    let mut store = MemoryCookieStore::new();
    store.set(ACCESS_COOKIE_NAME, access_token, now_secs() + 3600);
    save_user_cookie(&mut store, Some(user));
    store
        .get(USER_COOKIE_NAME)
        .expect("User cookie was not written")
}

/// `Cookie` header value from name/value pairs.
pub fn cookie_header(cookies: &[(&str, &str)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn get(uri: &str, cookies: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &str, cookies: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of the last `Set-Cookie` for `name`, empty when it was cleared.
pub fn set_cookie_value(set_cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies
        .iter()
        .rev()
        .find(|c| c.starts_with(&prefix))
        .map(|c| {
            c[prefix.len()..]
                .split(';')
                .next()
                .unwrap_or("")
                .to_string()
        })
}

/// `Expires` attribute of the last `Set-Cookie` for `name`.
pub fn set_cookie_expires(set_cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    set_cookies
        .iter()
        .rev()
        .find(|c| c.starts_with(&prefix))?
        .split("; ")
        .find_map(|attr| attr.strip_prefix("Expires="))
        .map(str::to_string)
}

pub fn location<B>(response: &Response<B>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
