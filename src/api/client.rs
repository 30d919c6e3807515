//! Generic REST client for the backend API.
//!
//! Every verb returns an [`ApiResponse`] instead of an error: transport
//! failures, non-2xx statuses and undecodable bodies are all folded into
//! `ok: false` with a message, so callers only ever branch on `ok`.
//!
//! The bearer token is not stored on the client. It travels in the
//! [`RequestContext`] passed to each call.

use std::time::Duration;

use reqwest::{Method, header};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};
use url::Url;

use super::error::ClientError;

/// Error returned when the request could not be sent or no response arrived.
pub const FETCH_FAILED: &str = "Fetch request failed";

/// Error returned when a response body is not the JSON we expected.
pub const INVALID_JSON: &str = "Invalid JSON response";

/// Error returned when an error body parsed but carried no message.
pub const NO_SERVER_MESSAGE: &str = "Server did not respond";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Deployment environment. Controls whether forwarded cookies are sent to the
/// API (cross-origin credential inclusion).
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnvironment {
    #[default]
    Development,
    Production,
}

impl AppEnvironment {
    pub fn include_credentials(self) -> bool {
        self == AppEnvironment::Production
    }
}

/// Per-call credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    token: Option<String>,
    cookies: Option<String>,
}

impl RequestContext {
    /// Context without a token (login, register, refresh-session).
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            cookies: None,
        }
    }

    /// Attach the caller's `Cookie` header, sent only when credentials are included.
    #[must_use]
    pub fn forwarding_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }
}

/// Extra query parameters and headers for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Uniform result of an API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Convert into a `Result`, using the error message (or a placeholder) on failure.
    pub fn into_result(self) -> Result<T, String> {
        match (self.ok, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| NO_SERVER_MESSAGE.to_string())),
        }
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// REST client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    environment: AppEnvironment,
}

impl ApiClient {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the URL is not absolute or the HTTP client fails to build.
    pub fn new(base_url: &str, environment: AppEnvironment) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "URL cannot be a base".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            base_url,
            http,
            environment,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        options: Option<&RequestOptions>,
    ) -> ApiResponse<T> {
        self.send::<T, ()>(Method::GET, ctx, endpoint, None, options)
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        body: &B,
        options: Option<&RequestOptions>,
    ) -> ApiResponse<T> {
        self.send(Method::POST, ctx, endpoint, Some(body), options)
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        body: &B,
        options: Option<&RequestOptions>,
    ) -> ApiResponse<T> {
        self.send(Method::PUT, ctx, endpoint, Some(body), options)
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        body: &B,
        options: Option<&RequestOptions>,
    ) -> ApiResponse<T> {
        self.send(Method::PATCH, ctx, endpoint, Some(body), options)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        endpoint: &str,
        options: Option<&RequestOptions>,
    ) -> ApiResponse<T> {
        self.send::<T, ()>(Method::DELETE, ctx, endpoint, None, options)
            .await
    }

    /// Join `endpoint` onto the base URL, keeping any base path.
    fn endpoint_url(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/{}", base, endpoint.trim_start_matches('/')))
    }

    async fn send<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        ctx: &RequestContext,
        endpoint: &str,
        body: Option<&B>,
        options: Option<&RequestOptions>,
    ) -> ApiResponse<T> {
        let mut url = match self.endpoint_url(endpoint) {
            Ok(url) => url,
            Err(e) => {
                warn!(endpoint, error = %e, "Invalid API URL");
                return ApiResponse::failure(FETCH_FAILED);
            }
        };

        if let Some(options) = options {
            if !options.query.is_empty() {
                url.query_pairs_mut().extend_pairs(options.query.iter());
            }
        }

        let mut request = self.http.request(method.clone(), url);

        if let Some(token) = ctx.token() {
            request = request.bearer_auth(token);
        }
        if self.environment.include_credentials() {
            if let Some(cookies) = ctx.cookies.as_deref() {
                request = request.header(header::COOKIE, cookies);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(options) = options {
            for (name, value) in &options.headers {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%method, endpoint, error = %e, "API request failed");
                return ApiResponse::failure(FETCH_FAILED);
            }
        };

        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%method, endpoint, error = %e, "Failed to read API response");
                return ApiResponse::failure(FETCH_FAILED);
            }
        };

        if !status.is_success() {
            let message = match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(body) => body.message.unwrap_or_else(|| NO_SERVER_MESSAGE.to_string()),
                Err(_) => INVALID_JSON.to_string(),
            };
            warn!(%method, endpoint, status = status.as_u16(), %message, "API error");
            return ApiResponse::failure(message);
        }

        let parsed = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_slice::<T>(b"null")
        } else {
            serde_json::from_slice::<T>(&bytes)
        };

        match parsed {
            Ok(data) => {
                debug!(%method, endpoint, status = status.as_u16(), "API response");
                ApiResponse::success(data)
            }
            Err(e) => {
                warn!(%method, endpoint, error = %e, "Unexpected API response body");
                ApiResponse::failure(INVALID_JSON)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_relative_url() {
        assert!(ApiClient::new("not a url", AppEnvironment::Development).is_err());
    }

    #[test]
    fn test_new_rejects_non_base_url() {
        assert!(ApiClient::new("mailto:ops@example.com", AppEnvironment::Development).is_err());
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let client = ApiClient::new("https://api.example.com/v1/", AppEnvironment::Development)
            .unwrap();
        let url = client.endpoint_url("auth/login").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/auth/login");

        let url = client.endpoint_url("/auth/me").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/auth/me");
    }

    #[test]
    fn test_context_ignores_empty_token() {
        let ctx = RequestContext::with_token("");
        assert_eq!(ctx.token(), None);

        let ctx = RequestContext::with_token("abc");
        assert_eq!(ctx.token(), Some("abc"));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ApiResponse::success(5).into_result(), Ok(5));
        assert_eq!(
            ApiResponse::<u8>::failure("nope").into_result(),
            Err("nope".to_string())
        );
    }

    #[test]
    fn test_production_includes_credentials() {
        assert!(AppEnvironment::Production.include_credentials());
        assert!(!AppEnvironment::Development.include_credentials());
    }
}
