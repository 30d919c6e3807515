//! Construction errors for the API client.

/// The only failures [`ApiClient`](super::ApiClient) surfaces as errors.
/// Everything that happens per request is folded into an `ApiResponse`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}
