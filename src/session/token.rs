//! Access token inspection.
//!
//! The dashboard never holds the backend's signing key, so claims are decoded
//! without verifying the signature. The backend remains the authority on
//! whether a token is valid; these claims only drive the refresh schedule.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer};

/// Refresh when the access token expires within this many seconds.
pub const REFRESH_THRESHOLD_SECS: u64 = 5 * 60;

/// Claims the dashboard reads from an access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiration time (Unix seconds, fractions dropped)
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<u64>,
    /// Account email
    #[serde(default)]
    pub email: Option<String>,
}

/// NumericDate may carry a fractional part; negative or non-finite values
/// count as missing.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.floor() as u64))
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to decode access token: {0}")]
    Decoding(#[from] jsonwebtoken::errors::Error),
    #[error("access token has no exp claim")]
    MissingExpiration,
}

/// Current Unix time in seconds.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Decode the payload of `token` without checking its signature or expiry.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let data = jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token)?;
    Ok(data.claims)
}

/// Expiration of `token`, if it decodes and carries an `exp` claim.
pub fn token_expiration(token: &str) -> Option<u64> {
    decode_claims(token).ok()?.exp
}

/// Whether `token` must be rotated at `now`.
///
/// True when the token expires within [`REFRESH_THRESHOLD_SECS`], is already
/// expired, or has no readable expiration.
pub fn should_refresh(token: &str, now: u64) -> bool {
    match token_expiration(token) {
        Some(exp) => exp < now.saturating_add(REFRESH_THRESHOLD_SECS),
        None => true,
    }
}
