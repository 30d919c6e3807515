//! Login and registration forms, and the sign-in exchange.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::{Position, Url};

use super::store::{CookieStore, SessionCredentials, save_auth_cookies};
use super::token::TokenError;
use crate::api::{AuthService, SignUpRequest};
use crate::gate::{DASHBOARD_PATH, LOGOUT_PATH, is_auth_page};

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";
pub const SHORT_PASSWORD_MESSAGE: &str = "Password must be at least 8 characters long.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";
pub const REQUIRED_MESSAGE: &str = "This field is required.";

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Per-field validation messages. Empty means the form is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.password.is_none()
    }
}

/// `local@domain.tld` with no whitespace, one `@`, and a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => {
            !host.is_empty() && !host.starts_with('.') && !host.ends_with('.') && tld.len() >= 2
        }
        None => false,
    }
}

fn validate_credentials(email: &str, password: &str, errors: &mut FieldErrors) {
    if !is_valid_email(email) {
        errors.email = Some(INVALID_EMAIL_MESSAGE);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.password = Some(SHORT_PASSWORD_MESSAGE);
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        validate_credentials(self.email.trim(), &self.password, &mut errors);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.first_name.trim().is_empty() {
            errors.first_name = Some(REQUIRED_MESSAGE);
        }
        if self.last_name.trim().is_empty() {
            errors.last_name = Some(REQUIRED_MESSAGE);
        }
        validate_credentials(self.email.trim(), &self.password, &mut errors);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn into_request(self) -> SignUpRequest {
        SignUpRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    /// The API refused the credentials (or was unreachable). The message is
    /// kept for logs only; users see [`INVALID_CREDENTIALS_MESSAGE`].
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("login returned an unusable token: {0}")]
    InvalidToken(#[from] TokenError),
}

/// Exchange credentials for a session and persist its cookies.
///
/// Nothing is written to `store` unless the exchange succeeds.
pub async fn sign_in<S: CookieStore + ?Sized>(
    auth: &AuthService,
    store: &mut S,
    form: &LoginForm,
) -> Result<SessionCredentials, SignInError> {
    let email = form.email.trim();
    let response = auth
        .login(email, &form.password)
        .await
        .into_result()
        .map_err(|e| {
            warn!(email = %email, error = %e, "Login rejected");
            SignInError::Rejected(e)
        })?;

    let creds = save_auth_cookies(store, &response, email)?;
    info!(email = %creds.account_email, "Signed in");
    Ok(creds)
}

/// Origin used to resolve `redirect` targets; only its path and query are kept.
const LOCAL_ORIGIN: &str = "http://paydash.invalid";

/// Where to send the user after signing in: a local `redirect` target, or the dashboard.
///
/// The target must be a path on this site with no control characters,
/// whitespace or backslashes. Auth pages and `/logout` are never targets.
pub fn post_login_target(redirect: Option<&str>) -> String {
    redirect
        .and_then(local_target)
        .unwrap_or_else(|| DASHBOARD_PATH.to_string())
}

fn local_target(target: &str) -> Option<String> {
    if !target.starts_with('/')
        || target.starts_with("//")
        || target
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || c == '\\')
    {
        return None;
    }

    let base = Url::parse(LOCAL_ORIGIN).ok()?;
    let url = base.join(target).ok()?;
    if url.origin() != base.origin() {
        return None;
    }
    if is_auth_page(url.path()) || url.path() == LOGOUT_PATH {
        return None;
    }
    Some(url[Position::BeforePath..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("ana.lopez+pay@mail.example.co"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("ana"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana@.com"));
        assert!(!is_valid_email("ana@example.c"));
        assert!(!is_valid_email("ana@@example.com"));
        assert!(!is_valid_email("ana lopez@example.com"));
    }

    #[test]
    fn test_login_form_errors() {
        let form = LoginForm {
            email: "nope".into(),
            password: "short".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.email, Some(INVALID_EMAIL_MESSAGE));
        assert_eq!(errors.password, Some(SHORT_PASSWORD_MESSAGE));

        let form = LoginForm {
            email: " ana@example.com ".into(),
            password: "12345678".into(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_register_form_requires_names() {
        let form = RegisterForm {
            first_name: " ".into(),
            last_name: String::new(),
            email: "ana@example.com".into(),
            password: "long-enough".into(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.first_name, Some(REQUIRED_MESSAGE));
        assert_eq!(errors.last_name, Some(REQUIRED_MESSAGE));
        assert_eq!(errors.email, None);
        assert_eq!(errors.password, None);
    }

    #[test]
    fn test_field_errors_serialize_only_set_fields() {
        let errors = FieldErrors {
            password: Some(INVALID_CREDENTIALS_MESSAGE),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({ "password": "Invalid email or password." })
        );
    }

    #[test]
    fn test_post_login_target() {
        assert_eq!(post_login_target(None), "/dashboard");
        assert_eq!(post_login_target(Some("/payments?page=2")), "/payments?page=2");
        assert_eq!(post_login_target(Some("https://evil.example")), "/dashboard");
        assert_eq!(post_login_target(Some("//evil.example")), "/dashboard");
        assert_eq!(post_login_target(Some("/login")), "/dashboard");
        assert_eq!(post_login_target(Some("/login/?x=1")), "/dashboard");
        assert_eq!(post_login_target(Some("/logout")), "/dashboard");
    }

    #[test]
    fn test_post_login_target_rejects_control_characters() {
        assert_eq!(post_login_target(Some("/\t/evil.example")), "/dashboard");
        assert_eq!(post_login_target(Some("/\n/evil.example")), "/dashboard");
        assert_eq!(post_login_target(Some("/\nevil")), "/dashboard");
        assert_eq!(post_login_target(Some("/\r\nSet-Cookie: x=1")), "/dashboard");
        assert_eq!(post_login_target(Some("/ /evil.example")), "/dashboard");
        assert_eq!(post_login_target(Some("/\\evil.example")), "/dashboard");
    }

    #[test]
    fn test_post_login_target_normalizes_path() {
        assert_eq!(post_login_target(Some("/payments/../settings")), "/settings");
        assert_eq!(post_login_target(Some("/payments/../login")), "/dashboard");
        assert_eq!(post_login_target(Some("/caf\u{e9}")), "/caf%C3%A9");
        assert_eq!(post_login_target(Some("/payments#top")), "/payments#top");
    }
}
