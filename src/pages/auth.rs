//! Public auth pages and the sign-in, sign-up and sign-out submissions.

use axum::{
    Form, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use super::PagesState;
use super::error::{FormErrorBody, PageError};
use crate::api::RequestContext;
use crate::gate::LOGIN_PATH;
use crate::session::{
    FieldErrors, INVALID_CREDENTIALS_MESSAGE, LoginForm, RegisterForm, RequestCookieJar,
    clear_cookies, post_login_target, save_user_cookie, sign_in,
};

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\">\
         <title>{title} | Paydash</title></head>\n<body>\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n"
    ))
}

const LOGIN_BODY: &str = r#"<form method="post">
<label>Email <input name="email" type="email" autocomplete="email" required></label>
<label>Password <input name="password" type="password" autocomplete="current-password" minlength="8" required></label>
<button type="submit">Sign in</button>
</form>
<p><a href="/forgot-password">Forgot your password?</a> <a href="/register">Create an account</a></p>"#;

const REGISTER_BODY: &str = r#"<form method="post">
<label>First name <input name="firstName" required></label>
<label>Last name <input name="lastName" required></label>
<label>Email <input name="email" type="email" autocomplete="email" required></label>
<label>Password <input name="password" type="password" autocomplete="new-password" minlength="8" required></label>
<button type="submit">Create account</button>
</form>
<p><a href="/login">Already have an account?</a></p>"#;

const FORGOT_PASSWORD_BODY: &str = r#"<p>Enter the email you signed up with and we will send you a reset link.</p>
<form>
<label>Email <input name="email" type="email" autocomplete="email" required></label>
<button type="submit">Send reset link</button>
</form>
<p><a href="/login">Back to sign in</a></p>"#;

const RESET_PASSWORD_BODY: &str = r#"<form>
<label>New password <input name="password" type="password" autocomplete="new-password" minlength="8" required></label>
<button type="submit">Reset password</button>
</form>
<p><a href="/login">Back to sign in</a></p>"#;

pub async fn login_page() -> Html<String> {
    page("Sign in", LOGIN_BODY)
}

pub async fn register_page() -> Html<String> {
    page("Create account", REGISTER_BODY)
}

pub async fn forgot_password_page() -> Html<String> {
    page("Forgot password", FORGOT_PASSWORD_BODY)
}

pub async fn reset_password_page() -> Html<String> {
    page("Reset password", RESET_PASSWORD_BODY)
}

#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub redirect: Option<String>,
}

/// `POST /login`: validate, sign in, cache the profile and redirect.
pub async fn submit_login(
    State(state): State<PagesState>,
    Query(query): Query<RedirectQuery>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    form.validate().map_err(PageError::Invalid)?;

    let mut jar = RequestCookieJar::from_headers(&headers);
    let creds = match sign_in(&state.auth, &mut jar, &form).await {
        Ok(creds) => creds,
        Err(_) => {
            let body = FormErrorBody {
                errors: FieldErrors {
                    password: Some(INVALID_CREDENTIALS_MESSAGE),
                    ..Default::default()
                },
                toast: Some(INVALID_CREDENTIALS_MESSAGE),
            };
            return Ok((StatusCode::UNAUTHORIZED, Json(body)).into_response());
        }
    };

    let ctx = RequestContext::with_token(creds.access_token);
    match state.auth.profile(&ctx).await.into_result() {
        Ok(user) => save_user_cookie(&mut jar, Some(&user)),
        Err(e) => warn!(error = %e, "Signed in but failed to load profile"),
    }

    let target = post_login_target(query.redirect.as_deref());
    let mut response = Redirect::to(&target).into_response();
    jar.apply_to_response(response.headers_mut(), state.secure_cookies);
    Ok(response)
}

/// `POST /register`: create the account, then send the user to sign in.
pub async fn submit_register(
    State(state): State<PagesState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    form.validate().map_err(PageError::Invalid)?;

    let request = form.into_request();
    let response = state
        .auth
        .register(&request)
        .await
        .into_result()
        .map_err(|e| {
            warn!(email = %request.email, error = %e, "Registration rejected");
            PageError::bad_request(e)
        })?;

    info!(email = %request.email, message = ?response.message, "Account registered");
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

/// `POST /logout`: clear every session cookie. Harmless without a session.
pub async fn logout(State(state): State<PagesState>, headers: HeaderMap) -> Response {
    let mut jar = RequestCookieJar::from_headers(&headers);
    clear_cookies(&mut jar);
    info!("Logged out");

    let mut response = Redirect::to(LOGIN_PATH).into_response();
    jar.apply_to_response(response.headers_mut(), state.secure_cookies);
    response
}
