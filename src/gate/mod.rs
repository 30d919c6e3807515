//! Request gate run before every page.
//!
//! Applies the same refresh decision as the client-side controller, then:
//! - no usable session on a gated page: redirect to `/login?redirect=<path>`
//! - a session on an auth page: redirect to `/dashboard`
//! - otherwise: pass through with rotated cookies written both to the
//!   response and to the forwarded request, plus a [`CurrentSession`] extension.

mod paths;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, info, warn};

use crate::api::{AuthService, RequestContext, User};
use crate::session::{
    CookieStore, RequestCookieJar, clear_cookies, establish_token, now_secs, read_user,
    save_user_cookie,
};

pub use paths::{
    AUTH_PAGES, DASHBOARD_PATH, LOGIN_PATH, LOGOUT_PATH, is_auth_page, is_gated, login_redirect,
};

#[derive(Clone)]
pub struct GateState {
    pub auth: AuthService,
    pub secure_cookies: bool,
}

/// Identity resolved by the gate, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub access_token: String,
    pub user: User,
}

impl CurrentSession {
    /// API context for calls made on behalf of this session.
    pub fn context(&self) -> RequestContext {
        RequestContext::with_token(self.access_token.clone())
    }
}

/// Resolve the session carried by `jar`, refreshing it and loading the user as needed.
///
/// A failed profile lookup makes the token unusable and clears the session.
pub async fn resolve_session<S: CookieStore + ?Sized>(
    auth: &AuthService,
    jar: &mut S,
) -> Option<CurrentSession> {
    let outcome = establish_token(auth, jar, now_secs()).await;
    let access_token = outcome.token()?.to_string();

    if let Some(user) = read_user(&*jar) {
        if outcome.was_refreshed() {
            save_user_cookie(jar, Some(&user));
        }
        return Some(CurrentSession { access_token, user });
    }

    let ctx = RequestContext::with_token(access_token.clone());
    match auth.me(&ctx).await.into_result() {
        Ok(user) => {
            save_user_cookie(jar, Some(&user));
            Some(CurrentSession { access_token, user })
        }
        Err(e) => {
            warn!(error = %e, "Failed to load user for session");
            clear_cookies(jar);
            None
        }
    }
}

/// Gate middleware. Mount with `middleware::from_fn_with_state`.
pub async fn session_gate(
    State(state): State<GateState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if !is_gated(&path) {
        return next.run(request).await;
    }

    let mut jar = RequestCookieJar::from_headers(request.headers());
    let session = resolve_session(&state.auth, &mut jar).await;
    let auth_page = is_auth_page(&path);

    let mut response = match session {
        None if !auth_page => {
            let original = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or(path);
            info!(path = %original, "Redirecting to login");
            Redirect::to(&login_redirect(&original)).into_response()
        }
        Some(session) if auth_page => {
            debug!(email = %session.user.email, path = %path, "Already signed in");
            Redirect::to(DASHBOARD_PATH).into_response()
        }
        session => {
            if jar.has_changes() {
                jar.apply_to_request(request.headers_mut());
            }
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
    };

    // Handler writes (login, logout) go last so they override the gate's.
    let headers = response.headers_mut();
    let handler_cookies: Vec<_> = headers.get_all(header::SET_COOKIE).iter().cloned().collect();
    headers.remove(header::SET_COOKIE);
    jar.apply_to_response(headers, state.secure_cookies);
    for cookie in handler_cookies {
        headers.append(header::SET_COOKIE, cookie);
    }
    response
}
