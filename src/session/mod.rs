//! Session lifecycle: token inspection, cookie persistence, refresh and sign-in.
//!
//! Access tokens are short-lived JWTs issued by the backend; refresh tokens are
//! opaque and only usable together with the account email. Both the request
//! gate and the client-side [`SessionController`] use [`decide`] and
//! [`exchange`], so a session is refreshed under the same rules wherever it is
//! observed.

mod controller;
pub mod cookie;
mod login;
mod refresh;
mod state;
mod store;
pub mod token;

pub use controller::{
    LoginOutcome, Navigation, REFRESH_INTERVAL, SessionController, SessionSnapshot,
    spawn_refresh_scheduler, spawn_refresh_scheduler_every,
};
pub use cookie::{
    ACCESS_COOKIE_NAME, CookieExpirations, EMAIL_COOKIE_NAME, REFRESH_COOKIE_NAME,
    REFRESH_GRACE_SECS, SESSION_COOKIE_NAMES, USER_COOKIE_NAME, get_cookie,
};
pub use login::{
    FieldErrors, INVALID_CREDENTIALS_MESSAGE, INVALID_EMAIL_MESSAGE, LoginForm,
    MIN_PASSWORD_LENGTH, REQUIRED_MESSAGE, RegisterForm, SHORT_PASSWORD_MESSAGE, SignInError,
    is_valid_email, post_login_target, sign_in,
};
pub use refresh::{RefreshDecision, RefreshError, TokenOutcome, decide, establish_token, exchange};
pub use state::{Session, SessionEvent, SessionState, TransitionError};
pub use store::{
    CookieStore, MemoryCookieStore, RequestCookieJar, SessionCredentials, StoredCredentials,
    clear_cookies, read_user, save_auth_cookies, save_user_cookie,
};
pub use token::{REFRESH_THRESHOLD_SECS, TokenClaims, TokenError, now_secs, should_refresh};
