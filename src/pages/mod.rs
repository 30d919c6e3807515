//! Page routes served behind the session gate.

mod auth;
mod dashboard;
mod error;

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};

use crate::api::{AuthService, PaymentsService};
use crate::gate::{DASHBOARD_PATH, LOGIN_PATH, LOGOUT_PATH};
use crate::rate_limit::{LoginRateLimit, rate_limit_login};

pub use auth::RedirectQuery;
pub use dashboard::{DashboardView, PaymentsQuery, PaymentsView};
pub use error::{ErrorBody, FormErrorBody, PageError};

#[derive(Clone)]
pub struct PagesState {
    pub auth: AuthService,
    pub payments: PaymentsService,
    pub secure_cookies: bool,
}

pub fn router(state: PagesState, login_limit: LoginRateLimit) -> Router {
    Router::new()
        .route("/", get(Redirect::to(DASHBOARD_PATH)))
        .route(
            LOGIN_PATH,
            post(auth::submit_login)
                .route_layer(middleware::from_fn_with_state(login_limit, rate_limit_login))
                .get(auth::login_page),
        )
        .route(
            "/register",
            get(auth::register_page).post(auth::submit_register),
        )
        .route("/forgot-password", get(auth::forgot_password_page))
        .route("/reset-password", get(auth::reset_password_page))
        .route(LOGOUT_PATH, post(auth::logout))
        .route(DASHBOARD_PATH, get(dashboard::dashboard))
        .route("/payments", get(dashboard::payments))
        .with_state(state)
}
