//! Client side of the backend REST API.

mod auth;
mod client;
mod error;
mod payments;
mod types;

pub use auth::{
    AuthService, LOGIN_ENDPOINT, ME_ENDPOINT, PROFILE_ENDPOINT, REFRESH_SESSION_ENDPOINT,
    REGISTER_ENDPOINT,
};
pub use client::{
    ApiClient, ApiResponse, AppEnvironment, FETCH_FAILED, INVALID_JSON, NO_SERVER_MESSAGE,
    RequestContext, RequestOptions,
};
pub use error::ClientError;
pub use payments::{PAYMENTS_ENDPOINT, PaymentsService};
pub use types::{
    LoginResponse, Payment, PaymentPage, PaymentStatus, SignUpRequest, SignUpResponse, User,
};
