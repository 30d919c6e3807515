//! Auth endpoints of the backend API.

use super::client::{ApiClient, ApiResponse, RequestContext};
use super::types::{
    LoginRequest, LoginResponse, RefreshSessionRequest, SignUpRequest, SignUpResponse, User,
};

pub const LOGIN_ENDPOINT: &str = "auth/login";
pub const REGISTER_ENDPOINT: &str = "auth/register";
pub const PROFILE_ENDPOINT: &str = "auth/profile";
pub const ME_ENDPOINT: &str = "auth/me";
pub const REFRESH_SESSION_ENDPOINT: &str = "auth/refresh-session";

/// Thin wrapper over [`ApiClient`] exposing the auth operations.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResponse<LoginResponse> {
        self.client
            .post(
                &RequestContext::anonymous(),
                LOGIN_ENDPOINT,
                &LoginRequest { email, password },
                None,
            )
            .await
    }

    pub async fn register(&self, request: &SignUpRequest) -> ApiResponse<SignUpResponse> {
        self.client
            .post(&RequestContext::anonymous(), REGISTER_ENDPOINT, request, None)
            .await
    }

    /// Profile of the bearer of `ctx`.
    pub async fn profile(&self, ctx: &RequestContext) -> ApiResponse<User> {
        self.client.get(ctx, PROFILE_ENDPOINT, None).await
    }

    /// Bearer-authenticated identity lookup used by the request gate.
    pub async fn me(&self, ctx: &RequestContext) -> ApiResponse<User> {
        self.client.get(ctx, ME_ENDPOINT, None).await
    }

    /// Exchange a refresh token and its account email for a new token pair.
    pub async fn refresh_session(
        &self,
        email: &str,
        refresh_token: &str,
    ) -> ApiResponse<LoginResponse> {
        self.client
            .post(
                &RequestContext::anonymous(),
                REFRESH_SESSION_ENDPOINT,
                &RefreshSessionRequest {
                    email,
                    refresh_token,
                },
                None,
            )
            .await
    }
}
