//! Shared error handling for page handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::session::FieldErrors;

/// Page error type with automatic response conversion.
#[derive(Debug)]
pub enum PageError {
    BadRequest(String),
    Unauthorized(String),
    /// The backend API failed; the message is logged, not shown.
    Upstream(String),
    /// Form validation failed, rendered as `422` with per-field messages.
    Invalid(FieldErrors),
}

impl PageError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn upstream(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Upstream(context.into())
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Field errors plus an optional toast, as returned by form submissions.
#[derive(Debug, Serialize)]
pub struct FormErrorBody {
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toast: Option<&'static str>,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PageError::Invalid(errors) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(FormErrorBody {
                        errors,
                        toast: None,
                    }),
                )
                    .into_response();
            }
            PageError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            PageError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            PageError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
