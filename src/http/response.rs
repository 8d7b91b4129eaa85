//! Response handling.
//!
//! # Responsibilities
//! - Map gatekeeper outcomes to HTTP status codes and JSON bodies
//! - Keep denial bodies generic so they reveal nothing about which check failed
//!
//! # Design Decisions
//! - Every error body has the shape `{"error": "<message>"}`
//! - Rate-limit rejections carry `Retry-After`
//! - Upstream timeouts result in 504 Gateway Timeout

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors the gatekeeper answers directly.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    #[error("Too many login attempts. Please try again later.")]
    LoginThrottled,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Invalid request body")]
    InvalidBody,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Authentication failed")]
    Internal,

    #[error("Upstream request failed")]
    BadGateway,

    #[error("Upstream request timed out")]
    GatewayTimeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } | ApiError::LoginThrottled => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::PasswordRequired | ApiError::InvalidBody => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
