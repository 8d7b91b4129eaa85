//! Request inspection.
//!
//! # Responsibilities
//! - Derive the client key used to bucket rate-limit counters
//! - Generate and propagate a unique request ID (UUID v4)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Client key comes from `X-Forwarded-For` only; requests without it share
//!   one "unknown" bucket. The gatekeeper is expected to sit behind a proxy
//!   that sets the header.

use axum::http::{HeaderMap, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header carrying the forwarded client address chain.
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Shared bucket for requests that carry no forwarded address.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client key for rate limiting: the first `X-Forwarded-For` entry.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Layer assigning an `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Request ID of `headers`, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
