//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, client key)
//!     → [gatekeeper decides: reject, redirect, or continue]
//!     → auth handlers or upstream proxy
//!     → response.rs (JSON error bodies, status mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{client_key, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
