//! Request gatekeeper library.
//!
//! Fixed-window rate limiting for API routes, a credential guard for admin
//! routes, and a login attempt throttle, in front of an upstream site.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GatekeeperConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::gatekeeper::GatekeeperState;
