//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → gatekeeper.rs (classify, then run the stages below)
//!     → rate_limit.rs (per-client fixed window on API routes)
//!     → access_control.rs (credential check on protected routes)
//!     → Pass to auth handlers or the upstream proxy
//!
//! Login:
//!     → login_throttle.rs (per-client attempt window)
//!     → password.rs (constant-time digest compare)
//!     → credential.rs + cookie.rs (issue and deliver)
//! ```
//!
//! # Design Decisions
//! - Counters are in-memory and per instance; a restart forgets them
//! - Fail closed: any credential problem is treated as no credential
//! - No trust in client input beyond the first forwarded hop

pub mod access_control;
pub mod cookie;
pub mod credential;
pub mod gatekeeper;
pub mod login_throttle;
pub mod password;
pub mod rate_limit;
pub mod window;
