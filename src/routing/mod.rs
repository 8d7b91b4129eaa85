//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (classify)
//!     → matcher.rs (evaluate prefix / exact conditions)
//!     → Return: RouteClass (rate_limited, auth_endpoint, protected, api)
//!
//! Compilation (at startup):
//!     AccessConfig
//!     → Compile matchers
//!     → Freeze as immutable RouteClassifier
//! ```
//!
//! # Design Decisions
//! - Classifier compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always yields the same class

pub mod matcher;
pub mod router;

pub use router::{RouteClass, RouteClassifier};
