//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → listener stops accepting → in-flight requests drain
//!             → window sweeper exits
//! ```
//!
//! # Design Decisions
//! - Ordered startup lives in main: config and secrets first, listener last
//! - Counter tables are not persisted; shutdown simply drops them

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
