//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → broadcast to subscribers → server stops accepting,
//!     drains in-flight flows, returns
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
