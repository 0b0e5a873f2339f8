//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     (HttpMethod, "/api/test/:value")
//!     → pattern.rs (normalize to "/api/test/{value}")
//!     → duplicate check per method + pattern
//!     → conflict check on the pattern shape (parameter names erased)
//!     → axum method router
//!
//! Request time:
//!     axum matches the pattern, fills route parameters
//!     → registered flow handler
//! ```
//!
//! # Design Decisions
//! - Routes are registered once at startup, immutable at runtime
//! - Colon-style and brace-style parameters are both accepted
//! - Registering the same method + path twice is an error, not a panic
//! - Patterns the router would refuse are rejected with an error as well

pub mod method;
pub mod pattern;

use thiserror::Error;

pub use method::HttpMethod;
pub use pattern::{normalize, shape};

/// Errors raised while registering a route.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {method}:{path} is already registered")]
    Duplicate { method: HttpMethod, path: String },

    #[error("route {method}:{path} conflicts with a registered route")]
    Conflict { method: HttpMethod, path: String },

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },
}
