//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Flow steps and the request middleware produce:
//!     → logger.rs (levelled records, request-scoped or instance-wide)
//!     → LogSink (tracing events by default, memory capture in tests)
//!
//! Process start:
//!     → logging.rs (tracing subscriber from [logging] config)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing, pretty output for development
//! - Request ID flows through every record emitted for a request
//! - Log content is JSON so flows can attach arbitrary fields

pub mod flow_logger;
pub mod logger;
pub mod logging;

pub use flow_logger::{flow_logger, Log};
pub use logger::{LogLevel, LogRecord, LogSink, Logger, MemorySink, TracingSink};
