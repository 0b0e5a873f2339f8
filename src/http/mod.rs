//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, request logging middleware)
//!     → endpoint.rs (matched route: build HandlerInput, run the flow)
//!         → request.rs (params, query, headers, body, request logger)
//!         → flow steps (flow_logger, http_response, user steps)
//!         → reply.rs (status, headers, body set by the steps)
//!     → Send to client
//! ```

pub mod endpoint;
pub mod input;
pub mod reply;
pub mod request;
pub mod response;
pub mod server;

pub use input::{HandlerInput, WithReply, WithRequest};
pub use reply::Reply;
pub use request::{IncomingRequest, X_REQUEST_ID};
pub use response::{http_response, http_response_with_headers};
pub use server::HttpServer;
