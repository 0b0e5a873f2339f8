//! Async flow pipelines bound to HTTP routes.
//!
//! A [`Flow`] is a chain of async steps. This crate registers flows as
//! route handlers, logs from inside them and writes their results to the
//! HTTP reply:
//!
//! ```no_run
//! use http_flows::{
//!     chain, endpoint, flow_logger, http_response, Flow, HandlerInput, HttpServer, Log, LogLevel,
//!     ServerConfig,
//! };
//!
//! # fn build() -> Result<(), http_flows::RouteError> {
//! let mut server = HttpServer::new(ServerConfig::default());
//! let params_log = Flow::from_fn(|input: HandlerInput| async move {
//!     Ok(Log::new("GET params", input.request.params.clone()))
//! });
//!
//! let flow = chain::<HandlerInput>()
//!     .add(flow_logger(server.log(), LogLevel::Info, params_log))
//!     .add(http_response(200, "request.params"));
//!
//! endpoint::get(&mut server, "/api/test/:value", flow)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod flow;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use flow::{chain, Flow, FlowError};
pub use http::{
    endpoint, http_response, http_response_with_headers, HandlerInput, HttpServer, Reply,
};
pub use lifecycle::Shutdown;
pub use observability::{flow_logger, Log, LogLevel, Logger};
pub use routing::{HttpMethod, RouteError};
