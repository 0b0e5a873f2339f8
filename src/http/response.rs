//! Terminal flow step writing the HTTP reply.
//!
//! # Responsibilities
//! - Apply a fixed status code and header set to the reply
//! - Resolve the body by dotted path against the whole flow input
//! - Send it and pass the input on unchanged
//!
//! # Design Decisions
//! - Status and headers are bound when the step is built; the body is
//!   resolved per request
//! - A path that resolves to nothing sends an empty body, not an error

use std::sync::Arc;

use serde::Serialize;

use crate::flow::{path, Flow, FlowError};
use crate::http::input::WithReply;

/// Build a step replying with `status` and the value at `path_to_body`.
pub fn http_response<I>(status: u16, path_to_body: &str) -> Flow<I, I>
where
    I: WithReply + Serialize + Send + 'static,
{
    http_response_with_headers(status, path_to_body, Vec::<(String, String)>::new())
}

/// Like [`http_response`], also setting `headers` on every reply.
pub fn http_response_with_headers<I, H, K, V>(
    status: u16,
    path_to_body: &str,
    headers: H,
) -> Flow<I, I>
where
    I: WithReply + Serialize + Send + 'static,
    H: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let body_path: Arc<str> = Arc::from(path_to_body);
    let headers: Arc<Vec<(String, String)>> = Arc::new(
        headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
    );

    Flow::new("httpResponse", move |input: I| {
        let body_path = Arc::clone(&body_path);
        let headers = Arc::clone(&headers);
        async move {
            write_reply(&input, status, &body_path, &headers)?;
            Ok(input)
        }
    })
}

fn write_reply<I>(
    input: &I,
    status: u16,
    body_path: &str,
    headers: &[(String, String)],
) -> Result<(), FlowError>
where
    I: WithReply + Serialize,
{
    let payload = path::resolve(input, body_path)?;
    if payload.is_none() {
        tracing::debug!(path = body_path, "response body path resolved to nothing");
    }

    input
        .reply()
        .status(status)?
        .headers(headers.iter().map(|(k, v)| (k.as_str(), v.as_str())))?
        .send_value(payload)
}
