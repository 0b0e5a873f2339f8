//! Route registration for flows.
//!
//! # Responsibilities
//! - Bind a flow to one method + path on an [`HttpServer`]
//! - Build the per-request [`HandlerInput`] and run the flow once
//! - Turn the sent reply, or the flow's failure, into the HTTP response
//!
//! # Design Decisions
//! - The flow's output is discarded; replying is the flow's job
//! - A flow that finishes without sending is a failure (500)
//! - A step failing after the reply was sent is logged; the reply stands
//! - Failures are logged through the request-scoped logger

use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::json;

use crate::flow::{Flow, FlowError};
use crate::http::input::HandlerInput;
use crate::http::reply::{error_response, Reply};
use crate::http::request::IncomingRequest;
use crate::http::server::HttpServer;
use crate::observability::Logger;
use crate::routing::{HttpMethod, RouteError};

/// Register `flow` for `method` requests on `path`.
pub fn register<Out>(
    server: &mut HttpServer,
    method: HttpMethod,
    path: &str,
    flow: Flow<HandlerInput, Out>,
) -> Result<(), RouteError>
where
    Out: Send + 'static,
{
    let instance = server.log().clone();
    let body_limit = server.config().limits.body_limit_bytes;

    server.route(method, path, move |request: Request| {
        let flow = flow.clone();
        let instance = instance.clone();
        async move { handle(&flow, &instance, body_limit, request).await }
    })?;

    Ok(())
}

pub fn get<Out: Send + 'static>(
    server: &mut HttpServer,
    path: &str,
    flow: Flow<HandlerInput, Out>,
) -> Result<(), RouteError> {
    register(server, HttpMethod::Get, path, flow)
}

pub fn post<Out: Send + 'static>(
    server: &mut HttpServer,
    path: &str,
    flow: Flow<HandlerInput, Out>,
) -> Result<(), RouteError> {
    register(server, HttpMethod::Post, path, flow)
}

pub fn put<Out: Send + 'static>(
    server: &mut HttpServer,
    path: &str,
    flow: Flow<HandlerInput, Out>,
) -> Result<(), RouteError> {
    register(server, HttpMethod::Put, path, flow)
}

pub fn patch<Out: Send + 'static>(
    server: &mut HttpServer,
    path: &str,
    flow: Flow<HandlerInput, Out>,
) -> Result<(), RouteError> {
    register(server, HttpMethod::Patch, path, flow)
}

pub fn delete<Out: Send + 'static>(
    server: &mut HttpServer,
    path: &str,
    flow: Flow<HandlerInput, Out>,
) -> Result<(), RouteError> {
    register(server, HttpMethod::Delete, path, flow)
}

async fn handle<Out>(
    flow: &Flow<HandlerInput, Out>,
    instance: &Logger,
    body_limit: usize,
    request: Request,
) -> Response
where
    Out: Send + 'static,
{
    let request = match IncomingRequest::extract(request, instance, body_limit).await {
        Ok(request) => Arc::new(request),
        Err(err) => {
            instance.warn(json!({ "err": err.to_string() }), "request rejected");
            return error_response(err.status(), &err.to_string());
        }
    };

    let log = request.log.clone();
    let reply = Reply::new();
    let input = HandlerInput::new(request, reply.clone());

    match (flow.run(input).await, reply.take_response()) {
        (Ok(_), Some(response)) => response,
        (outcome, sent) => {
            let err = outcome.err().unwrap_or(FlowError::ReplyNotSent);
            log.error(json!({ "err": err.to_string(), "flow": flow.id() }), "flow failed");
            // a reply already sent stands; the failure is only logged
            sent.unwrap_or_else(|| {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
            })
        }
    }
}
