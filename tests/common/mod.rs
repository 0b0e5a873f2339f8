//! Shared utilities for integration tests.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use http_flows::config::ServerConfig;
use http_flows::observability::MemorySink;
use http_flows::{
    chain, endpoint, flow_logger, http_response, Flow, HandlerInput, HttpServer, Log, LogLevel,
    Logger,
};

/// Response pieces the tests look at.
#[allow(dead_code)]
pub struct Sent {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl Sent {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("body is not JSON")
    }
}

/// A server logging into `sink`.
pub fn server_with_sink(sink: &MemorySink, config: ServerConfig) -> HttpServer {
    HttpServer::with_logger(config, Logger::new(sink.clone()))
}

fn params_echo(instance: &Logger, message: &'static str) -> Flow<HandlerInput, HandlerInput> {
    let log = Flow::from_fn(move |input: HandlerInput| async move {
        Ok(Log::new(message, input.request.params.clone()))
    });

    chain::<HandlerInput>()
        .add(flow_logger(instance, LogLevel::Info, log))
        .add(http_response(200, "request.params"))
}

fn body_echo(instance: &Logger, message: &'static str) -> Flow<HandlerInput, HandlerInput> {
    let log = Flow::from_fn(move |input: HandlerInput| async move {
        Ok(Log::new(message, input.request.body.clone()))
    });

    chain::<HandlerInput>()
        .add(flow_logger(instance, LogLevel::Info, log))
        .add(http_response(200, "request.body"))
}

/// Register the GET/DELETE params echo and POST/PUT/PATCH body echo routes.
#[allow(dead_code)]
pub fn register_echo_routes(server: &mut HttpServer) {
    let get = params_echo(server.log(), "GET params");
    let delete = params_echo(server.log(), "DELETE params");
    let post = body_echo(server.log(), "POST body");
    let put = body_echo(server.log(), "PUT body");
    let patch = body_echo(server.log(), "PATCH body");

    endpoint::get(server, "/api/test/:value", get).unwrap();
    endpoint::delete(server, "/api/test/:value", delete).unwrap();
    endpoint::post(server, "/api/test", post).unwrap();
    endpoint::put(server, "/api/test", put).unwrap();
    endpoint::patch(server, "/api/test", patch).unwrap();
}

/// Drive one request through the router.
#[allow(dead_code)]
pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Sent {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    Sent {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}
