//! Inbound request context.
//!
//! # Responsibilities
//! - Resolve the request ID (set by the request-id layer, generated otherwise)
//! - Create the request-scoped logger and the incoming/completed log pair
//! - Extract route parameters, query, headers and body into [`IncomingRequest`]
//!
//! # Design Decisions
//! - Request ID resolved as early as possible so every log line carries it
//! - Bodies are parsed as JSON when possible, kept as text otherwise
//! - Undecodable route parameters reject the request instead of being dropped
//! - The request is immutable once built and shared by `Arc` across steps

use std::collections::BTreeMap;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequestParts, Query, RawPathParams, Request, State};
use axum::http::{Extensions, HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::request_id::RequestId;
use uuid::Uuid;

use crate::observability::Logger;

pub const X_REQUEST_ID: &str = "x-request-id";

/// The request half of a flow's input.
#[derive(Debug, Clone, Serialize)]
pub struct IncomingRequest {
    pub id: String,
    #[serde(serialize_with = "serialize_method")]
    pub method: Method,
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    /// Request-scoped logger.
    #[serde(skip)]
    pub log: Logger,
}

/// Reasons a request never reaches its flow.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid route parameters: {0}")]
    InvalidParams(String),

    #[error("request body could not be read within {limit} bytes")]
    BodyUnreadable { limit: usize },
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            RequestError::BodyUnreadable { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IncomingRequest {
    /// Build the request context from a raw axum request.
    ///
    /// The request-scoped logger is taken from the extensions set by
    /// [`log_requests`]; without it, one is derived from `instance`.
    pub async fn extract(
        request: Request,
        instance: &Logger,
        body_limit: usize,
    ) -> Result<Self, RequestError> {
        let (mut parts, body) = request.into_parts();

        let id = request_id(&parts.extensions, &parts.headers);
        let log = parts
            .extensions
            .get::<Logger>()
            .cloned()
            .unwrap_or_else(|| instance.child(id.clone()));

        let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            // not routed through a path pattern
            Err(RawPathParamsRejection::MissingPathParams(_)) => BTreeMap::new(),
            Err(rejection) => return Err(RequestError::InvalidParams(rejection.body_text())),
        };

        let query = Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let headers = parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let body = read_body(body, body_limit).await?;

        Ok(Self {
            id,
            method: parts.method,
            url,
            params,
            query,
            headers,
            body,
            log,
        })
    }
}

async fn read_body(body: Body, limit: usize) -> Result<Value, RequestError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| RequestError::BodyUnreadable { limit })?;

    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}

fn serialize_method<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(method.as_str())
}

/// Resolve the request ID from the request-id layer or the raw header.
pub fn request_id(extensions: &Extensions, headers: &HeaderMap) -> String {
    extensions
        .get::<RequestId>()
        .map(|id| id.header_value())
        .or_else(|| headers.get(X_REQUEST_ID))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Request logging settings shared with the middleware.
#[derive(Debug, Clone)]
pub struct RequestLogging {
    pub log: Logger,
    pub enabled: bool,
}

/// Middleware installing the request-scoped logger.
///
/// Logs `incoming request` before and `request completed` after the
/// handler when request logging is enabled.
pub async fn log_requests(
    State(logging): State<RequestLogging>,
    mut request: Request,
    next: Next,
) -> Response {
    let id = request_id(request.extensions(), request.headers());
    let log = logging.log.child(id);
    request.extensions_mut().insert(log.clone());

    let start = Instant::now();
    if logging.enabled {
        log.info(
            json!({ "method": request.method().as_str(), "url": request.uri().to_string() }),
            "incoming request",
        );
    }

    let response = next.run(request).await;

    if logging.enabled {
        log.info(
            json!({
                "statusCode": response.status().as_u16(),
                "responseTime": start.elapsed().as_secs_f64() * 1000.0,
            }),
            "request completed",
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logger::MemorySink;

    #[tokio::test]
    async fn test_extracts_query_headers_and_json_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/test?page=2")
            .header("x-request-id", "req-42")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"value":5}"#))
            .unwrap();

        let sink = MemorySink::new();
        let extracted = IncomingRequest::extract(request, &Logger::new(sink), 1024)
            .await
            .unwrap();

        assert_eq!(extracted.id, "req-42");
        assert_eq!(extracted.method, Method::POST);
        assert_eq!(extracted.url, "/api/test?page=2");
        assert_eq!(extracted.query.get("page").map(String::as_str), Some("2"));
        assert_eq!(extracted.headers["content-type"], "application/json");
        assert_eq!(extracted.body, json!({ "value": 5 }));
        assert!(extracted.params.is_empty());
        assert_eq!(extracted.log.request_id(), Some("req-42"));
    }

    #[tokio::test]
    async fn test_non_json_body_is_text_and_empty_is_null() {
        let text = Request::builder()
            .uri("/")
            .body(Body::from("plain words"))
            .unwrap();
        let empty = Request::builder().uri("/").body(Body::empty()).unwrap();

        let logger = Logger::new(MemorySink::new());
        let text = IncomingRequest::extract(text, &logger, 1024).await.unwrap();
        let empty = IncomingRequest::extract(empty, &logger, 1024).await.unwrap();

        assert_eq!(text.body, json!("plain words"));
        assert_eq!(empty.body, Value::Null);
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let request = Request::builder()
            .uri("/")
            .body(Body::from(vec![b'a'; 64]))
            .unwrap();

        let result = IncomingRequest::extract(request, &Logger::new(MemorySink::new()), 16).await;
        let err = result.unwrap_err();
        assert!(matches!(err, RequestError::BodyUnreadable { limit: 16 }));
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_invalid_params_are_a_bad_request() {
        let err = RequestError::InvalidParams("bad utf-8".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let id = request_id(&Extensions::new(), &HeaderMap::new());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_serialized_view_omits_logger() {
        let request = IncomingRequest {
            id: "r1".into(),
            method: Method::GET,
            url: "/api/test/5".into(),
            params: BTreeMap::from([("value".to_string(), "5".to_string())]),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: Value::Null,
            log: Logger::new(MemorySink::new()),
        };

        let view = serde_json::to_value(&request).unwrap();
        assert_eq!(view["method"], json!("GET"));
        assert_eq!(view["params"], json!({ "value": "5" }));
        assert!(view.get("log").is_none());
    }
}
