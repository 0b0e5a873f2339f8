//! Outbound reply handle.
//!
//! # Responsibilities
//! - Collect status, headers and body set by flow steps
//! - Encode payloads (strings as text, everything else as JSON)
//! - Hand the finished response back to the route handler
//!
//! # Design Decisions
//! - The handle is shared by clone; the lock is never held across an await
//! - A reply is sent at most once; later mutations are errors
//! - Status and headers are validated by the `http` types, nothing more

use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::flow::FlowError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug)]
struct ReplyState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    sent: bool,
}

impl Default for ReplyState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            sent: false,
        }
    }
}

/// Handle to the HTTP reply of one request.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    state: Arc<Mutex<ReplyState>>,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status code.
    pub fn status(&self, code: u16) -> Result<&Self, FlowError> {
        let status = StatusCode::from_u16(code).map_err(|_| FlowError::InvalidStatus(code))?;
        self.unsent()?.status = status;
        Ok(self)
    }

    /// Set one header, replacing any previous value.
    pub fn header(&self, name: &str, value: &str) -> Result<&Self, FlowError> {
        let (name, value) = parse_header(name, value)?;
        self.unsent()?.headers.insert(name, value);
        Ok(self)
    }

    /// Set several headers at once.
    pub fn headers<I, K, V>(&self, headers: I) -> Result<&Self, FlowError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let parsed = headers
            .into_iter()
            .map(|(k, v)| parse_header(k.as_ref(), v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.unsent()?;
        for (name, value) in parsed {
            state.headers.insert(name, value);
        }
        Ok(self)
    }

    /// Serialize `payload` and send it.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<(), FlowError> {
        let value = serde_json::to_value(payload)?;
        self.send_value(Some(value))
    }

    /// Send a resolved payload. `None` sends an empty body.
    pub fn send_value(&self, payload: Option<Value>) -> Result<(), FlowError> {
        let mut state = self.unsent()?;

        let (body, content_type) = match payload {
            None => (Vec::new(), None),
            Some(Value::String(text)) => (text.into_bytes(), Some(TEXT_CONTENT_TYPE)),
            Some(value) => (serde_json::to_vec(&value)?, Some(JSON_CONTENT_TYPE)),
        };

        if let Some(content_type) = content_type {
            if !state.headers.contains_key(header::CONTENT_TYPE) {
                state
                    .headers
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
            }
        }

        state.body = body;
        state.sent = true;
        Ok(())
    }

    pub fn status_code(&self) -> StatusCode {
        self.lock().status
    }

    pub fn is_sent(&self) -> bool {
        self.lock().sent
    }

    /// Take the finished response, if the reply was sent.
    pub(crate) fn take_response(&self) -> Option<Response> {
        let mut state = self.lock();
        if !state.sent {
            return None;
        }

        let body = std::mem::take(&mut state.body);
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = state.status;
        *response.headers_mut() = std::mem::take(&mut state.headers);
        Some(response)
    }

    fn unsent(&self) -> Result<MutexGuard<'_, ReplyState>, FlowError> {
        let state = self.lock();
        if state.sent {
            return Err(FlowError::ReplyAlreadySent);
        }
        Ok(state)
    }

    fn lock(&self) -> MutexGuard<'_, ReplyState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let state = self.lock();
        let mut s = serializer.serialize_struct("Reply", 2)?;
        s.serialize_field("statusCode", &state.status.as_u16())?;
        s.serialize_field("sent", &state.sent)?;
        s.end()
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), FlowError> {
    let invalid = |reason: &str| FlowError::InvalidHeader {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(&e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(&e.to_string()))?;
    Ok((header_name, header_value))
}

/// JSON error body in the shape `{statusCode, error, message}`.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "statusCode": status.as_u16(),
        "error": status.canonical_reason().unwrap_or("Unknown"),
        "message": message,
    });

    (
        status,
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
        body.to_string(),
    )
        .into_response()
}
