//! Flow input contract for HTTP-bound flows.
//!
//! Steps depend on capabilities, not on a fixed record: a type that can
//! hand out a request-scoped logger implements [`WithRequest`], a type that
//! carries the reply implements [`WithReply`]. [`HandlerInput`] is the
//! input every registered route starts its flow with.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::flow::FlowError;
use crate::http::request::IncomingRequest;
use crate::http::reply::Reply;
use crate::observability::Logger;

/// Inputs that may carry an inbound request.
pub trait WithRequest {
    /// Logger bound to the inbound request, if there is one.
    fn request_log(&self) -> Option<&Logger>;
}

/// Inputs that carry the outbound reply.
pub trait WithReply {
    fn reply(&self) -> &Reply;
}

/// Initial input of a route-registered flow.
///
/// `locals` holds fields added by steps; they serialize next to `request`
/// and `reply`, so dotted paths reach them directly.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerInput {
    pub request: Arc<IncomingRequest>,
    pub reply: Reply,
    #[serde(flatten)]
    pub locals: Map<String, Value>,
}

impl HandlerInput {
    pub fn new(request: Arc<IncomingRequest>, reply: Reply) -> Self {
        Self {
            request,
            reply,
            locals: Map::new(),
        }
    }

    /// Add a field for later steps.
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), FlowError> {
        if key == "request" || key == "reply" {
            return Err(FlowError::msg(format!("`{key}` is a reserved input field")));
        }
        self.locals.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.get(key)
    }
}

impl WithRequest for HandlerInput {
    fn request_log(&self) -> Option<&Logger> {
        Some(&self.request.log)
    }
}

impl WithReply for HandlerInput {
    fn reply(&self) -> &Reply {
        &self.reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use axum::http::Method;
    use serde_json::json;

    use crate::observability::logger::MemorySink;

    fn input() -> HandlerInput {
        let request = IncomingRequest {
            id: "r1".into(),
            method: Method::GET,
            url: "/".into(),
            params: BTreeMap::new(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: json!({ "value": 5 }),
            log: Logger::new(MemorySink::new()).child("r1"),
        };
        HandlerInput::new(Arc::new(request), Reply::new())
    }

    #[test]
    fn test_locals_serialize_beside_request() {
        let mut input = input();
        input.insert("user", &json!({ "name": "ada" })).unwrap();

        let view = serde_json::to_value(&input).unwrap();
        assert_eq!(view["user"]["name"], json!("ada"));
        assert_eq!(view["request"]["body"]["value"], json!(5));
        assert_eq!(view["reply"]["statusCode"], json!(200));
        assert_eq!(input.local("user"), Some(&json!({ "name": "ada" })));
    }

    #[test]
    fn test_reserved_keys_rejected() {
        let mut input = input();
        assert!(input.insert("request", &1).is_err());
        assert!(input.insert("reply", &1).is_err());
    }

    #[test]
    fn test_request_log_is_request_scoped() {
        let input = input();
        assert_eq!(input.request_log().and_then(Logger::request_id), Some("r1"));
    }
}
