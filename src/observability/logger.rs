//! Structured, severity-levelled logger handed to flows.
//!
//! # Responsibilities
//! - Map the six severity names onto a fixed set of logger methods
//! - Bind a request id for request-scoped loggers
//! - Forward records to a pluggable sink (tracing by default)
//!
//! # Design Decisions
//! - Content is a JSON value; object content is merged into the record fields
//! - Loggers are cheap to clone and shared read-only across requests

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown log level `{0}`")]
pub struct UnknownLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| UnknownLevel(s.to_string()))
    }
}

/// A single emitted log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// Name of the event field carrying the record fields as a JSON object.
///
/// The JSON formatter in [`logging`](crate::observability::logging) merges
/// it back into the log line.
pub const CONTENT_FIELD: &str = "content";

/// Forwards records to the global `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        let request_id = record.request_id.as_deref();
        let content = Value::Object(record.fields).to_string();
        let content = content.as_str();
        let message = record.message;

        match record.level {
            LogLevel::Trace => tracing::trace!(request_id, content, "{message}"),
            LogLevel::Debug => tracing::debug!(request_id, content, "{message}"),
            LogLevel::Info => tracing::info!(request_id, content, "{message}"),
            LogLevel::Warn => tracing::warn!(request_id, content, "{message}"),
            LogLevel::Error => tracing::error!(request_id, content, "{message}"),
            LogLevel::Fatal => tracing::error!(request_id, fatal = true, content, "{message}"),
        }
    }
}

/// Keeps records in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Drain all captured records.
    pub fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: LogRecord) {
        self.lock().push(record);
    }
}

/// Instance or request-scoped logger.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    request_id: Option<Arc<str>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing()
    }
}

impl Logger {
    pub fn new(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
            request_id: None,
        }
    }

    /// Logger writing through `tracing`.
    pub fn tracing() -> Self {
        Self::new(TracingSink)
    }

    /// Derive a logger bound to one request.
    pub fn child(&self, request_id: impl Into<String>) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            request_id: Some(Arc::from(request_id.into())),
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn log(&self, level: LogLevel, content: Value, message: &str) {
        let fields = match content {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("content".to_string(), other);
                map
            }
        };

        self.sink.emit(LogRecord {
            level,
            message: message.to_string(),
            request_id: self.request_id.as_deref().map(str::to_string),
            fields,
        });
    }

    pub fn trace(&self, content: Value, message: &str) {
        self.log(LogLevel::Trace, content, message);
    }

    pub fn debug(&self, content: Value, message: &str) {
        self.log(LogLevel::Debug, content, message);
    }

    pub fn info(&self, content: Value, message: &str) {
        self.log(LogLevel::Info, content, message);
    }

    pub fn warn(&self, content: Value, message: &str) {
        self.log(LogLevel::Warn, content, message);
    }

    pub fn error(&self, content: Value, message: &str) {
        self.log(LogLevel::Error, content, message);
    }

    pub fn fatal(&self, content: Value, message: &str) {
        self.log(LogLevel::Fatal, content, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_round_trips_through_str() {
        for level in LogLevel::ALL {
            assert_eq!(level.as_str().parse::<LogLevel>(), Ok(level));
        }
        assert_eq!(
            "verbose".parse::<LogLevel>(),
            Err(UnknownLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_object_content_is_merged() {
        let sink = MemorySink::new();
        let logger = Logger::new(sink.clone());

        logger.info(json!({ "value": "5" }), "GET params");

        let records = sink.take();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Info);
        assert_eq!(records[0].message, "GET params");
        assert_eq!(records[0].field("value"), Some(&json!("5")));
        assert_eq!(records[0].request_id, None);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_scalar_content_lands_under_content_key() {
        let sink = MemorySink::new();
        let logger = Logger::new(sink.clone());

        logger.warn(json!(42), "odd");
        logger.debug(Value::Null, "empty");

        let records = sink.records();
        assert_eq!(records[0].field("content"), Some(&json!(42)));
        assert!(records[1].fields.is_empty());
    }

    #[test]
    fn test_child_binds_request_id() {
        let sink = MemorySink::new();
        let instance = Logger::new(sink.clone());
        let request_log = instance.child("req-1");

        request_log.fatal(json!({}), "down");
        instance.trace(json!({}), "instance");

        let records = sink.records();
        assert_eq!(records[0].request_id.as_deref(), Some("req-1"));
        assert_eq!(records[0].level, LogLevel::Fatal);
        assert_eq!(records[1].request_id, None);
        assert_eq!(instance.request_id(), None);
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = LogRecord {
            level: LogLevel::Error,
            message: "failed".into(),
            request_id: Some("abc".into()),
            fields: json!({ "code": 7 }).as_object().cloned().unwrap(),
        };

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "level": "error", "message": "failed", "request_id": "abc", "code": 7 })
        );
    }
}
