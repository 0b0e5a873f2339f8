//! Flow step emitting a log record built by another flow.

use serde::{Deserialize, Serialize};

use crate::flow::Flow;
use crate::http::input::WithRequest;
use crate::observability::logger::{LogLevel, Logger};

/// Content and message produced by a log-building flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log<C> {
    pub content: C,
    pub message: String,
}

impl<C> Log<C> {
    pub fn new(message: impl Into<String>, content: C) -> Self {
        Self {
            content,
            message: message.into(),
        }
    }
}

/// Wrap `builder` into a pass-through step logging at `level`.
///
/// The request-scoped logger is used when the input carries a request,
/// `instance` otherwise. The input is returned untouched; a failing
/// builder aborts the flow before anything is logged.
pub fn flow_logger<I, C>(
    instance: &Logger,
    level: LogLevel,
    builder: Flow<I, Log<C>>,
) -> Flow<I, I>
where
    I: WithRequest + Clone + Send + 'static,
    C: Serialize + Send + 'static,
{
    let instance = instance.clone();

    Flow::new("flowLogger", move |input: I| {
        let logger = input.request_log().cloned().unwrap_or_else(|| instance.clone());
        let builder = builder.clone();
        async move {
            let log = builder.run(input.clone()).await?;
            let content = serde_json::to_value(&log.content)?;
            logger.log(level, content, &log.message);
            Ok(input)
        }
    })
}
