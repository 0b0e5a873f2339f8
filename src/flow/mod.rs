//! Flow composition subsystem.
//!
//! # Data Flow
//! ```text
//! chain::<T>()            identity step
//!     .add(step_a)        T → A
//!     .add(step_b)        A → B
//!     .run(input)         each step awaited in order, first error aborts
//! ```
//!
//! # Design Decisions
//! - A flow is an `Arc`-backed async function, cheap to clone into handlers
//! - Steps own their input and hand it on by value
//! - Every flow carries a string id used in trace output

pub mod path;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;

/// Errors raised while running a flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A user step failed with its own error.
    #[error("flow step failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("{0}")]
    Message(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("reply already sent")]
    ReplyAlreadySent,

    #[error("flow completed without sending a reply")]
    ReplyNotSent,
}

impl FlowError {
    /// Wrap an arbitrary error raised by a step.
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FlowError::Failed(Box::new(err))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        FlowError::Message(message.into())
    }
}

type StepFn<In, Out> = dyn Fn(In) -> BoxFuture<'static, Result<Out, FlowError>> + Send + Sync;

/// An asynchronous, single-input/single-output pipeline step.
pub struct Flow<In, Out> {
    id: Arc<str>,
    step: Arc<StepFn<In, Out>>,
}

impl<In, Out> Clone for Flow<In, Out> {
    fn clone(&self) -> Self {
        Self {
            id: Arc::clone(&self.id),
            step: Arc::clone(&self.step),
        }
    }
}

impl<In, Out> std::fmt::Debug for Flow<In, Out> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow").field("id", &self.id).finish()
    }
}

impl<In, Out> Flow<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    /// Create a named flow from an async function.
    pub fn new<F, Fut>(id: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, FlowError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            step: Arc::new(move |input| f(input).boxed()),
        }
    }

    /// Create an anonymous flow.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, FlowError>> + Send + 'static,
    {
        Self::new("anonymous", f)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run the flow to completion.
    pub async fn run(&self, input: In) -> Result<Out, FlowError> {
        tracing::trace!(flow = %self.id, "running flow step");
        (self.step)(input).await
    }

    /// Feed this flow's output into `next`.
    pub fn then<Next>(self, next: Flow<Out, Next>) -> Flow<In, Next>
    where
        Next: Send + 'static,
    {
        let id: Arc<str> = format!("{} -> {}", self.id, next.id).into();
        let first = self;

        Flow {
            id,
            step: Arc::new(move |input| {
                let first = first.clone();
                let next = next.clone();
                async move {
                    let mid = first.run(input).await?;
                    next.run(mid).await
                }
                .boxed()
            }),
        }
    }

    /// Append a step to the chain. Alias of [`Flow::then`].
    pub fn add<Next>(self, next: Flow<Out, Next>) -> Flow<In, Next>
    where
        Next: Send + 'static,
    {
        self.then(next)
    }
}

/// Start an empty chain over `T`.
pub fn chain<T: Send + 'static>() -> Flow<T, T> {
    Flow::new("chain", |input: T| async move { Ok(input) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_chain_runs_steps_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());

        let flow = chain::<u32>()
            .add(Flow::new("double", move |n: u32| {
                let seen = a.clone();
                async move {
                    seen.lock().unwrap().push("double");
                    Ok(n * 2)
                }
            }))
            .add(Flow::new("stringify", move |n: u32| {
                let seen = b.clone();
                async move {
                    seen.lock().unwrap().push("stringify");
                    Ok(n.to_string())
                }
            }));

        assert_eq!(flow.run(21).await.unwrap(), "42");
        assert_eq!(*seen.lock().unwrap(), vec!["double", "stringify"]);
        assert_eq!(flow.id(), "chain -> double -> stringify");
    }

    #[tokio::test]
    async fn test_first_error_aborts_chain() {
        let reached = Arc::new(Mutex::new(false));
        let r = reached.clone();

        let flow = chain::<u32>()
            .add(Flow::from_fn(|_: u32| async move {
                Err::<u32, _>(FlowError::msg("boom"))
            }))
            .add(Flow::from_fn(move |n: u32| {
                let r = r.clone();
                async move {
                    *r.lock().unwrap() = true;
                    Ok(n)
                }
            }));

        let err = flow.run(1).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!*reached.lock().unwrap());
    }

    #[tokio::test]
    async fn test_flow_is_reusable_across_runs() {
        let flow = Flow::new("inc", |n: i64| async move { Ok(n + 1) });
        let cloned = flow.clone();

        assert_eq!(flow.run(1).await.unwrap(), 2);
        assert_eq!(cloned.run(10).await.unwrap(), 11);
    }

    #[test]
    fn test_failed_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = FlowError::failed(io);
        assert_eq!(err.to_string(), "flow step failed: disk gone");
        assert!(std::error::Error::source(&err).is_some());
    }
}
