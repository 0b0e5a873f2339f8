//! Dotted-path lookup into flow inputs.
//!
//! Paths such as `request.params.value` address nested fields of the
//! serialized input. Numeric segments index into arrays. An empty path
//! addresses the whole value.

use serde::Serialize;
use serde_json::Value;

use crate::flow::FlowError;

/// Look up `path` inside `value`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Serialize `input` and resolve `path` against the result.
///
/// A miss is `Ok(None)`, never an error.
pub fn resolve<T: Serialize + ?Sized>(input: &T, path: &str) -> Result<Option<Value>, FlowError> {
    let view = serde_json::to_value(input)?;
    Ok(lookup(&view, path).cloned())
}
