//! Route pattern normalization.
//!
//! # Responsibilities
//! - Accept `:name` parameters and a trailing `*` wildcard
//! - Emit the brace syntax the router matches on (`{name}`, `{*wildcard}`)
//! - Reject patterns the router would refuse at registration time
//!
//! A bare `*` is exposed as the `wildcard` parameter.

use crate::routing::RouteError;

pub const WILDCARD_PARAM: &str = "wildcard";

/// Convert a route pattern to router syntax.
pub fn normalize(pattern: &str) -> Result<String, RouteError> {
    let invalid = |reason| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    };

    if !pattern.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    let segments: Vec<&str> = pattern[1..].split('/').collect();
    let last = segments.len() - 1;
    let mut normalized = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let converted = if let Some(name) = segment.strip_prefix(':') {
            if !is_param_name(name) {
                return Err(invalid("parameter names must be non-empty and alphanumeric"));
            }
            format!("{{{name}}}")
        } else if let Some(name) = segment.strip_prefix('*') {
            if i != last {
                return Err(invalid("wildcard must be the last segment"));
            }
            let name = if name.is_empty() { WILDCARD_PARAM } else { name };
            if !is_param_name(name) {
                return Err(invalid("parameter names must be non-empty and alphanumeric"));
            }
            format!("{{*{name}}}")
        } else if segment.contains(['{', '}']) {
            let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
                return Err(invalid("braces must enclose a whole segment"));
            };
            let (catch_all, name) = match name.strip_prefix('*') {
                Some(name) => (true, name),
                None => (false, name),
            };
            if catch_all && i != last {
                return Err(invalid("wildcard must be the last segment"));
            }
            if !is_param_name(name) {
                return Err(invalid("parameter names must be non-empty and alphanumeric"));
            }
            segment.to_string()
        } else {
            segment.to_string()
        };
        normalized.push(converted);
    }

    Ok(format!("/{}", normalized.join("/")))
}

/// Erase parameter names from a normalized pattern.
///
/// Two patterns with the same shape match the same requests, so the
/// router refuses the second one.
pub fn shape(normalized: &str) -> String {
    normalized
        .split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
