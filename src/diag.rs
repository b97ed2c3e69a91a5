//! Shared diagnostic formatting for recovered failures.
//!
//! Components in this crate swallow protocol and serialization failures
//! instead of propagating them. Every swallowed failure is logged through
//! this module, so operators get one consistent, greppable shape regardless
//! of what the original failure looked like.

use std::fmt::{Debug, Display};

use serde::Serialize;

/// Upper bound on a formatted diagnostic, in characters.
pub const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// Format an arbitrary payload for logging.
///
/// Structured JSON serialization first, `Debug` rendering as fallback when
/// the payload refuses to serialize. The result is sanitized with
/// [`sanitize`].
pub fn describe<T>(payload: &T) -> String
where
    T: Serialize + Debug + ?Sized,
{
    let raw = match serde_json::to_string(payload) {
        Ok(json) => json,
        Err(_) => format!("{payload:?}"),
    };
    sanitize(&raw)
}

/// Format an error for logging, sanitized like any other diagnostic.
pub fn describe_error(err: &dyn Display) -> String {
    sanitize(&err.to_string())
}

/// Strip control characters and cap length at [`MAX_DIAGNOSTIC_CHARS`].
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_DIAGNOSTIC_CHARS));
    for (i, c) in raw.chars().enumerate() {
        if i == MAX_DIAGNOSTIC_CHARS {
            out.push_str(" [truncated]");
            break;
        }
        out.push(if c.is_control() { ' ' } else { c });
    }
    out
}
