//! Debug snapshot writing.
//!
//! Serializes diagnostic payloads to one pretty-printed JSON file per
//! logical section. Pathological payloads degrade to markers instead of
//! errors: a diagnostics path must never take down the run it documents.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Number, Value};
use tokio::fs;
use tracing::{debug, warn};

use crate::diag;

/// Substituted for a node whose identity was already visited.
pub const CYCLE_MARKER: &str = "<circular>";

/// Largest integer magnitude JSON consumers hold exactly (2^53 - 1).
/// Anything beyond serializes as a tagged string.
pub const MAX_SAFE_INTEGER: i128 = 9_007_199_254_740_991;

/// Traversal depth cap; nesting past it degrades to the cycle marker.
const MAX_DEPTH: usize = 128;

/// A diagnostic payload tree.
///
/// `Shared` is the variant that makes identity observable: the same `Arc`
/// reached twice in one traversal, including inside itself, is replaced
/// with [`CYCLE_MARKER`] instead of being re-entered.
#[derive(Debug, Clone)]
pub enum SnapshotValue {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Text(String),
    List(Vec<SnapshotValue>),
    Map(Vec<(String, SnapshotValue)>),
    Shared(Arc<RwLock<SnapshotValue>>),
}

impl SnapshotValue {
    /// Wrap a value for shared or cyclic use.
    pub fn shared(value: SnapshotValue) -> Arc<RwLock<SnapshotValue>> {
        Arc::new(RwLock::new(value))
    }

    /// Sanitize into plain JSON: cycle markers for repeated identity,
    /// tagged strings for out-of-range integers and non-finite floats.
    pub fn to_json(&self) -> Value {
        let mut seen = HashSet::new();
        self.sanitize(&mut seen, 0)
    }

    fn sanitize(&self, seen: &mut HashSet<usize>, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::String(CYCLE_MARKER.to_string());
        }
        match self {
            SnapshotValue::Null => Value::Null,
            SnapshotValue::Bool(b) => Value::Bool(*b),
            SnapshotValue::Int(i) => encode_int(*i),
            SnapshotValue::Float(f) => encode_float(*f),
            SnapshotValue::Text(s) => Value::String(s.clone()),
            SnapshotValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.sanitize(seen, depth + 1))
                    .collect(),
            ),
            SnapshotValue::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.sanitize(seen, depth + 1));
                }
                Value::Object(map)
            }
            SnapshotValue::Shared(node) => {
                let address = Arc::as_ptr(node) as usize;
                if !seen.insert(address) {
                    // Already on or behind this traversal; do not re-enter.
                    return Value::String(CYCLE_MARKER.to_string());
                }
                node.read().sanitize(seen, depth + 1)
            }
        }
    }
}

/// Safe-range integers stay numbers; the rest become `"{value}n"` strings
/// so magnitude survives the trip through JSON.
fn encode_int(value: i128) -> Value {
    if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
        Value::Number(Number::from(value as i64))
    } else {
        Value::String(format!("{value}n"))
    }
}

/// JSON has no NaN or infinities; name them instead of dropping them.
fn encode_float(value: f64) -> Value {
    match Number::from_f64(value) {
        Some(number) => Value::Number(number),
        None if value.is_nan() => Value::String("NaN".to_string()),
        None if value > 0.0 => Value::String("Infinity".to_string()),
        None => Value::String("-Infinity".to_string()),
    }
}

impl From<Value> for SnapshotValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SnapshotValue::Null,
            Value::Bool(b) => SnapshotValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SnapshotValue::Int(i as i128)
                } else if let Some(u) = n.as_u64() {
                    SnapshotValue::Int(u as i128)
                } else {
                    SnapshotValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => SnapshotValue::Text(s),
            Value::Array(items) => {
                SnapshotValue::List(items.into_iter().map(SnapshotValue::from).collect())
            }
            Value::Object(map) => SnapshotValue::Map(
                map.into_iter()
                    .map(|(key, value)| (key, SnapshotValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for SnapshotValue {
    fn from(value: &str) -> Self {
        SnapshotValue::Text(value.to_string())
    }
}

impl From<String> for SnapshotValue {
    fn from(value: String) -> Self {
        SnapshotValue::Text(value)
    }
}

impl From<i64> for SnapshotValue {
    fn from(value: i64) -> Self {
        SnapshotValue::Int(value as i128)
    }
}

impl From<i128> for SnapshotValue {
    fn from(value: i128) -> Self {
        SnapshotValue::Int(value)
    }
}

impl From<bool> for SnapshotValue {
    fn from(value: bool) -> Self {
        SnapshotValue::Bool(value)
    }
}

impl From<f64> for SnapshotValue {
    fn from(value: f64) -> Self {
        SnapshotValue::Float(value)
    }
}

/// A named collection of sections, written one JSON file each.
#[derive(Default)]
pub struct DebugSnapshot {
    sections: Vec<(String, SnapshotValue)>,
}

impl DebugSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section. The name is sanitized into a filename at write time.
    pub fn section(mut self, name: &str, value: impl Into<SnapshotValue>) -> Self {
        self.sections.push((name.to_string(), value.into()));
        self
    }

    /// Write every section under `dir` as pretty-printed JSON.
    ///
    /// Never fails: directory or file errors are logged and the affected
    /// section skipped. Returns the paths actually written.
    pub async fn write_to(&self, dir: &Path) -> Vec<PathBuf> {
        let mut written = Vec::new();
        if let Err(e) = fs::create_dir_all(dir).await {
            warn!(
                "Debug snapshot directory {} unavailable: {}",
                dir.display(),
                diag::describe_error(&e)
            );
            return written;
        }
        for (name, value) in &self.sections {
            let path = dir.join(format!("{}.json", sanitize_section_name(name)));
            let json = value.to_json();
            let text = match serde_json::to_string_pretty(&json) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        "Debug section {name} did not serialize: {}",
                        diag::describe_error(&e)
                    );
                    continue;
                }
            };
            match fs::write(&path, text).await {
                Ok(()) => {
                    debug!("Wrote debug section {}", path.display());
                    written.push(path);
                }
                Err(e) => {
                    warn!(
                        "Failed to write debug section {}: {}",
                        path.display(),
                        diag::describe_error(&e)
                    );
                }
            }
        }
        written
    }
}

/// Keep section-derived filenames to one path component of safe chars.
fn sanitize_section_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "section".to_string()
    } else {
        cleaned
    }
}
