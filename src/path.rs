//! Dotted-path access into the nested state tree.
//!
//! Paths like `editor.content` or `ui.sidebarOpen` address locations inside
//! a JSON object tree. Reads never fail on missing paths; writes create
//! intermediate objects on demand. Path syntax is validated once, up front,
//! by [`parse`] — the callers hold the parsed segments from then on.

use serde_json::{Map, Value};
use thiserror::Error;

/// Path syntax violations. Absorbed as logged no-ops at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("empty segment in path `{0}`")]
    EmptySegment(String),
}

/// Split a dotted path into segments, rejecting empty paths and empty
/// segments (`"a..b"`, `".a"`, `"a."`).
pub fn parse(path: &str) -> Result<Vec<&str>, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    Ok(segments)
}

/// Descend the tree one segment at a time.
///
/// Returns `None` if any intermediate segment is missing or a non-object
/// value sits in the middle of the path.
pub fn read<'a>(tree: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = tree;
    for segment in segments {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

/// Assign `value` at the path, creating empty objects for missing
/// intermediate segments. A non-object intermediate is replaced by an
/// object — descending through a scalar cannot preserve it.
///
/// Mutates `tree` in place; the caller diffs against the prior value
/// before deciding to notify.
pub fn write(tree: &mut Value, segments: &[&str], value: Value) {
    let Some((last, intermediate)) = segments.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in intermediate {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map.entry(segment.to_string()).or_insert(Value::Null);
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(last.to_string(), value);
    }
}
