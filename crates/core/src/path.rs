//! Dot-separated path access into JSON documents.
//!
//! Paths address nested object members (`pull_request.head.sha`). Reads also
//! accept numeric segments to index into arrays (`labels.0.name`); writes only
//! traverse objects and create missing intermediate objects on the way.

use serde_json::{Map, Value};

use crate::error::CoreError;

/// Human-readable name of a JSON value's type.
#[must_use]
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Borrow the value at `path`, if every segment resolves.
#[must_use]
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at `path`, creating intermediate objects as needed.
///
/// Fails when a segment is empty or when an existing intermediate value is
/// not an object.
pub fn set(root: &mut Value, path: &str, value: Value) -> Result<(), CoreError> {
    if path.split('.').any(str::is_empty) {
        return Err(CoreError::Path {
            path: path.to_owned(),
            reason: "empty segment".to_owned(),
        });
    }

    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut current = root;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            current = child(current, segment, path)?;
        }
    }

    match current {
        Value::Object(map) => {
            map.insert(leaf.to_owned(), value);
            Ok(())
        }
        other => Err(CoreError::Path {
            path: path.to_owned(),
            reason: format!("cannot set `{leaf}` on a {}", kind_of(other)),
        }),
    }
}

fn child<'a>(current: &'a mut Value, segment: &str, path: &str) -> Result<&'a mut Value, CoreError> {
    match current {
        Value::Object(map) => Ok(map
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()))),
        other => Err(CoreError::Path {
            path: path.to_owned(),
            reason: format!("segment `{segment}` traverses a {}", kind_of(other)),
        }),
    }
}
