//! Context shaping: merging task results in, narrowing the view passed on.

use serde_json::{Map, Value};

use crate::error::PathError;
use crate::path::Path;

/// Merge a task result into the context at `target`.
///
/// - `None` discards the result; the context is returned unchanged.
/// - The root path `$` replaces the context with the result entirely.
/// - Any other path inserts (or overwrites) the result as a nested field at
///   that location, creating intermediate objects as needed and preserving
///   every sibling field.
pub fn merge(ctx: Value, result: Value, target: Option<&Path>) -> Result<Value, PathError> {
  let Some(target) = target else {
    return Ok(ctx);
  };
  if target.is_root() {
    return Ok(result);
  }

  let mut ctx = ctx;
  let mut current = &mut ctx;
  let segments = target.segments();
  for segment in &segments[..segments.len() - 1] {
    let map = as_object_mut(current, target, segment)?;
    current = map
      .entry(segment.clone())
      .or_insert_with(|| Value::Object(Map::new()));
  }

  let last = &segments[segments.len() - 1];
  let map = as_object_mut(current, target, last)?;
  map.insert(last.clone(), result);
  Ok(ctx)
}

/// Narrow the context to the subtree at `target`; that subtree becomes the
/// whole context seen by downstream states.
pub fn narrow(ctx: &Value, target: &Path) -> Result<Value, PathError> {
  Ok(target.resolve(ctx)?.clone())
}

fn as_object_mut<'a>(
  value: &'a mut Value,
  target: &Path,
  segment: &str,
) -> Result<&'a mut Map<String, Value>, PathError> {
  value.as_object_mut().ok_or_else(|| PathError::NotAnObject {
    path: target.to_string(),
    segment: segment.to_string(),
  })
}
