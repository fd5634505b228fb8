//! `$`-rooted path references.

use std::fmt;

use serde_json::Value;

use crate::error::PathError;

/// A parsed path reference into a JSON document.
///
/// Paths are `$`-rooted dotted accessors: `$` names the whole document,
/// `$.detail.object.key` names a nested field. Paths are parsed once at
/// workflow lock time and resolved against a live context on every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
  segments: Vec<String>,
}

impl Path {
  /// The root path `$`.
  pub fn root() -> Self {
    Self { segments: vec![] }
  }

  /// Parse a path reference from its string form.
  pub fn parse(raw: &str) -> Result<Self, PathError> {
    let invalid = |message: &str| PathError::InvalidPath {
      path: raw.to_string(),
      message: message.to_string(),
    };

    let rest = raw
      .strip_prefix('$')
      .ok_or_else(|| invalid("must start with '$'"))?;

    if rest.is_empty() {
      return Ok(Self::root());
    }

    let rest = rest
      .strip_prefix('.')
      .ok_or_else(|| invalid("expected '.' after '$'"))?;

    let mut segments = Vec::new();
    for segment in rest.split('.') {
      if segment.is_empty() {
        return Err(invalid("empty path segment"));
      }
      if segment.contains(|c: char| c.is_whitespace()) {
        return Err(invalid("whitespace in path segment"));
      }
      segments.push(segment.to_string());
    }

    Ok(Self { segments })
  }

  /// Whether this path names the whole document.
  pub fn is_root(&self) -> bool {
    self.segments.is_empty()
  }

  pub fn segments(&self) -> &[String] {
    &self.segments
  }

  /// Resolve this path against a document.
  ///
  /// Fails with `NotFound` if any segment is missing, and `NotAnObject` if a
  /// segment lands on a value that cannot be descended into.
  pub fn resolve<'a>(&self, doc: &'a Value) -> Result<&'a Value, PathError> {
    let mut current = doc;
    for segment in &self.segments {
      let map = current.as_object().ok_or_else(|| PathError::NotAnObject {
        path: self.to_string(),
        segment: segment.clone(),
      })?;
      current = map.get(segment).ok_or_else(|| PathError::NotFound {
        path: self.to_string(),
      })?;
    }
    Ok(current)
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "$")?;
    for segment in &self.segments {
      write!(f, ".{}", segment)?;
    }
    Ok(())
  }
}
