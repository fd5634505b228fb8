//! Parameter templates.
//!
//! A template is a JSON document in which selected string values are dynamic.
//! An object key ending in `.$` marks its value as dynamic: either a path
//! reference (`"key.$": "$.detail.object.key"`) or a positional format call
//! (`"key.$": "format('{}.json', $.source.file)"`). The `.$` suffix is
//! stripped from the key when the template is applied. All other values are
//! literals and pass through untouched.

use serde_json::{Map, Value};

use crate::error::PathError;
use crate::path::Path;

const DYNAMIC_KEY_SUFFIX: &str = ".$";
const FORMAT_OPEN: &str = "format(";

/// A parsed parameter template, evaluated against an execution context to
/// produce a task request document.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
  /// A value copied into the output as-is.
  Literal(Value),
  /// A path reference substituted by the value it resolves to.
  Path(Path),
  /// A format call: positional `{}` holes filled from resolved paths.
  Format { pattern: String, args: Vec<Path> },
  /// An object with per-field templates, field order preserved.
  Object(Vec<(String, TemplateValue)>),
  /// An array with per-element templates.
  Array(Vec<TemplateValue>),
}

impl TemplateValue {
  /// Parse a raw template document into its typed form.
  ///
  /// Dynamic values are parsed here, once, so malformed paths and format
  /// calls are diagnosed at workflow lock time rather than mid-execution.
  pub fn parse(raw: &Value) -> Result<Self, PathError> {
    match raw {
      Value::Object(map) => {
        let mut fields = Vec::with_capacity(map.len());
        for (key, value) in map {
          match key.strip_suffix(DYNAMIC_KEY_SUFFIX) {
            Some(stripped) => {
              let reference = value.as_str().ok_or_else(|| PathError::InvalidTemplate {
                message: format!("dynamic field '{}' must hold a string", key),
              })?;
              fields.push((stripped.to_string(), parse_dynamic(reference)?));
            }
            None => fields.push((key.clone(), Self::parse(value)?)),
          }
        }
        Ok(Self::Object(fields))
      }
      Value::Array(items) => Ok(Self::Array(
        items.iter().map(Self::parse).collect::<Result<_, _>>()?,
      )),
      other => Ok(Self::Literal(other.clone())),
    }
  }

  /// Apply the template to a document, producing the output value.
  pub fn resolve(&self, doc: &Value) -> Result<Value, PathError> {
    match self {
      Self::Literal(value) => Ok(value.clone()),
      Self::Path(path) => Ok(path.resolve(doc)?.clone()),
      Self::Format { pattern, args } => {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
          values.push(arg.resolve(doc)?.clone());
        }
        Ok(Value::String(fill_pattern(pattern, &values)))
      }
      Self::Object(fields) => {
        let mut map = Map::new();
        for (key, template) in fields {
          map.insert(key.clone(), template.resolve(doc)?);
        }
        Ok(Value::Object(map))
      }
      Self::Array(items) => Ok(Value::Array(
        items
          .iter()
          .map(|item| item.resolve(doc))
          .collect::<Result<_, _>>()?,
      )),
    }
  }
}

/// Parse the string form of a dynamic field: a path reference or format call.
fn parse_dynamic(reference: &str) -> Result<TemplateValue, PathError> {
  if reference.starts_with(FORMAT_OPEN) {
    parse_format(reference)
  } else {
    Ok(TemplateValue::Path(Path::parse(reference)?))
  }
}

/// Parse `format('pattern', $.a, $.b)` into its pattern and arguments.
fn parse_format(reference: &str) -> Result<TemplateValue, PathError> {
  let invalid = |message: &str| PathError::InvalidTemplate {
    message: format!("malformed format call '{}': {}", reference, message),
  };

  let body = reference
    .strip_prefix(FORMAT_OPEN)
    .and_then(|rest| rest.strip_suffix(')'))
    .ok_or_else(|| invalid("expected format('...', ...)"))?
    .trim();

  let rest = body
    .strip_prefix('\'')
    .ok_or_else(|| invalid("pattern must be single-quoted"))?;
  let close = rest
    .find('\'')
    .ok_or_else(|| invalid("unterminated pattern"))?;
  let pattern = rest[..close].to_string();
  let after = rest[close + 1..].trim();

  let mut args = Vec::new();
  if !after.is_empty() {
    let list = after
      .strip_prefix(',')
      .ok_or_else(|| invalid("expected ',' after pattern"))?;
    for piece in list.split(',') {
      args.push(Path::parse(piece.trim())?);
    }
  }

  let holes = pattern.matches("{}").count();
  if holes != args.len() {
    return Err(PathError::FormatArity {
      pattern,
      holes,
      args: args.len(),
    });
  }

  Ok(TemplateValue::Format { pattern, args })
}

/// Fill positional `{}` holes with resolved values.
///
/// Strings insert verbatim; any other value inserts its compact JSON form,
/// so an array of label names renders as `["Dog","Cat"]` inside a prompt.
fn fill_pattern(pattern: &str, values: &[Value]) -> String {
  let mut out = String::with_capacity(pattern.len());
  let mut rest = pattern;
  for value in values {
    match rest.split_once("{}") {
      Some((before, after)) => {
        out.push_str(before);
        match value {
          Value::String(s) => out.push_str(s),
          other => out.push_str(&other.to_string()),
        }
        rest = after;
      }
      None => break,
    }
  }
  out.push_str(rest);
  out
}
