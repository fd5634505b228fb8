use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PathError {
  #[error("invalid path '{path}': {message}")]
  InvalidPath { path: String, message: String },

  #[error("invalid template value: {message}")]
  InvalidTemplate { message: String },

  #[error("path '{path}' not found in document")]
  NotFound { path: String },

  #[error("path '{path}' traverses non-object value at segment '{segment}'")]
  NotAnObject { path: String, segment: String },

  #[error("format pattern '{pattern}' has {holes} placeholders but {args} arguments")]
  FormatArity {
    pattern: String,
    holes: usize,
    args: usize,
  },
}
