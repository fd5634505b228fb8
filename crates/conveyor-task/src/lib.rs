//! Conveyor Task
//!
//! This crate provides the uniform task invocation layer for conveyor
//! workflows: the [`TaskBackend`] trait every external task implements, the
//! [`TaskInvoker`] registry the engine calls through, the error taxonomy
//! ([`ErrorKind`], [`TaskError`]) the retry controller classifies on, and the
//! built-in backends for the image-summarization pipeline (label detection,
//! confidence filtering, text generation, output assembly, object storage).

mod error;
mod invoker;

pub mod backends;

pub use error::{ErrorKind, TaskError};
pub use invoker::{TaskBackend, TaskInvoker};
