//! Conveyor Path
//!
//! This crate provides the reference and template machinery for conveyor
//! workflows: `$`-rooted path references into a JSON execution context,
//! parameter templates with dynamic fields, the positional `format(...)`
//! function, and the merge/narrow operations that shape the context as it
//! moves between states.
//!
//! Everything here is pure: resolution never invokes tasks and never touches
//! the outside world. Paths and templates are parsed once (at workflow lock
//! time) and evaluated many times (once per state per execution).

mod context;
mod error;
mod path;
mod template;

pub use context::{merge, narrow};
pub use error::PathError;
pub use path::Path;
pub use template::TemplateValue;
