//! Built-in task backends for the image-summarization pipeline.
//!
//! Each backend is a [`TaskBackend`](crate::TaskBackend) with typed request
//! and response documents. The detection and inference backends are local
//! stand-ins with the same wire contracts as their hosted counterparts, so
//! the pipeline runs end to end on a laptop; the filter and assembly
//! backends carry the real user logic; the store backend is the pipeline's
//! one durable side effect.

mod assemble;
mod detector;
mod filter;
mod model;
mod store;

pub use assemble::{AssembledOutput, BuildOutput, SourceRef};
pub use detector::{DetectRequest, DetectResponse, FixtureDetector, ImageRef, Label};
pub use filter::{FilterLabels, FilteredLabels};
pub use model::{ModelBody, ModelRequest, ModelResponse, SamplingConfig, StaticTextModel};
pub use store::{FsObjectStore, PutAck, PutRequest};
