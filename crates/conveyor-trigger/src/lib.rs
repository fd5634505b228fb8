//! Conveyor Trigger
//!
//! This crate adapts inbound storage-event notifications into workflow
//! executions. An [`ObjectCreated`] event seeds the initial execution context
//! (under `$.detail`), the [`TriggerAdapter`] starts executions directly, and
//! the [`TriggerRunner`] owns an mpsc channel so event sources can hand off
//! notifications and have each one run as an independent, concurrent
//! execution.
//!
//! Delivery is at-least-once: nothing here deduplicates. A redelivered event
//! re-runs the whole pipeline; the storage-write task's derived key makes the
//! duplicate land on the same destination.

mod event;
mod runner;

pub use event::{BucketRef, ObjectCreated, ObjectRef};
pub use runner::{ChannelClosed, TriggerAdapter, TriggerRunner};
