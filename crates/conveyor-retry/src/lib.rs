//! Conveyor Retry
//!
//! Given a state's retry rules, the kind of the error just observed, and how
//! many attempts the state has already made, [`decide`] answers one question:
//! retry after a delay, or fail the execution. The delay is a scheduling hint
//! for the engine — nothing in this crate sleeps.

mod controller;

pub use controller::{backoff_delay, decide, RetryDecision};
