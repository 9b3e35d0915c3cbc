//! Networking utilities for StepzSync
//!
//! This crate provides the reconnect backoff schedule used by long-lived
//! connections, a helper bounding remote reads by a timeout, and serde
//! helpers for duration-valued configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod duration_ms;
pub mod retry;
pub mod timeout;

pub use retry::{BackoffConfig, ReconnectBackoff};
pub use timeout::{bounded, ReadTimeout};
