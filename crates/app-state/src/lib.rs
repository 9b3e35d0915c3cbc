//! Notification state for StepzSync
//!
//! This crate owns the in-memory state behind unread notification
//! monitoring: the set of already-surfaced ids, the reconciler that filters
//! fresh batches against it, the observer registry, and the unread badge.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod observer;
pub mod reconciler;
pub mod seen;
pub mod unread;

pub use observer::{DispatchReport, NotificationObserver, ObserverId, ObserverRegistry};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use seen::SeenSet;
pub use unread::{UnreadBadge, UnreadDisplay};
