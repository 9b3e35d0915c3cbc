//! Core notification monitoring for StepzSync
//!
//! This crate contains the notification monitor: its lifecycle, the
//! per-session subscription worker, configuration, and the interfaces to the
//! identity and presentation layers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod monitor;
pub mod presentation;
pub mod session;

pub use auth::{IdentityProvider, SessionIdentity};
pub use config::MonitorConfig;
pub use error::{ErrorKind, MonitorError, Result};
pub use monitor::{MonitorState, NotificationMonitor};
pub use presentation::{body_preview, PresentationObserver, Presenter};
pub use session::{SessionId, SessionInfo};
