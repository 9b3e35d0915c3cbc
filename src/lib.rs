//! StepzSync notification core
//!
//! Re-exports the workspace crates and provides process-wide tracing setup.

#![warn(missing_docs)]

pub use app_core;
pub use app_state;
pub use networking;
pub use notify_client;

pub use app_core::{MonitorConfig, MonitorState, NotificationMonitor};
pub use app_state::{NotificationObserver, UnreadBadge};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Calling this more
/// than once, or after another subscriber was installed, has no effect.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// Install a subscriber writing to the test harness output
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
