//! Monitor error types

use notify_client::SourceError;
use std::fmt;

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors surfaced by the notification monitor
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Remote source failure
    #[error("Notification source error: {0}")]
    Source(#[from] SourceError),

    /// The monitor task is no longer running
    #[error("Notification monitor has shut down")]
    ShutDown,
}

impl MonitorError {
    /// Classify the error, if it belongs to the monitoring taxonomy
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            MonitorError::Source(err) => Some(ErrorKind::of_source(err)),
            MonitorError::ShutDown => None,
        }
    }
}

/// Failure classes and how the monitor reacts to them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Source unreachable or stream lost; retried with backoff
    ConnectionFailure,
    /// A remote read exceeded its limit; handled as a connection failure
    Timeout,
    /// One record could not be decoded; dropped, batch continues
    MalformedEvent,
    /// An observer failed; isolated, delivery continues
    ObserverFailure,
}

impl ErrorKind {
    /// Classify a source failure
    pub fn of_source(err: &SourceError) -> Self {
        match err {
            SourceError::Timeout(_) => ErrorKind::Timeout,
            SourceError::Json(_) => ErrorKind::MalformedEvent,
            _ => ErrorKind::ConnectionFailure,
        }
    }

    /// Short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionFailure => "connection-failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::MalformedEvent => "malformed-event",
            ErrorKind::ObserverFailure => "observer-failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
