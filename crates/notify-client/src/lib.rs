//! Remote notification source client
//!
//! This crate provides the notification event model, wire decoding, the
//! source/subscription abstractions consumed by the monitor, and an HTTP
//! long-poll implementation of the remote notification source.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod http;
pub mod source;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use http::{ApiClientConfig, HttpNotificationSource};
pub use source::{NotificationSource, NotificationSubscription, WireRecord};
pub use types::{
    DecodeError, NotificationCategory, NotificationEvent, NotificationId, NotificationKind, UserId,
};

/// Result type for remote source operations
pub type Result<T> = std::result::Result<T, SourceError>;

/// Error types for remote source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error with status code and message
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },

    /// The remote read did not complete in time
    #[error("Read timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The subscription stream was closed by the remote side
    #[error("Subscription closed")]
    Closed,

    /// No authenticated user to key the request with
    #[error("No authenticated user")]
    Unauthenticated,

    /// The configured service URL cannot be used
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),
}

impl SourceError {
    /// Whether the failure is transient and the connection should be retried
    ///
    /// Network failure statuses: 408, 425, 429, 500, 502, 503, 504, 522, 524
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network(_)
            | SourceError::Timeout(_)
            | SourceError::Closed
            | SourceError::Unauthenticated => true,
            SourceError::Api { status, .. } => {
                matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524)
            }
            SourceError::Json(_) | SourceError::InvalidUrl(_) => false,
        }
    }
}

impl From<networking::ReadTimeout> for SourceError {
    fn from(err: networking::ReadTimeout) -> Self {
        SourceError::Timeout(err.limit())
    }
}
