//! Remote notification source abstractions
//!
//! The monitor consumes the remote side through two primitives: a push
//! subscription yielding batches of raw records, and a one-shot pull of the
//! currently pending records. Records stay raw JSON until the consumer
//! decodes them, so one malformed record never poisons a whole batch.

use async_trait::async_trait;

use crate::types::UserId;
use crate::Result;

/// Raw notification record as delivered by the remote source
pub type WireRecord = serde_json::Value;

/// An open subscription to the remote notification stream
///
/// Dropping the subscription releases it.
#[async_trait]
pub trait NotificationSubscription: Send {
    /// Wait for the next batch of records
    ///
    /// An empty batch is a keep-alive. `Err(SourceError::Closed)` means the
    /// remote side ended the stream.
    async fn next_batch(&mut self) -> Result<Vec<WireRecord>>;
}

/// Remote source of notifications for an authenticated user
#[async_trait]
pub trait NotificationSource: Send + Sync {
    /// Open a push subscription for the user
    async fn subscribe(&self, user: &UserId) -> Result<Box<dyn NotificationSubscription>>;

    /// Fetch the records currently pending for the user
    async fn fetch_pending(&self, user: &UserId) -> Result<Vec<WireRecord>>;
}
