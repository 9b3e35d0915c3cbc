//! Bounded remote reads

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A remote read did not complete within its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("read did not complete within {limit:?}")]
pub struct ReadTimeout {
    limit: Duration,
}

impl ReadTimeout {
    /// The limit that elapsed
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

/// Run a remote read, giving up after `limit`
///
/// The inner future is dropped on elapse, which cancels the read.
pub async fn bounded<F>(limit: Duration, read: F) -> Result<F::Output, ReadTimeout>
where
    F: Future,
{
    tokio::time::timeout(limit, read).await.map_err(|_| ReadTimeout { limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_completes() {
        let value = bounded(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_elapses() {
        let result = bounded(Duration::from_millis(50), std::future::pending::<()>()).await;

        let err = result.unwrap_err();
        assert_eq!(err.limit(), Duration::from_millis(50));
        assert!(err.to_string().contains("50ms"));
    }
}
