//! Monitoring sessions
//!
//! A session is one start/stop cycle of the monitor. It owns the worker task
//! holding the remote subscription; dropping the session signals the worker
//! to stop, which releases the subscription.

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Opaque session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time view of the live session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session token
    pub id: SessionId,
    /// When `start` created the session
    pub started_at: DateTime<Utc>,
    /// Successful reconnects after a dropped connection
    pub reconnects: u32,
}

/// The live session, owned by the monitor task
pub(crate) struct MonitoringSession {
    info: SessionInfo,
    connected_once: bool,
    worker: WorkerHandle,
}

impl MonitoringSession {
    pub(crate) fn new(id: SessionId, worker: WorkerHandle) -> Self {
        Self {
            info: SessionInfo { id, started_at: Utc::now(), reconnects: 0 },
            connected_once: false,
            worker,
        }
    }

    pub(crate) fn id(&self) -> SessionId {
        self.info.id
    }

    pub(crate) fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Record an established connection, returning whether it was a reconnect
    pub(crate) fn record_connection(&mut self) -> bool {
        let reconnect = self.connected_once;
        self.connected_once = true;
        if reconnect {
            self.info.reconnects = self.info.reconnects.saturating_add(1);
        }
        reconnect
    }

    /// End the session, signalling its worker to stop
    pub(crate) fn stop(self) {
        self.worker.stop();
    }
}

/// Handle for controlling a session worker
///
/// When dropped, the worker is told to stop.
pub(crate) struct WorkerHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    _handle: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn new(stop_tx: oneshot::Sender<()>, handle: JoinHandle<()>) -> Self {
        Self { stop_tx: Some(stop_tx), _handle: handle }
    }

    /// Stop the worker
    pub(crate) fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropping_session_stops_worker() {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let _ = stop_rx.await;
            let _ = done_tx.send(());
        });

        let mut session = MonitoringSession::new(SessionId::new(), WorkerHandle::new(stop_tx, handle));
        assert!(!session.record_connection());
        assert!(session.record_connection());
        assert_eq!(session.info().reconnects, 1);

        session.stop();
        done_rx.await.unwrap();
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
