//! Observers of surfaced notifications
//!
//! Observers (badge counters, snackbar presentation) are registered with an
//! [`ObserverRegistry`] and receive every surfaced notification synchronously,
//! in registration order. A failing observer, whether it returns an error or
//! panics, is logged and skipped; delivery to the remaining observers
//! continues.

use notify_client::NotificationEvent;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receiver of surfaced notifications
pub trait NotificationObserver: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Handle one surfaced notification
    fn on_notification(&self, event: &NotificationEvent) -> anyhow::Result<()>;
}

impl<F> NotificationObserver for F
where
    F: Fn(&NotificationEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_notification(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Handle returned by [`ObserverRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Outcome of delivering notifications to observers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Successful observer deliveries
    pub delivered: usize,
    /// Observer deliveries that returned an error or panicked
    pub failed: usize,
}

impl std::ops::AddAssign for DispatchReport {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// Ordered set of registered observers
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<(ObserverId, Arc<dyn NotificationObserver>)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer at the end of the delivery order
    pub fn register(&self, observer: Arc<dyn NotificationObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Remove an observer, returning whether it was registered
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether no observers are registered
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Deliver one notification to every observer
    pub fn dispatch(&self, event: &NotificationEvent) -> DispatchReport {
        // Snapshot so observers may register or unregister during delivery
        let observers: Vec<_> = self.observers.read().iter().map(|(_, o)| Arc::clone(o)).collect();
        let mut report = DispatchReport::default();

        for observer in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_notification(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        observer = observer.name(),
                        notification = %event.id(),
                        error = %e,
                        "Observer failed to handle notification"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        observer = observer.name(),
                        notification = %event.id(),
                        "Observer panicked while handling notification"
                    );
                }
            }
        }

        report
    }
}
