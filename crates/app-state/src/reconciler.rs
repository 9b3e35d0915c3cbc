//! Unread notification reconciliation
//!
//! The [`Reconciler`] compares freshly fetched notifications against the
//! [`SeenSet`] and delivers only the net-new ones to observers. It is not
//! internally synchronized: the owner must serialize access, which is what
//! keeps a notification from being dispatched twice when a manual check and
//! a live delivery race.

use notify_client::NotificationEvent;
use std::sync::Arc;

use crate::observer::{DispatchReport, ObserverRegistry};
use crate::seen::SeenSet;

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Net-new notifications, in source order
    pub surfaced: Vec<NotificationEvent>,
    /// Aggregate observer delivery result
    pub report: DispatchReport,
}

/// Deduplicates notifications and dispatches the new ones
pub struct Reconciler {
    seen: SeenSet,
    observers: Arc<ObserverRegistry>,
}

impl Reconciler {
    /// Create a reconciler delivering to the given observers
    pub fn new(observers: Arc<ObserverRegistry>) -> Self {
        Self { seen: SeenSet::new(), observers }
    }

    /// Keep only notifications not yet seen, recording them as seen
    ///
    /// Input order is preserved and a duplicate id within the batch surfaces
    /// once, at its first occurrence.
    pub fn reconcile(&mut self, events: Vec<NotificationEvent>) -> Vec<NotificationEvent> {
        events
            .into_iter()
            .filter(|event| self.seen.insert(event.id().clone()))
            .collect()
    }

    /// Deliver notifications to every observer, in order
    pub fn dispatch(&self, events: &[NotificationEvent]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for event in events {
            report += self.observers.dispatch(event);
        }
        report
    }

    /// Reconcile a batch and dispatch what surfaced
    pub fn process(&mut self, events: Vec<NotificationEvent>) -> ReconcileOutcome {
        let surfaced = self.reconcile(events);
        let report = self.dispatch(&surfaced);
        ReconcileOutcome { surfaced, report }
    }

    /// Forget every surfaced id (explicit app-level reset)
    pub fn reset_seen(&mut self) {
        self.seen.clear();
    }

    /// Ids surfaced so far
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NotificationObserver;
    use notify_client::test_utils::fixtures;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn ids(events: &[NotificationEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id().as_str()).collect()
    }

    #[test]
    fn test_reconcile_dedups_preserving_first_occurrence() {
        let mut reconciler = Reconciler::new(Arc::new(ObserverRegistry::new()));

        let surfaced = reconciler.reconcile(fixtures::events(&["A", "B", "A", "C"]));
        assert_eq!(ids(&surfaced), vec!["A", "B", "C"]);

        let again = reconciler.reconcile(fixtures::events(&["A"]));
        assert!(again.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut reconciler = Reconciler::new(Arc::new(ObserverRegistry::new()));
        let batch = fixtures::events(&["x", "y", "z"]);

        assert_eq!(reconciler.reconcile(batch.clone()).len(), 3);
        assert!(reconciler.reconcile(batch).is_empty());
        assert_eq!(reconciler.seen().len(), 3);
    }

    #[test]
    fn test_process_dispatches_only_new() {
        let observers = Arc::new(ObserverRegistry::new());
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&delivered);
        let observer: Arc<dyn NotificationObserver> =
            Arc::new(move |event: &NotificationEvent| -> anyhow::Result<()> {
                sink.lock().push(event.id().to_string());
                Ok(())
            });
        observers.register(observer);

        let mut reconciler = Reconciler::new(observers);

        let first = reconciler.process(fixtures::events(&["a", "b"]));
        assert_eq!(first.report.delivered, 2);

        let second = reconciler.process(fixtures::events(&["b", "c"]));
        assert_eq!(ids(&second.surfaced), vec!["c"]);
        assert_eq!(*delivered.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_observer_failure_does_not_abort_pass() {
        let observers = Arc::new(ObserverRegistry::new());
        observers.register(Arc::new(|event: &NotificationEvent| -> anyhow::Result<()> {
            if event.id().as_str() == "bad" {
                anyhow::bail!("cannot render");
            }
            Ok(())
        }));

        let mut reconciler = Reconciler::new(observers);
        let outcome = reconciler.process(fixtures::events(&["ok-1", "bad", "ok-2"]));

        assert_eq!(outcome.surfaced.len(), 3);
        assert_eq!(outcome.report, DispatchReport { delivered: 2, failed: 1 });
        assert!(reconciler.seen().contains(&"bad".into()));
    }

    #[test]
    fn test_reset_seen_allows_resurfacing() {
        let mut reconciler = Reconciler::new(Arc::new(ObserverRegistry::new()));

        reconciler.reconcile(fixtures::events(&["a"]));
        reconciler.reset_seen();

        assert_eq!(reconciler.reconcile(fixtures::events(&["a"])).len(), 1);
    }

    fn batch(ids: &[String]) -> Vec<NotificationEvent> {
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        fixtures::events(&refs)
    }

    fn first_occurrences(ids: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any batch, reconciling it a second time surfaces nothing.
        #[test]
        fn prop_reconcile_is_idempotent(sequence in prop::collection::vec("[a-f]{1,2}", 0..40)) {
            let mut reconciler = Reconciler::new(Arc::new(ObserverRegistry::new()));

            reconciler.reconcile(batch(&sequence));
            prop_assert!(reconciler.reconcile(batch(&sequence)).is_empty());
        }

        /// For any batch with duplicate ids, each id surfaces once, in order of
        /// its first occurrence.
        #[test]
        fn prop_reconcile_keeps_first_occurrence(sequence in prop::collection::vec("[a-f]{1,2}", 0..40)) {
            let mut reconciler = Reconciler::new(Arc::new(ObserverRegistry::new()));

            let surfaced = reconciler.reconcile(batch(&sequence));
            prop_assert_eq!(ids(&surfaced), first_occurrences(&sequence));
        }

        /// A later batch surfaces exactly its ids that no earlier batch held.
        #[test]
        fn prop_reconcile_is_monotonic(
            first in prop::collection::vec("[a-f]", 0..20),
            second in prop::collection::vec("[a-f]", 0..20),
        ) {
            let mut reconciler = Reconciler::new(Arc::new(ObserverRegistry::new()));
            reconciler.reconcile(batch(&first));

            let earlier: HashSet<&str> = first.iter().map(String::as_str).collect();
            let expected: Vec<String> = first_occurrences(&second)
                .into_iter()
                .filter(|id| !earlier.contains(id.as_str()))
                .collect();

            let surfaced = reconciler.reconcile(batch(&second));
            prop_assert_eq!(ids(&surfaced), expected);
        }
    }
}
