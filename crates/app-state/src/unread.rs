//! Unread notification badge
//!
//! This module provides an observer that counts surfaced notifications per
//! category and publishes the total as a badge value for the UI to bind to.

use notify_client::{NotificationCategory, NotificationEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::watch;

use crate::observer::NotificationObserver;

/// Maximum unread count to track (displays as "30+")
pub const MAX_DISPLAY_COUNT: u32 = 30;

/// Unread count display value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreadDisplay {
    /// No unread items
    #[default]
    None,
    /// Specific count (1-29)
    Count(u32),
    /// 30 or more unread items
    Many,
}

impl UnreadDisplay {
    /// Create from a numeric count
    pub fn from_count(count: u32) -> Self {
        match count {
            0 => UnreadDisplay::None,
            n if n >= MAX_DISPLAY_COUNT => UnreadDisplay::Many,
            n => UnreadDisplay::Count(n),
        }
    }

    /// Check if there are any unread items
    pub fn has_unread(&self) -> bool {
        !matches!(self, UnreadDisplay::None)
    }
}

impl std::fmt::Display for UnreadDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnreadDisplay::None => Ok(()),
            UnreadDisplay::Count(n) => write!(f, "{}", n),
            UnreadDisplay::Many => write!(f, "{}+", MAX_DISPLAY_COUNT),
        }
    }
}

/// Badge counting surfaced notifications until they are marked read
///
/// # Example
///
/// ```no_run
/// use app_state::observer::ObserverRegistry;
/// use app_state::unread::{UnreadBadge, UnreadDisplay};
/// use std::sync::Arc;
///
/// let badge = Arc::new(UnreadBadge::new());
/// let registry = ObserverRegistry::new();
/// registry.register(badge.clone());
///
/// let rx = badge.subscribe();
/// assert_eq!(*rx.borrow(), UnreadDisplay::None);
/// ```
pub struct UnreadBadge {
    counts: Mutex<HashMap<NotificationCategory, u32>>,
    display_tx: watch::Sender<UnreadDisplay>,
}

impl UnreadBadge {
    /// Create an empty badge
    pub fn new() -> Self {
        let (display_tx, _) = watch::channel(UnreadDisplay::None);
        Self { counts: Mutex::new(HashMap::new()), display_tx }
    }

    /// Unread count for one category
    pub fn count(&self, category: NotificationCategory) -> u32 {
        self.counts.lock().get(&category).copied().unwrap_or(0)
    }

    /// Unread count across all categories
    pub fn total(&self) -> u32 {
        saturating_total(&self.counts.lock())
    }

    /// Current badge display
    pub fn display(&self) -> UnreadDisplay {
        *self.display_tx.borrow()
    }

    /// Subscribe to badge display changes
    pub fn subscribe(&self) -> watch::Receiver<UnreadDisplay> {
        self.display_tx.subscribe()
    }

    /// Mark one category as read
    pub fn mark_read(&self, category: NotificationCategory) {
        let mut counts = self.counts.lock();
        counts.remove(&category);
        self.publish(&counts);
    }

    /// Mark everything as read
    pub fn mark_all_read(&self) {
        let mut counts = self.counts.lock();
        counts.clear();
        self.publish(&counts);
    }

    fn publish(&self, counts: &HashMap<NotificationCategory, u32>) {
        let display = UnreadDisplay::from_count(saturating_total(counts));
        self.display_tx.send_if_modified(|current| {
            if *current == display {
                false
            } else {
                *current = display;
                true
            }
        });
    }
}

fn saturating_total(counts: &HashMap<NotificationCategory, u32>) -> u32 {
    counts.values().fold(0, |total, count| total.saturating_add(*count))
}

impl Default for UnreadBadge {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationObserver for UnreadBadge {
    fn name(&self) -> &str {
        "unread-badge"
    }

    fn on_notification(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        let mut counts = self.counts.lock();
        let entry = counts.entry(event.category()).or_insert(0);
        *entry = entry.saturating_add(1);
        self.publish(&counts);
        Ok(())
    }
}
