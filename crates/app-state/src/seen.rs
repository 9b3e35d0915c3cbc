//! Set of notification ids already surfaced to the user

use notify_client::NotificationId;
use std::collections::HashSet;

/// Ids of notifications that have been surfaced
///
/// Grows monotonically for the life of the process; only an explicit
/// app-level reset clears it.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    ids: HashSet<NotificationId>,
}

impl SeenSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id, returning true if it was not seen before
    pub fn insert(&mut self, id: NotificationId) -> bool {
        self.ids.insert(id)
    }

    /// Whether the id has been surfaced
    pub fn contains(&self, id: &NotificationId) -> bool {
        self.ids.contains(id)
    }

    /// Number of ids recorded
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing has been surfaced yet
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Forget every id
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
