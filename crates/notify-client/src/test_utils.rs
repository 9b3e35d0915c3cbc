//! Test utilities and fixtures for notification source testing
//!
//! This module provides an in-memory [`ScriptedSource`] whose connection
//! behaviour can be driven from a test, plus wire record fixtures drawn from
//! the backend's notification catalogue.

#![allow(dead_code)] // Test utilities may not all be used yet

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::source::{NotificationSource, NotificationSubscription, WireRecord};
use crate::types::{NotificationEvent, UserId};
use crate::{Result, SourceError};

/// Wire record fixtures
pub mod fixtures {
    use super::*;
    use serde_json::json;

    /// Fixed creation time (2024-05-01 10:00:00 UTC)
    pub const CREATED_AT: &str = "2024-05-01T10:00:00Z";

    /// Incoming friend request
    pub fn friend_request(id: &str) -> WireRecord {
        json!({
            "id": id,
            "type": "FriendRequest",
            "data": {"userId": "user-sam", "userName": "Sam", "mutualFriends": 3},
            "createdAt": CREATED_AT,
        })
    }

    /// Direct chat message
    pub fn chat_message(id: &str, body: &str) -> WireRecord {
        json!({
            "id": id,
            "type": "ChatMessage",
            "data": {"senderName": "Alex", "chatRoomId": "room-1", "body": body},
            "createdAt": CREATED_AT,
        })
    }

    /// Race started
    pub fn race_begin(id: &str) -> WireRecord {
        json!({
            "id": id,
            "type": "RaceBegin",
            "data": {"raceId": "race-1", "raceName": "Sunday 5k"},
            "createdAt": CREATED_AT,
        })
    }

    /// Record with no id, which decoding rejects
    pub fn malformed() -> WireRecord {
        json!({"type": "ChatMessage", "createdAt": CREATED_AT})
    }

    /// Decoded friend request event
    pub fn event(id: &str) -> NotificationEvent {
        NotificationEvent::from_wire(&friend_request(id)).unwrap()
    }

    /// Decoded events for each id, in order
    pub fn events(ids: &[&str]) -> Vec<NotificationEvent> {
        ids.iter().map(|id| event(id)).collect()
    }
}

type Delivery = Result<Vec<WireRecord>>;

#[derive(Default)]
struct ScriptState {
    pending: Vec<WireRecord>,
    failing_subscribes: usize,
    failing_fetches: usize,
    live: Option<mpsc::UnboundedSender<Delivery>>,
    subscribed_users: Vec<UserId>,
}

/// In-memory notification source driven by the test
#[derive(Clone, Default)]
pub struct ScriptedSource {
    state: Arc<Mutex<ScriptState>>,
    subscribe_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// Create a source with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the records returned by `fetch_pending`
    pub fn set_pending(&self, records: Vec<WireRecord>) {
        self.state.lock().pending = records;
    }

    /// Make the next `n` subscribe calls fail with a network-style error
    pub fn fail_next_subscribes(&self, n: usize) {
        self.state.lock().failing_subscribes = n;
    }

    /// Make the next `n` fetch calls fail with a network-style error
    pub fn fail_next_fetches(&self, n: usize) {
        self.state.lock().failing_fetches = n;
    }

    /// Deliver a batch on the live subscription
    ///
    /// Returns false if no subscription is open.
    pub fn push(&self, records: Vec<WireRecord>) -> bool {
        match self.state.lock().live {
            Some(ref tx) => tx.send(Ok(records)).is_ok(),
            None => false,
        }
    }

    /// Drop the live subscription from the remote side
    pub fn drop_connection(&self) -> bool {
        match self.state.lock().live.take() {
            Some(tx) => tx.send(Err(SourceError::Closed)).is_ok(),
            None => false,
        }
    }

    /// Number of subscribe attempts so far
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Number of fetch attempts so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of subscriptions currently held open by a consumer
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Users that opened subscriptions, in order
    pub fn subscribed_users(&self) -> Vec<UserId> {
        self.state.lock().subscribed_users.clone()
    }
}

#[async_trait]
impl NotificationSource for ScriptedSource {
    async fn subscribe(&self, user: &UserId) -> Result<Box<dyn NotificationSubscription>> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock();
        if state.failing_subscribes > 0 {
            state.failing_subscribes -= 1;
            return Err(SourceError::Api { status: 503, message: "scripted outage".to_string() });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.live = Some(tx);
        state.subscribed_users.push(user.clone());
        self.active.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedSubscription { rx, active: Arc::clone(&self.active) }))
    }

    async fn fetch_pending(&self, _user: &UserId) -> Result<Vec<WireRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock();
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(SourceError::Api { status: 503, message: "scripted outage".to_string() });
        }
        Ok(state.pending.clone())
    }
}

struct ScriptedSubscription {
    rx: mpsc::UnboundedReceiver<Delivery>,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl NotificationSubscription for ScriptedSubscription {
    async fn next_batch(&mut self) -> Result<Vec<WireRecord>> {
        self.rx.recv().await.unwrap_or(Err(SourceError::Closed))
    }
}

impl Drop for ScriptedSubscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
