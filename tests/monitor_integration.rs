//! Notification monitor integration tests
//!
//! End-to-end lifecycle scenarios against the scripted in-memory source.

use notify_client::test_utils::{fixtures, ScriptedSource};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use stepzsync::app_core::SessionIdentity;
use stepzsync::app_state::UnreadDisplay;
use stepzsync::networking::BackoffConfig;
use stepzsync::notify_client::{NotificationCategory, NotificationEvent, UserId};
use stepzsync::{init_test_tracing, MonitorConfig, MonitorState, NotificationMonitor, UnreadBadge};

const WAIT: Duration = Duration::from_secs(5);

fn config() -> MonitorConfig {
    MonitorConfig::default().with_backoff(
        BackoffConfig::default()
            .with_initial_interval(Duration::from_millis(50))
            .with_max_interval(Duration::from_millis(200))
            .with_randomization_factor(0.0),
    )
}

fn setup(source: &ScriptedSource) -> (NotificationMonitor, Arc<Mutex<Vec<String>>>) {
    init_test_tracing();

    let monitor = NotificationMonitor::new(
        Arc::new(source.clone()),
        Arc::new(SessionIdentity::new(UserId::new("runner-42"))),
        config(),
    );

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    monitor.register_observer(Arc::new(move |event: &NotificationEvent| -> anyhow::Result<()> {
        sink.lock().push(event.id().to_string());
        Ok(())
    }));

    (monitor, delivered)
}

async fn wait_for_state(monitor: &NotificationMonitor, state: MonitorState) {
    let mut rx = monitor.subscribe_state();
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", state))
        .unwrap();
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

/// Let the monitor drain anything already in flight
async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

#[tokio::test]
async fn test_repeated_start_opens_one_subscription() {
    let source = ScriptedSource::new();
    let (monitor, _) = setup(&source);

    for _ in 0..5 {
        monitor.start();
    }
    wait_for_state(&monitor, MonitorState::Active).await;
    monitor.start();
    settle().await;

    assert_eq!(source.subscribe_calls(), 1);
    assert_eq!(source.active_subscriptions(), 1);

    let session = monitor.session().unwrap();
    monitor.start();
    settle().await;
    assert_eq!(monitor.session().unwrap().id, session.id);
}

#[tokio::test]
async fn test_drop_mid_session_reconnects_without_redelivery() {
    let source = ScriptedSource::new();
    source.set_pending(vec![fixtures::friend_request("fr-1")]);
    let (monitor, delivered) = setup(&source);

    monitor.start();
    wait_for_state(&monitor, MonitorState::Active).await;
    wait_until(|| delivered.lock().len() == 1).await;

    assert!(source.push(vec![fixtures::chat_message("chat-1", "Nice pace!")]));
    wait_until(|| delivered.lock().len() == 2).await;

    // Everything delivered so far is still pending server side, plus one
    // notification that arrived while disconnected
    source.set_pending(vec![
        fixtures::friend_request("fr-1"),
        fixtures::chat_message("chat-1", "Nice pace!"),
        fixtures::race_begin("race-1"),
    ]);
    assert!(source.drop_connection());

    wait_for_state(&monitor, MonitorState::Restarting).await;
    wait_for_state(&monitor, MonitorState::Active).await;
    wait_until(|| delivered.lock().len() == 3).await;
    settle().await;

    assert_eq!(*delivered.lock(), vec!["fr-1", "chat-1", "race-1"]);
    assert_eq!(source.subscribe_calls(), 2);
    assert_eq!(source.active_subscriptions(), 1);
    assert_eq!(monitor.session().unwrap().reconnects, 1);
}

#[tokio::test]
async fn test_stop_without_session_is_noop() {
    let source = ScriptedSource::new();
    let (monitor, delivered) = setup(&source);

    monitor.stop();
    settle().await;

    assert_eq!(monitor.state(), MonitorState::Stopped);
    assert!(monitor.session().is_none());
    assert_eq!(source.subscribe_calls(), 0);
    assert!(delivered.lock().is_empty());
}

#[tokio::test]
async fn test_stop_while_restarting_cancels_retry() {
    let source = ScriptedSource::new();
    source.fail_next_subscribes(usize::MAX);
    let (monitor, _) = setup(&source);

    monitor.start();
    wait_for_state(&monitor, MonitorState::Restarting).await;

    monitor.stop();
    wait_for_state(&monitor, MonitorState::Stopped).await;
    let attempts = source.subscribe_calls();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(source.subscribe_calls(), attempts);
    assert!(monitor.session().is_none());
}

#[tokio::test]
async fn test_no_delivery_after_stop() {
    let source = ScriptedSource::new();
    let (monitor, delivered) = setup(&source);

    monitor.start();
    wait_for_state(&monitor, MonitorState::Active).await;

    monitor.stop();
    wait_for_state(&monitor, MonitorState::Stopped).await;
    wait_until(|| source.active_subscriptions() == 0).await;

    assert!(!source.push(vec![fixtures::race_begin("late")]));
    settle().await;
    assert!(delivered.lock().is_empty());
}

#[tokio::test]
async fn test_manual_checks_race_live_session_without_duplicates() {
    let source = ScriptedSource::new();
    source.set_pending(vec![
        fixtures::friend_request("a"),
        fixtures::friend_request("b"),
        fixtures::race_begin("c"),
    ]);
    let (monitor, delivered) = setup(&source);

    monitor.start();
    let (first, second, third) = tokio::join!(
        monitor.check_for_unread_notifications(),
        monitor.check_for_unread_notifications(),
        monitor.check_for_unread_notifications(),
    );
    wait_for_state(&monitor, MonitorState::Active).await;
    settle().await;

    let surfaced_by_checks = first.unwrap().len() + second.unwrap().len() + third.unwrap().len();
    assert!(surfaced_by_checks <= 3);

    let mut ids = delivered.lock().clone();
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_malformed_live_records_are_dropped() {
    let source = ScriptedSource::new();
    let (monitor, delivered) = setup(&source);

    monitor.start();
    wait_for_state(&monitor, MonitorState::Active).await;

    assert!(source.push(vec![
        fixtures::friend_request("ok-1"),
        fixtures::malformed(),
        serde_json::json!({"id": "bad-category", "category": "weather", "createdAt": 0}),
        fixtures::chat_message("ok-2", "see you there"),
    ]));
    wait_until(|| delivered.lock().len() == 2).await;
    settle().await;

    assert_eq!(*delivered.lock(), vec!["ok-1", "ok-2"]);
    assert_eq!(monitor.state(), MonitorState::Active);
}

#[tokio::test]
async fn test_failing_observer_does_not_block_badge() {
    let source = ScriptedSource::new();
    let (monitor, delivered) = setup(&source);

    monitor.register_observer(Arc::new(|_: &NotificationEvent| -> anyhow::Result<()> {
        anyhow::bail!("presenter unavailable")
    }));
    let badge = Arc::new(UnreadBadge::new());
    monitor.register_observer(badge.clone());

    source.set_pending(vec![
        fixtures::friend_request("fr-1"),
        fixtures::chat_message("chat-1", "hi"),
        fixtures::chat_message("chat-2", "hello"),
    ]);
    let surfaced = monitor.check_for_unread_notifications().await.unwrap();

    assert_eq!(surfaced.len(), 3);
    assert_eq!(delivered.lock().len(), 3);
    assert_eq!(badge.count(NotificationCategory::ChatMessage), 2);
    assert_eq!(badge.display(), UnreadDisplay::Count(3));
}

#[tokio::test]
async fn test_seen_set_survives_restart() {
    let source = ScriptedSource::new();
    source.set_pending(vec![fixtures::friend_request("fr-1")]);
    let (monitor, delivered) = setup(&source);

    monitor.start();
    wait_until(|| delivered.lock().len() == 1).await;
    monitor.stop();
    wait_for_state(&monitor, MonitorState::Stopped).await;

    monitor.start();
    wait_for_state(&monitor, MonitorState::Active).await;
    wait_until(|| source.fetch_calls() == 2).await;
    settle().await;
    assert_eq!(*delivered.lock(), vec!["fr-1"]);

    monitor.reset_seen();
    let surfaced = monitor.check_for_unread_notifications().await.unwrap();
    assert_eq!(surfaced.len(), 1);
    assert_eq!(delivered.lock().len(), 2);

    monitor.shutdown().await;
}
