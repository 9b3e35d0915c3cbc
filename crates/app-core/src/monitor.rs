//! Notification monitor
//!
//! The monitor is a process-wide background watcher. A single task owns the
//! [`Reconciler`] and the live [`MonitoringSession`]; every operation on a
//! [`NotificationMonitor`] handle is a message to that task, so the seen set
//! has exactly one writer and a manual check can never race a live delivery
//! into a duplicate dispatch.
//!
//! Each session runs one worker task holding the remote subscription:
//!
//! ```text
//! start ──► Starting ──connected──► Active ──drop/timeout──► Restarting
//!              │                      ▲                          │
//!              └──────connect failed──┼──────────────────────────┤
//!                                     └────────reconnected───────┘
//! stop from any state ──► Stopped
//! ```
//!
//! `Active` is entered as soon as the subscription is open. The worker then
//! pulls the pending set and the monitor reconciles it before any live batch.
//! If that pull fails the subscription stays open and the pull is retried
//! after each delivery or keep-alive until it succeeds.

use app_state::{NotificationObserver, ObserverId, ObserverRegistry, Reconciler};
use networking::ReconnectBackoff;
use notify_client::{NotificationEvent, NotificationSource, SourceError, UserId, WireRecord};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace, warn};

use crate::auth::IdentityProvider;
use crate::config::MonitorConfig;
use crate::error::{ErrorKind, MonitorError, Result};
use crate::session::{MonitoringSession, SessionId, SessionInfo, WorkerHandle};

/// Lifecycle state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MonitorState {
    /// No session
    #[default]
    Stopped,
    /// Session created, first connection in progress
    Starting,
    /// Subscription open
    Active,
    /// Connection lost, waiting to reconnect
    Restarting,
}

impl MonitorState {
    /// Whether a session exists in this state
    pub fn has_session(&self) -> bool {
        !matches!(self, MonitorState::Stopped)
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Stopped => "stopped",
            MonitorState::Starting => "starting",
            MonitorState::Active => "active",
            MonitorState::Restarting => "restarting",
        };
        f.write_str(name)
    }
}

enum Command {
    Start,
    Stop,
    Reconcile { events: Vec<NotificationEvent>, reply: oneshot::Sender<Vec<NotificationEvent>> },
    ResetSeen,
    Shutdown { done: oneshot::Sender<()> },
}

/// Connection signals from a session worker
enum SessionSignal {
    Connected { user: UserId },
    CatchUp(Vec<WireRecord>),
    CatchUpFailed(SourceError),
    Batch(Vec<WireRecord>),
    Dropped { error: SourceError, attempt: u32, retry_in: Duration },
}

type SignalTx = mpsc::UnboundedSender<(SessionId, SessionSignal)>;

/// Handle to the notification monitor
///
/// Cheap to clone; all clones drive the same monitor. The monitor task ends
/// when [`shutdown`](Self::shutdown) is called or every handle is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use app_core::auth::SessionIdentity;
/// use app_core::{MonitorConfig, NotificationMonitor};
/// use notify_client::{ApiClientConfig, HttpNotificationSource, UserId};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = HttpNotificationSource::new(ApiClientConfig::new("https://api.stepzsync.com"))?;
///     let identity = SessionIdentity::new(UserId::new("user-1"));
///
///     let monitor =
///         NotificationMonitor::new(Arc::new(source), Arc::new(identity), MonitorConfig::default());
///
///     // Home surface became visible
///     monitor.start();
///
///     // Pull-to-refresh
///     let fresh = monitor.check_for_unread_notifications().await?;
///     println!("{} new notifications", fresh.len());
///
///     // Home surface torn down
///     monitor.stop();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct NotificationMonitor {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<MonitorState>,
    session_rx: watch::Receiver<Option<SessionInfo>>,
    observers: Arc<ObserverRegistry>,
    source: Arc<dyn NotificationSource>,
    identity: Arc<dyn IdentityProvider>,
    config: MonitorConfig,
}

impl NotificationMonitor {
    /// Spawn the monitor task
    ///
    /// Must be called from within a Tokio runtime. The monitor starts in
    /// [`MonitorState::Stopped`].
    pub fn new(
        source: Arc<dyn NotificationSource>,
        identity: Arc<dyn IdentityProvider>,
        config: MonitorConfig,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(MonitorState::Stopped);
        let (session_tx, session_rx) = watch::channel(None);
        let observers = Arc::new(ObserverRegistry::new());

        let actor = MonitorActor {
            commands: command_rx,
            signals: signal_rx,
            signal_tx,
            state_tx,
            session_tx,
            reconciler: Reconciler::new(Arc::clone(&observers)),
            session: None,
            source: Arc::clone(&source),
            identity: Arc::clone(&identity),
            config: config.clone(),
        };
        tokio::spawn(actor.run());

        Self { commands, state_rx, session_rx, observers, source, identity, config }
    }

    /// Begin monitoring
    ///
    /// Idempotent: does nothing if a session already exists. Returns
    /// immediately; connection failures are logged and retried in the
    /// background.
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// End monitoring
    ///
    /// Idempotent: does nothing without a session. Cancels the subscription
    /// and any pending reconnect. The seen set is kept.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Fetch the pending notifications once and surface the unseen ones
    ///
    /// Works with or without a live session and is safe to call while one
    /// is running. Returns the notifications surfaced by this call. A failed
    /// fetch is returned to the caller and not retried.
    pub async fn check_for_unread_notifications(&self) -> Result<Vec<NotificationEvent>> {
        if self.commands.is_closed() {
            return Err(MonitorError::ShutDown);
        }

        let records = match self.fetch_pending().await {
            Ok(records) => records,
            Err(err) => {
                warn!(kind = %ErrorKind::of_source(&err), error = %err, "Manual notification check failed");
                return Err(err.into());
            }
        };
        let events = decode_batch(None, records);

        let (reply, surfaced) = oneshot::channel();
        if self.commands.send(Command::Reconcile { events, reply }).is_err() {
            return Err(MonitorError::ShutDown);
        }
        surfaced.await.map_err(|_| MonitorError::ShutDown)
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        *self.state_rx.borrow()
    }

    /// Watch lifecycle state changes
    pub fn subscribe_state(&self) -> watch::Receiver<MonitorState> {
        self.state_rx.clone()
    }

    /// Snapshot of the live session, if any
    pub fn session(&self) -> Option<SessionInfo> {
        self.session_rx.borrow().clone()
    }

    /// Register an observer for surfaced notifications
    ///
    /// Observers are called in registration order.
    pub fn register_observer(&self, observer: Arc<dyn NotificationObserver>) -> ObserverId {
        self.observers.register(observer)
    }

    /// Remove an observer, returning whether it was registered
    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.observers.unregister(id)
    }

    /// Forget every surfaced notification id
    pub fn reset_seen(&self) {
        self.send(Command::ResetSeen);
    }

    /// Stop any session and end the monitor task
    ///
    /// Later calls on any handle are no-ops, and manual checks fail with
    /// [`MonitorError::ShutDown`].
    pub async fn shutdown(&self) {
        let (done, finished) = oneshot::channel();
        if self.commands.send(Command::Shutdown { done }).is_ok() {
            let _ = finished.await;
        }
    }

    async fn fetch_pending(&self) -> notify_client::Result<Vec<WireRecord>> {
        let user = self.identity.current_user().ok_or(SourceError::Unauthenticated)?;
        Ok(networking::bounded(self.config.read_timeout, self.source.fetch_pending(&user)).await??)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Notification monitor has shut down, ignoring command");
        }
    }
}

/// Task owning the reconciler and the live session
struct MonitorActor {
    commands: mpsc::UnboundedReceiver<Command>,
    signals: mpsc::UnboundedReceiver<(SessionId, SessionSignal)>,
    signal_tx: SignalTx,
    state_tx: watch::Sender<MonitorState>,
    session_tx: watch::Sender<Option<SessionInfo>>,
    reconciler: Reconciler,
    session: Option<MonitoringSession>,
    source: Arc<dyn NotificationSource>,
    identity: Arc<dyn IdentityProvider>,
    config: MonitorConfig,
}

impl MonitorActor {
    async fn run(mut self) {
        let done = loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { done }) => break Some(done),
                    Some(command) => self.handle_command(command),
                    None => break None,
                },
                Some((session, signal)) = self.signals.recv() => {
                    self.handle_signal(session, signal);
                }
            }
        };

        self.stop_session();
        self.commands.close();
        debug!("Notification monitor shut down");
        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start => self.start_session(),
            Command::Stop => {
                if self.session.is_none() {
                    debug!("No monitoring session to stop");
                }
                self.stop_session();
            }
            Command::Reconcile { events, reply } => {
                let surfaced = self.process(None, events);
                let _ = reply.send(surfaced);
            }
            Command::ResetSeen => {
                info!(forgotten = self.reconciler.seen().len(), "Resetting seen notifications");
                self.reconciler.reset_seen();
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn start_session(&mut self) {
        if let Some(session) = &self.session {
            debug!(session_id = %session.id(), "Monitoring already running");
            return;
        }

        let id = SessionId::new();
        let (stop_tx, stop_rx) = oneshot::channel();
        let worker = SessionWorker {
            session: id,
            source: Arc::clone(&self.source),
            identity: Arc::clone(&self.identity),
            read_timeout: self.config.read_timeout,
            signals: self.signal_tx.clone(),
        };
        let handle = tokio::spawn(worker.run(self.config.backoff.build(), stop_rx));

        let session = MonitoringSession::new(id, WorkerHandle::new(stop_tx, handle));
        info!(session_id = %id, "Notification monitoring started");
        self.session_tx.send_replace(Some(session.info().clone()));
        self.session = Some(session);
        self.set_state(MonitorState::Starting);
    }

    fn stop_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                session_id = %session.id(),
                reconnects = session.info().reconnects,
                "Notification monitoring stopped"
            );
            session.stop();
            self.session_tx.send_replace(None);
        }
        self.set_state(MonitorState::Stopped);
    }

    fn handle_signal(&mut self, id: SessionId, signal: SessionSignal) {
        let current = match &mut self.session {
            Some(session) if session.id() == id => session,
            _ => {
                trace!(session_id = %id, "Discarding signal from a stale session");
                return;
            }
        };

        match signal {
            SessionSignal::Connected { user } => {
                if current.record_connection() {
                    info!(
                        session_id = %id,
                        user = %user,
                        reconnects = current.info().reconnects,
                        "Notification subscription restored"
                    );
                } else {
                    info!(session_id = %id, user = %user, "Notification subscription open");
                }
                self.session_tx.send_replace(Some(current.info().clone()));
                self.set_state(MonitorState::Active);
            }
            SessionSignal::CatchUp(records) | SessionSignal::Batch(records) => {
                let events = decode_batch(Some(id), records);
                self.process(Some(id), events);
            }
            SessionSignal::CatchUpFailed(error) => {
                warn!(
                    session_id = %id,
                    kind = %ErrorKind::of_source(&error),
                    error = %error,
                    "Pending notification pull failed, keeping subscription open"
                );
            }
            SessionSignal::Dropped { error, attempt, retry_in } => {
                let kind = ErrorKind::of_source(&error);
                if error.is_transient() {
                    warn!(
                        session_id = %id,
                        kind = %kind,
                        attempt,
                        delay_ms = retry_in.as_millis() as u64,
                        error = %error,
                        "Notification connection lost, retrying"
                    );
                } else {
                    error!(
                        session_id = %id,
                        kind = %kind,
                        attempt,
                        delay_ms = retry_in.as_millis() as u64,
                        error = %error,
                        "Notification connection failed, retrying"
                    );
                }
                self.set_state(MonitorState::Restarting);
            }
        }
    }

    fn process(&mut self, session: Option<SessionId>, events: Vec<NotificationEvent>) -> Vec<NotificationEvent> {
        if events.is_empty() {
            return events;
        }

        let received = events.len();
        let outcome = self.reconciler.process(events);
        if outcome.report.failed > 0 {
            warn!(
                session_id = session.map(|id| id.to_string()),
                kind = %ErrorKind::ObserverFailure,
                failed = outcome.report.failed,
                "Some observers failed to handle notifications"
            );
        }
        debug!(
            session_id = session.map(|id| id.to_string()),
            received,
            surfaced = outcome.surfaced.len(),
            delivered = outcome.report.delivered,
            "Reconciled notification batch"
        );
        outcome.surfaced
    }

    fn set_state(&self, state: MonitorState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Monitor state changed");
        }
    }
}

/// Decode wire records, dropping malformed ones
fn decode_batch(session: Option<SessionId>, records: Vec<WireRecord>) -> Vec<NotificationEvent> {
    records
        .iter()
        .filter_map(|record| match NotificationEvent::from_wire(record) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(
                    session_id = session.map(|id| id.to_string()),
                    kind = %ErrorKind::MalformedEvent,
                    error = %err,
                    "Dropping malformed notification"
                );
                None
            }
        })
        .collect()
}

/// Subscription loop for one session
struct SessionWorker {
    session: SessionId,
    source: Arc<dyn NotificationSource>,
    identity: Arc<dyn IdentityProvider>,
    read_timeout: Duration,
    signals: SignalTx,
}

impl SessionWorker {
    async fn run(self, mut backoff: ReconnectBackoff, mut stop: oneshot::Receiver<()>) {
        loop {
            let result = tokio::select! {
                _ = &mut stop => break,
                result = self.connect_and_stream(&mut backoff) => result,
            };

            // Ok means the monitor task is gone
            let error = match result {
                Ok(()) => break,
                Err(error) => error,
            };

            let retry_in = backoff.next_delay();
            let signal = SessionSignal::Dropped { error, attempt: backoff.attempts(), retry_in };
            if !self.signal(signal) {
                break;
            }

            tokio::select! {
                _ = &mut stop => break,
                _ = tokio::time::sleep(retry_in) => {}
            }
        }

        trace!(session_id = %self.session, "Session worker exited");
    }

    /// Open the subscription and forward batches until the connection fails
    async fn connect_and_stream(&self, backoff: &mut ReconnectBackoff) -> notify_client::Result<()> {
        let user = self.identity.current_user().ok_or(SourceError::Unauthenticated)?;

        let mut subscription =
            networking::bounded(self.read_timeout, self.source.subscribe(&user)).await??;

        backoff.reset();
        if !self.signal(SessionSignal::Connected { user: user.clone() }) {
            return Ok(());
        }

        let mut caught_up = false;
        loop {
            if !caught_up {
                caught_up = self.catch_up(&user).await;
            }

            let batch = networking::bounded(self.read_timeout, subscription.next_batch()).await??;
            if batch.is_empty() {
                trace!(session_id = %self.session, "Keep-alive");
                continue;
            }
            if !self.signal(SessionSignal::Batch(batch)) {
                return Ok(());
            }
        }
    }

    /// Pull the pending set once, returning whether it reached the monitor
    async fn catch_up(&self, user: &UserId) -> bool {
        let signal = match networking::bounded(self.read_timeout, self.source.fetch_pending(user)).await {
            Ok(Ok(pending)) => SessionSignal::CatchUp(pending),
            Ok(Err(error)) => SessionSignal::CatchUpFailed(error),
            Err(elapsed) => SessionSignal::CatchUpFailed(elapsed.into()),
        };
        let delivered = matches!(signal, SessionSignal::CatchUp(_));
        self.signal(signal) && delivered
    }

    fn signal(&self, signal: SessionSignal) -> bool {
        self.signals.send((self.session, signal)).is_ok()
    }
}
