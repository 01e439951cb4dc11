//! The coordinator: sole owner of history and suppressions.
//!
//! All mutations go through a single task that drains an MPSC mailbox one
//! command at a time, so history and suppressions are never written
//! concurrently and every snapshot reflects a prefix of processed commands.
//! Callers talk to it through a cloneable [`CoordinatorHandle`].
//!
//! After each mutation the coordinator pushes a `STATE_UPDATED` notification
//! to observers. That push is best-effort: with no observer attached, or an
//! observer that has fallen behind, the update is simply dropped.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace};

use crate::clock::Clock;
use crate::config::Config;
use crate::detector::{self, filter_suppressed};
use crate::error::{Error, Result};
use crate::model::{
    context_preview, normalize, DetectionItem, StateSnapshot, StateUpdate, SuppressionEntry,
};
use crate::protocol::{Message, Notification, Reply, ScanOutcome};
use crate::storage::{load_json, save_json, KeyValueStore, HISTORY_KEY, SUPPRESSIONS_KEY};

/// A command queued for the coordinator task.
#[derive(Debug)]
enum Command {
    Scan {
        body: String,
        url: String,
        reply: oneshot::Sender<Result<ScanOutcome>>,
    },
    AddDetections {
        batch: Vec<DetectionItem>,
        reply: oneshot::Sender<Result<()>>,
    },
    Dismiss {
        identifier: String,
        reply: oneshot::Sender<Result<Vec<SuppressionEntry>>>,
    },
    ActiveSuppressions {
        reply: oneshot::Sender<Result<Vec<SuppressionEntry>>>,
    },
    ClearHistory {
        reply: oneshot::Sender<Result<()>>,
    },
    GetState {
        reply: oneshot::Sender<Result<StateSnapshot>>,
    },
}

/// Single-writer owner of persisted state.
///
/// The methods here run synchronously against the store. Once [`spawn`]ed,
/// they are only reachable through the handle's mailbox.
///
/// [`spawn`]: Coordinator::spawn
#[derive(Debug)]
pub struct Coordinator {
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    preview_length: usize,
    mailbox_capacity: usize,
    session_detections: Vec<DetectionItem>,
    observers: broadcast::Sender<Notification>,
}

impl Coordinator {
    /// Create a coordinator over `store`.
    #[must_use]
    pub fn new(store: Box<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        let (observers, _) = broadcast::channel(config.coordinator.observer_capacity);
        Self {
            store,
            clock,
            preview_length: config.interception.preview_length,
            mailbox_capacity: config.coordinator.mailbox_capacity,
            session_detections: Vec::new(),
            observers,
        }
    }

    /// Move the coordinator onto its own task and return a handle to it.
    ///
    /// The task exits once every handle has been dropped.
    #[must_use]
    pub fn spawn(self) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(self.mailbox_capacity);
        let handle = CoordinatorHandle {
            tx,
            observers: self.observers.clone(),
        };
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!("Coordinator started");
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        info!("Coordinator stopped");
    }

    fn handle(&mut self, command: Command) {
        // A dropped reply receiver means the caller gave up; the work is done either way.
        match command {
            Command::Scan { body, url, reply } => {
                let _ = reply.send(self.scan_payload(&body, &url));
            }
            Command::AddDetections { batch, reply } => {
                let _ = reply.send(self.add_detections(batch));
            }
            Command::Dismiss { identifier, reply } => {
                let _ = reply.send(self.dismiss(&identifier));
            }
            Command::ActiveSuppressions { reply } => {
                let _ = reply.send(self.active_suppressions());
            }
            Command::ClearHistory { reply } => {
                let _ = reply.send(self.clear_history());
            }
            Command::GetState { reply } => {
                let _ = reply.send(self.state());
            }
        }
    }

    /// Detect identifiers in a forwarded prompt and record the unsuppressed ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn scan_payload(&mut self, body: &str, url: &str) -> Result<ScanOutcome> {
        let scan = detector::scan(body);
        if scan.unique.is_empty() {
            return Ok(ScanOutcome {
                found_identifiers: Vec::new(),
                redacted_body: body.to_string(),
                should_block: false,
                new_items: Vec::new(),
            });
        }

        let suppressed: HashSet<String> = self
            .active_suppressions()?
            .into_iter()
            .map(|entry| entry.identifier)
            .collect();
        let remaining = filter_suppressed(&scan.unique, &suppressed);

        if remaining.is_empty() {
            debug!(
                found = scan.unique.len(),
                "All identifiers suppressed, nothing recorded"
            );
            return Ok(ScanOutcome {
                found_identifiers: scan.unique,
                redacted_body: scan.redacted,
                should_block: false,
                new_items: Vec::new(),
            });
        }

        let now = self.clock.now();
        let preview = context_preview(body, self.preview_length);
        let new_items: Vec<DetectionItem> = remaining
            .into_iter()
            .map(|identifier| DetectionItem::new(identifier, now, url, preview.clone()))
            .collect();

        self.add_detections(new_items.clone())?;

        Ok(ScanOutcome {
            found_identifiers: scan.unique,
            redacted_body: scan.redacted,
            should_block: true,
            new_items,
        })
    }

    /// Prepend `batch` to history and make it the session batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written. Session
    /// detections are left untouched in that case.
    pub fn add_detections(&mut self, batch: Vec<DetectionItem>) -> Result<()> {
        let mut history = batch.clone();
        history.extend(self.load_history()?);
        save_json(self.store.as_ref(), HISTORY_KEY, &history)?;

        info!(count = batch.len(), total = history.len(), "Recorded detections");
        self.session_detections = batch;
        self.broadcast();
        Ok(())
    }

    /// Suppress `identifier` for the suppression window.
    ///
    /// Dismissing an identifier that is already actively suppressed changes
    /// nothing. Returns the active suppression list.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is blank or the store fails.
    pub fn dismiss(&mut self, identifier: &str) -> Result<Vec<SuppressionEntry>> {
        let normalized = normalize(identifier);
        if normalized.is_empty() {
            return Err(Error::InvalidIdentifier(identifier.to_string()));
        }

        let active = self.active_suppressions()?;
        if active.iter().any(|entry| entry.covers(&normalized)) {
            trace!("Identifier already suppressed");
            return Ok(active);
        }

        let entry = SuppressionEntry::new(&normalized, self.clock.now());
        let mut updated = Vec::with_capacity(active.len() + 1);
        updated.push(entry);
        updated.extend(active.into_iter().filter(|e| !e.covers(&normalized)));

        save_json(self.store.as_ref(), SUPPRESSIONS_KEY, &updated)?;
        info!(active = updated.len(), "Identifier suppressed");
        self.broadcast();
        Ok(updated)
    }

    /// The non-expired suppressions, most recent first.
    ///
    /// Expired entries are evicted and the pruned list is persisted before
    /// returning, so storage never accumulates stale entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn active_suppressions(&mut self) -> Result<Vec<SuppressionEntry>> {
        let stored: Vec<SuppressionEntry> =
            load_json(self.store.as_ref(), SUPPRESSIONS_KEY)?.unwrap_or_default();
        let total = stored.len();

        let now = self.clock.now();
        let active: Vec<SuppressionEntry> =
            stored.into_iter().filter(|e| e.is_active(now)).collect();

        if active.len() != total {
            save_json(self.store.as_ref(), SUPPRESSIONS_KEY, &active)?;
            debug!(evicted = total - active.len(), "Evicted expired suppressions");
        }
        Ok(active)
    }

    /// Empty history and session detections. Suppressions are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn clear_history(&mut self) -> Result<()> {
        save_json(self.store.as_ref(), HISTORY_KEY, &Vec::<DetectionItem>::new())?;
        self.session_detections.clear();
        info!("History cleared");
        self.broadcast();
        Ok(())
    }

    /// Snapshot of everything the coordinator owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub fn state(&mut self) -> Result<StateSnapshot> {
        Ok(StateSnapshot {
            history: self.load_history()?,
            suppressions: self.active_suppressions()?,
            session_detections: self.session_detections.clone(),
        })
    }

    /// Subscribe to `STATE_UPDATED` notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.observers.subscribe()
    }

    fn load_history(&self) -> Result<Vec<DetectionItem>> {
        Ok(load_json(self.store.as_ref(), HISTORY_KEY)?.unwrap_or_default())
    }

    /// Best-effort notify: failures are dropped, never retried or returned.
    fn broadcast(&mut self) {
        if self.observers.receiver_count() == 0 {
            trace!("No observers attached, skipping state broadcast");
            return;
        }

        let update = match self.state() {
            Ok(snapshot) => StateUpdate {
                history: snapshot.history,
                suppressions: snapshot.suppressions,
            },
            Err(e) => {
                debug!(error = %e, "Could not build state update, skipping broadcast");
                return;
            }
        };

        if self.observers.send(Notification::StateUpdated(update)).is_err() {
            trace!("Observers detached before broadcast");
        }
    }
}

/// Cloneable, `Send` handle to a running [`Coordinator`].
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
    observers: broadcast::Sender<Notification>,
}

impl CoordinatorHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::CoordinatorUnavailable)?;
        reply_rx.await.map_err(|_| Error::CoordinatorUnavailable)?
    }

    /// Detect and record identifiers in a forwarded prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone or its store fails.
    pub async fn scan_payload(
        &self,
        body: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<ScanOutcome> {
        let (body, url) = (body.into(), url.into());
        self.request(|reply| Command::Scan { body, url, reply })
            .await
    }

    /// Record a batch of detections.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone or its store fails.
    pub async fn add_detections(&self, batch: Vec<DetectionItem>) -> Result<()> {
        self.request(|reply| Command::AddDetections { batch, reply })
            .await
    }

    /// Suppress an identifier for the suppression window.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone, the identifier is blank,
    /// or the store fails.
    pub async fn dismiss(&self, identifier: impl Into<String>) -> Result<Vec<SuppressionEntry>> {
        let identifier = identifier.into();
        self.request(|reply| Command::Dismiss { identifier, reply })
            .await
    }

    /// The active suppressions, with expired entries evicted.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone or its store fails.
    pub async fn active_suppressions(&self) -> Result<Vec<SuppressionEntry>> {
        self.request(|reply| Command::ActiveSuppressions { reply })
            .await
    }

    /// Check whether `identifier` is currently suppressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone or its store fails.
    pub async fn is_suppressed(&self, identifier: &str) -> Result<bool> {
        Ok(self
            .active_suppressions()
            .await?
            .iter()
            .any(|entry| entry.covers(identifier)))
    }

    /// Empty history and session detections.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone or its store fails.
    pub async fn clear_history(&self) -> Result<()> {
        self.request(|reply| Command::ClearHistory { reply }).await
    }

    /// Snapshot of history, suppressions and session detections.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone or its store fails.
    pub async fn get_state(&self) -> Result<StateSnapshot> {
        self.request(|reply| Command::GetState { reply }).await
    }

    /// Subscribe to `STATE_UPDATED` notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.observers.subscribe()
    }

    /// Answer a protocol message.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator is gone or the command failed.
    pub async fn dispatch(&self, message: Message) -> Result<Reply> {
        trace!(kind = message.kind(), "Dispatching message");
        match message {
            Message::ScanPayload { body, url } => {
                self.scan_payload(body, url).await.map(Reply::ScanResult)
            }
            Message::DismissIdentifier { identifier } => {
                self.dismiss(identifier).await?;
                Ok(Reply::Ack { success: true })
            }
            Message::ClearHistory => {
                self.clear_history().await?;
                Ok(Reply::Ack { success: true })
            }
            Message::GetState => self.get_state().await.map(Reply::State),
            Message::GetSuppressions => Ok(Reply::Suppressions {
                suppressions: self.active_suppressions().await?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::SUPPRESSION_WINDOW;
    use crate::storage::Storage;
    use chrono::{Duration, Utc};

    fn create_test_coordinator() -> (Coordinator, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let storage = Storage::open_in_memory().expect("failed to create test storage");
        let coordinator =
            Coordinator::new(Box::new(storage), Arc::new(clock.clone()), &Config::default());
        (coordinator, clock)
    }

    fn item(identifier: &str) -> DetectionItem {
        DetectionItem::new(identifier, Utc::now(), "https://x/backend-api/conversation", "p")
    }

    #[derive(Debug)]
    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::internal("disk unavailable"))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::internal("disk unavailable"))
        }
    }

    #[test]
    fn test_add_detections_prepends_and_replaces_session() {
        let (mut coordinator, _clock) = create_test_coordinator();

        coordinator.add_detections(vec![item("old@x.com")]).unwrap();
        coordinator
            .add_detections(vec![item("new1@x.com"), item("new2@x.com")])
            .unwrap();

        let state = coordinator.state().unwrap();
        let history: Vec<_> = state.history.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(history, vec!["new1@x.com", "new2@x.com", "old@x.com"]);

        let session: Vec<_> = state
            .session_detections
            .iter()
            .map(|i| i.identifier.as_str())
            .collect();
        assert_eq!(session, vec!["new1@x.com", "new2@x.com"]);
    }

    #[test]
    fn test_clear_history_keeps_suppressions() {
        let (mut coordinator, _clock) = create_test_coordinator();
        coordinator.add_detections(vec![item("a@b.com")]).unwrap();
        coordinator.dismiss("a@b.com").unwrap();

        coordinator.clear_history().unwrap();

        let state = coordinator.state().unwrap();
        assert!(state.history.is_empty());
        assert!(state.session_detections.is_empty());
        assert_eq!(state.suppressions.len(), 1);
    }

    #[test]
    fn test_dismiss_is_idempotent() {
        let (mut coordinator, clock) = create_test_coordinator();

        let first = coordinator.dismiss("A@B.com").unwrap();
        clock.advance(Duration::minutes(5));
        let second = coordinator.dismiss("a@b.com").unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].identifier, "a@b.com");
    }

    #[test]
    fn test_dismiss_orders_most_recent_first() {
        let (mut coordinator, clock) = create_test_coordinator();

        coordinator.dismiss("first@x.com").unwrap();
        clock.advance(Duration::seconds(1));
        let list = coordinator.dismiss("second@x.com").unwrap();

        assert_eq!(list[0].identifier, "second@x.com");
        assert_eq!(list[1].identifier, "first@x.com");
    }

    #[test]
    fn test_dismiss_after_expiry_creates_fresh_entry() {
        let (mut coordinator, clock) = create_test_coordinator();

        let first = coordinator.dismiss("a@b.com").unwrap();
        clock.advance(SUPPRESSION_WINDOW + Duration::seconds(1));
        let second = coordinator.dismiss("a@b.com").unwrap();

        assert_eq!(second.len(), 1);
        assert!(second[0].suppressed_at > first[0].suppressed_at);
    }

    #[test]
    fn test_dismiss_rejects_blank_identifier() {
        let (mut coordinator, _clock) = create_test_coordinator();
        assert!(matches!(
            coordinator.dismiss("   "),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_active_suppressions_evicts_and_persists() {
        let (mut coordinator, clock) = create_test_coordinator();
        coordinator.dismiss("old@x.com").unwrap();
        clock.advance(Duration::hours(12));
        coordinator.dismiss("new@x.com").unwrap();

        clock.advance(Duration::hours(13));
        let now = clock.now();
        let active = coordinator.active_suppressions().unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].identifier, "new@x.com");
        assert!(active.iter().all(|e| e.expires_at > now));

        let stored: Vec<SuppressionEntry> =
            load_json(coordinator.store.as_ref(), SUPPRESSIONS_KEY)
                .unwrap()
                .unwrap();
        assert_eq!(stored, active);
    }

    #[test]
    fn test_entry_expiring_exactly_now_is_evicted() {
        let (mut coordinator, clock) = create_test_coordinator();
        coordinator.dismiss("a@b.com").unwrap();

        clock.advance(SUPPRESSION_WINDOW);
        assert!(coordinator.active_suppressions().unwrap().is_empty());
    }

    #[test]
    fn test_scan_payload_records_unsuppressed() {
        let (mut coordinator, _clock) = create_test_coordinator();

        let outcome = coordinator
            .scan_payload("mail Jane@X.com and jane@x.com", "https://x/api")
            .unwrap();

        assert!(outcome.should_block);
        assert_eq!(outcome.found_identifiers, vec!["Jane@X.com"]);
        assert_eq!(outcome.new_items.len(), 1);
        assert_eq!(outcome.new_items[0].source_url, "https://x/api");
        assert!(!outcome.redacted_body.contains('@'));

        let state = coordinator.state().unwrap();
        assert_eq!(state.history, outcome.new_items);
        assert_eq!(state.session_detections, outcome.new_items);
    }

    #[test]
    fn test_scan_payload_without_identifiers() {
        let (mut coordinator, _clock) = create_test_coordinator();

        let outcome = coordinator.scan_payload("nothing here", "u").unwrap();

        assert!(!outcome.should_block);
        assert!(outcome.found_identifiers.is_empty());
        assert_eq!(outcome.redacted_body, "nothing here");
        assert!(coordinator.state().unwrap().history.is_empty());
    }

    #[test]
    fn test_scan_payload_skips_suppressed() {
        let (mut coordinator, _clock) = create_test_coordinator();
        coordinator.dismiss("a@b.com").unwrap();

        let outcome = coordinator.scan_payload("hi A@B.com", "u").unwrap();

        assert!(!outcome.should_block);
        assert!(outcome.new_items.is_empty());
        assert_eq!(outcome.found_identifiers, vec!["A@B.com"]);
        assert!(coordinator.state().unwrap().history.is_empty());
    }

    #[test]
    fn test_scan_payload_preview_truncated() {
        let (mut coordinator, _clock) = create_test_coordinator();
        let body = format!("a@b.com {}", "z".repeat(200));

        let outcome = coordinator.scan_payload(&body, "u").unwrap();
        let preview = &outcome.new_items[0].context_preview;

        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_store_failure_propagates_without_partial_state() {
        let mut coordinator = Coordinator::new(
            Box::new(FailingStore),
            Arc::new(ManualClock::new(Utc::now())),
            &Config::default(),
        );

        assert!(coordinator.add_detections(vec![item("a@b.com")]).is_err());
        assert!(coordinator.session_detections.is_empty());
        assert!(coordinator.dismiss("a@b.com").is_err());
        assert!(coordinator.clear_history().is_err());
        assert!(coordinator.state().is_err());
    }

    #[test]
    fn test_broadcast_without_observers_is_silent() {
        let (mut coordinator, _clock) = create_test_coordinator();
        assert_eq!(coordinator.observers.receiver_count(), 0);
        coordinator.add_detections(vec![item("a@b.com")]).unwrap();
    }

    #[test]
    fn test_broadcast_after_mutation() {
        let (mut coordinator, _clock) = create_test_coordinator();
        let mut rx = coordinator.subscribe();

        coordinator.add_detections(vec![item("a@b.com")]).unwrap();

        let Notification::StateUpdated(update) = rx.try_recv().unwrap();
        assert_eq!(update.history.len(), 1);
        assert!(update.suppressions.is_empty());
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let (coordinator, _clock) = create_test_coordinator();
        let handle = coordinator.spawn();

        handle.add_detections(vec![item("a@b.com")]).await.unwrap();
        handle.dismiss("c@d.org").await.unwrap();

        assert!(handle.is_suppressed("C@D.org").await.unwrap());
        assert!(!handle.is_suppressed("a@b.com").await.unwrap());

        let state = handle.get_state().await.unwrap();
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.suppressions.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_messages() {
        let (coordinator, _clock) = create_test_coordinator();
        let handle = coordinator.spawn();

        let reply = handle
            .dispatch(Message::ScanPayload {
                body: "ping a@b.com".into(),
                url: "u".into(),
            })
            .await
            .unwrap();
        let Reply::ScanResult(outcome) = reply else {
            panic!("expected scan result, got {reply:?}");
        };
        assert!(outcome.should_block);

        let reply = handle
            .dispatch(Message::DismissIdentifier {
                identifier: "a@b.com".into(),
            })
            .await
            .unwrap();
        assert_eq!(reply, Reply::Ack { success: true });

        let reply = handle.dispatch(Message::GetSuppressions).await.unwrap();
        let Reply::Suppressions { suppressions } = reply else {
            panic!("expected suppressions, got {reply:?}");
        };
        assert_eq!(suppressions.len(), 1);

        let reply = handle.dispatch(Message::ClearHistory).await.unwrap();
        assert_eq!(reply, Reply::Ack { success: true });

        let reply = handle.dispatch(Message::GetState).await.unwrap();
        let Reply::State(state) = reply else {
            panic!("expected state, got {reply:?}");
        };
        assert!(state.history.is_empty());
        assert_eq!(state.suppressions.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_dismissals_serialize() {
        let (coordinator, _clock) = create_test_coordinator();
        let handle = coordinator.spawn();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.dismiss(format!("user{}@x.com", i % 5)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let active = handle.active_suppressions().await.unwrap();
        assert_eq!(active.len(), 5);
    }

    #[tokio::test]
    async fn test_observers_receive_updates() {
        let (coordinator, _clock) = create_test_coordinator();
        let handle = coordinator.spawn();
        let mut rx = handle.subscribe();

        handle.dismiss("a@b.com").await.unwrap();

        let Notification::StateUpdated(update) = rx.recv().await.unwrap();
        assert_eq!(update.suppressions.len(), 1);
        assert_eq!(update.suppressions[0].identifier, "a@b.com");
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_coordinator() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let (observers, _) = broadcast::channel(1);
        let handle = CoordinatorHandle { tx, observers };

        let err = handle.get_state().await.unwrap_err();
        assert!(err.is_coordinator_unavailable());
    }
}
