//! Bridge between the interceptor and the coordinator.
//!
//! The relay forwards detection events and dismissals to the coordinator and
//! keeps a local projection of the active suppression set that the
//! interceptor filters against. The projection is refreshed at startup, on a
//! fixed interval, and right after each dismissal, so it is at most one sync
//! interval stale.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::coordinator::CoordinatorHandle;
use crate::error::{Error, Result};
use crate::protocol::{DetectionEvent, Message, Reply};

/// Something that answers coordinator protocol messages.
#[async_trait]
pub trait CoordinatorEndpoint: Send + Sync + std::fmt::Debug {
    /// Send `message` and wait for its reply.
    async fn call(&self, message: Message) -> Result<Reply>;
}

#[async_trait]
impl CoordinatorEndpoint for CoordinatorHandle {
    async fn call(&self, message: Message) -> Result<Reply> {
        self.dispatch(message).await
    }
}

/// Forwards traffic to the coordinator and caches suppressions locally.
#[derive(Debug, Clone)]
pub struct Relay {
    endpoint: Arc<dyn CoordinatorEndpoint>,
    cache: Arc<watch::Sender<HashSet<String>>>,
}

impl Relay {
    /// Create a relay with an empty suppression cache.
    #[must_use]
    pub fn new(endpoint: Arc<dyn CoordinatorEndpoint>) -> Self {
        let (cache, _) = watch::channel(HashSet::new());
        Self {
            endpoint,
            cache: Arc::new(cache),
        }
    }

    /// Watch the suppression cache. Holds normalized identifiers.
    #[must_use]
    pub fn subscribe_cache(&self) -> watch::Receiver<HashSet<String>> {
        self.cache.subscribe()
    }

    /// The current suppression cache.
    #[must_use]
    pub fn cached_suppressions(&self) -> HashSet<String> {
        self.cache.borrow().clone()
    }

    /// Forward a detection event without waiting for the outcome.
    ///
    /// Best-effort: a failed delivery is logged and dropped, never retried.
    /// The returned handle is only useful to tests that need to observe
    /// delivery; callers normally drop it.
    pub fn relay_detection(&self, event: DetectionEvent) -> JoinHandle<()> {
        let endpoint = Arc::clone(&self.endpoint);
        tokio::spawn(async move {
            match endpoint.call(event.to_message()).await {
                Ok(Reply::ScanResult(outcome)) => {
                    debug!(
                        action = %event.action,
                        recorded = outcome.new_items.len(),
                        "Detection relayed"
                    );
                }
                Ok(other) => {
                    warn!(reply = other.kind(), "Unexpected reply to detection, dropped");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to relay detection, dropped");
                }
            }
        })
    }

    /// Pull the active suppressions into the local cache.
    ///
    /// Returns the number of cached identifiers. The cache is left unchanged
    /// on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinator call fails or answers with the
    /// wrong reply.
    pub async fn sync_suppressions(&self) -> Result<usize> {
        match self.endpoint.call(Message::GetSuppressions).await? {
            Reply::Suppressions { suppressions } => {
                let set: HashSet<String> = suppressions
                    .into_iter()
                    .map(|entry| entry.identifier)
                    .collect();
                let count = set.len();
                self.cache.send_replace(set);
                trace!(count, "Suppression cache synced");
                Ok(count)
            }
            other => Err(Error::UnexpectedReply {
                request: "GET_SUPPRESSIONS",
                reply: other.kind(),
            }),
        }
    }

    /// Dismiss an identifier, wait for the acknowledgement, then resync.
    ///
    /// # Errors
    ///
    /// Returns an error if the dismissal is rejected or either call fails.
    pub async fn relay_dismiss(&self, identifier: &str) -> Result<()> {
        let reply = self
            .endpoint
            .call(Message::DismissIdentifier {
                identifier: identifier.to_string(),
            })
            .await?;

        match reply {
            Reply::Ack { success: true } => {}
            Reply::Ack { success: false } => {
                return Err(Error::internal("dismissal was not acknowledged"));
            }
            other => {
                return Err(Error::UnexpectedReply {
                    request: "DISMISS_IDENTIFIER",
                    reply: other.kind(),
                });
            }
        }

        self.sync_suppressions().await?;
        Ok(())
    }

    /// Start the periodic sync.
    ///
    /// The startup sync completes before this returns, so the cache is
    /// populated before the first request is intercepted. Later syncs run
    /// every `period`; missed ticks are skipped rather than bunched up. The
    /// loop stops when the returned guard is dropped.
    #[must_use = "the sync loop stops when the guard is dropped"]
    pub async fn start_sync_loop(&self, period: Duration) -> SyncLoop {
        self.sync_or_keep_cache().await;

        let relay = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                relay.sync_or_keep_cache().await;
            }
        });
        SyncLoop { handle }
    }

    async fn sync_or_keep_cache(&self) {
        if let Err(e) = self.sync_suppressions().await {
            warn!(error = %e, "Suppression sync failed, keeping previous cache");
        }
    }
}

/// Guard for the background sync task.
#[derive(Debug)]
pub struct SyncLoop {
    handle: JoinHandle<()>,
}

impl SyncLoop {
    /// Stop the loop now.
    pub fn stop(self) {}
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
