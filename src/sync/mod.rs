//! # Sync Engine
//!
//! Drains the mutation queue against the remote whenever a discrete trigger asks
//! it to: a reconnect, a manual "sync now", or the periodic timer.
//!
//! ## Architecture
//!
//! - **Engine** (this file): idle/syncing/completed/failed state machine
//! - **Network Monitor**: debounced connectivity transitions
//! - **Scheduler**: turns reconnects, timer ticks and manual requests into attempts
//! - **Transport**: `send(item) -> success | failure`
//! - **Sync State**: status, progress and outcome types
//! - **Metrics**: pass counters
//!
//! ## Pass semantics
//!
//! - One pass at a time; a call arriving while a pass runs is ignored, not queued
//! - The pass works on a copy of the queue taken at its start, so items enqueued
//!   meanwhile ride along on the next pass
//! - Items are sent strictly sequentially in FIFO order, which preserves causal
//!   order per entity type
//! - Each send is bounded by the item timeout; a timeout fails that item only
//! - Connectivity is checked before each item; going offline ends the pass with
//!   `failed("offline")` after the in-flight item
//! - Confirmed items are removed by id; the rest stay queued in their original
//!   order for the next pass
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cradlesync::sync::{SyncEngine, SyncOutcome};
//! # use std::sync::Arc;
//! # async fn example(engine: Arc<SyncEngine>) -> cradlesync::shared::Result<()> {
//! match engine.attempt_sync().await? {
//!     SyncOutcome::Completed { synced } => println!("synced {} items", synced),
//!     SyncOutcome::Failed { reason, .. } => println!("will retry: {}", reason),
//!     SyncOutcome::Skipped { reason } => println!("skipped: {:?}", reason),
//! }
//! # Ok(())
//! # }
//! ```

pub mod metrics;
pub mod network_monitor;
pub mod scheduler;
pub mod sync_state;
pub mod transport;

pub use metrics::SyncMetrics;
pub use network_monitor::{
    NetworkStatus, ReachabilityHandle, ReachabilityMonitor, ReachabilityReporter, TcpProbe,
};
pub use scheduler::{SyncScheduler, SyncTrigger};
pub use sync_state::{SkipReason, SyncOutcome, SyncProgress, SyncStatus};
pub use transport::{HttpTransport, SyncTransport, TransportError};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use uuid::Uuid;

use crate::offline::MutationQueue;
use crate::shared::clock::Clock;
use crate::shared::entity::EntityType;
use crate::shared::error::Result;

/// Reason recorded when connectivity drops mid-pass
pub const OFFLINE_REASON: &str = "offline";

/// Sync state machine draining the mutation queue
pub struct SyncEngine {
    queue: MutationQueue,
    transport: Arc<dyn SyncTransport>,
    reachability: ReachabilityHandle,
    clock: Arc<dyn Clock>,
    item_timeout: Duration,
    /// Held for the whole pass; `try_lock` failure means a pass is running
    pass_lock: Mutex<()>,
    status: watch::Sender<SyncStatus>,
    progress: watch::Sender<SyncProgress>,
    metrics: RwLock<SyncMetrics>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("status", &*self.status.borrow())
            .field("progress", &*self.progress.borrow())
            .field("item_timeout", &self.item_timeout)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        queue: MutationQueue,
        transport: Arc<dyn SyncTransport>,
        reachability: ReachabilityHandle,
        clock: Arc<dyn Clock>,
        item_timeout: Duration,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        let (progress, _) = watch::channel(SyncProgress::default());

        Self {
            queue,
            transport,
            reachability,
            clock,
            item_timeout,
            pass_lock: Mutex::new(()),
            status,
            progress,
            metrics: RwLock::new(SyncMetrics::new()),
        }
    }

    /// Current status
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Progress of the current or last pass
    pub fn progress(&self) -> SyncProgress {
        *self.progress.borrow()
    }

    /// Receiver notified on every progress update
    pub fn subscribe_progress(&self) -> watch::Receiver<SyncProgress> {
        self.progress.subscribe()
    }

    /// Pass counters
    pub async fn metrics(&self) -> SyncMetrics {
        self.metrics.read().await.clone()
    }

    /// Resolve once no pass is running
    pub async fn wait_idle(&self) {
        let _pass = self.pass_lock.lock().await;
    }

    /// Run one pass if none is running, the device is online and items are pending
    ///
    /// Item failures are reported in the outcome. Only a storage failure while
    /// reading the queue or recording results is returned as an error.
    pub async fn attempt_sync(&self) -> Result<SyncOutcome> {
        let Ok(_pass) = self.pass_lock.try_lock() else {
            tracing::debug!("sync already in progress, ignoring trigger");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::AlreadySyncing,
            });
        };

        if !self.reachability.is_online() {
            tracing::debug!("offline, skipping sync");
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::Offline,
            });
        }

        let items = self.queue.peek_all().await?;
        if items.is_empty() {
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::QueueEmpty,
            });
        }

        let total = items.len();
        self.status.send_replace(SyncStatus::Syncing);
        self.progress.send_replace(SyncProgress { succeeded: 0, total });
        self.metrics.write().await.record_pass_start();
        tracing::info!(total, "sync pass started");

        let mut succeeded: Vec<Uuid> = Vec::with_capacity(total);
        let mut failed: Vec<EntityType> = Vec::new();
        let mut went_offline = false;

        for item in &items {
            if !self.reachability.is_online() {
                went_offline = true;
                break;
            }

            let result = match tokio::time::timeout(self.item_timeout, self.transport.send(item)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.item_timeout)),
            };

            match result {
                Ok(()) => {
                    succeeded.push(item.id);
                    self.progress.send_modify(|progress| progress.succeeded += 1);
                }
                Err(e) => {
                    tracing::warn!(
                        item_id = %item.id,
                        entity_type = %item.entity_type,
                        error = %e,
                        "item failed to sync, keeping it queued"
                    );
                    failed.push(item.entity_type);
                }
            }
        }

        let unsent = total - succeeded.len();
        let recorded = if unsent == 0 {
            self.queue.complete_pass(&succeeded, self.clock.now()).await
        } else {
            self.queue.remove_succeeded(&succeeded).await
        };
        if let Err(e) = recorded {
            // Every item is still queued and will be sent again
            self.metrics.write().await.record_pass_end(0, total);
            self.fail(format!("could not record sync results: {}", e));
            return Err(e);
        }
        self.metrics.write().await.record_pass_end(succeeded.len(), unsent);

        if unsent == 0 {
            self.status.send_replace(SyncStatus::Completed);
            tracing::info!(synced = total, "sync pass completed");
            return Ok(SyncOutcome::Completed { synced: total });
        }

        let reason = if went_offline {
            OFFLINE_REASON.to_string()
        } else {
            failure_reason(&failed, total)
        };
        self.fail(reason.clone());

        Ok(SyncOutcome::Failed {
            synced: succeeded.len(),
            failed: unsent,
            reason,
        })
    }

    fn fail(&self, reason: String) {
        tracing::warn!(%reason, "sync pass failed");
        self.status.send_replace(SyncStatus::Failed(reason));
    }
}

/// "2 of 5 items failed (feeding, milestone)"
fn failure_reason(failed: &[EntityType], total: usize) -> String {
    let mut kinds: Vec<&str> = Vec::new();
    for entity_type in failed {
        if !kinds.contains(&entity_type.as_str()) {
            kinds.push(entity_type.as_str());
        }
    }
    format!("{} of {} items failed ({})", failed.len(), total, kinds.join(", "))
}
