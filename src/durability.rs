//! # Durability Layer
//!
//! Composition root. Builds every service around one [`LocalDatabase`] and one
//! [`Clock`] so the host application holds a single handle instead of reaching
//! for globals.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cradlesync::durability::DurabilityLayer;
//! use cradlesync::shared::{DurabilityConfig, EntityType, SyncAction, SystemClock};
//! use cradlesync::sync::{HttpTransport, NetworkStatus};
//! use std::sync::Arc;
//!
//! # async fn example() -> cradlesync::shared::Result<()> {
//! let config = DurabilityConfig::from_env()?;
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let layer = DurabilityLayer::open(config, transport, Arc::new(SystemClock::new())).await?;
//! layer.start_scheduler().await;
//!
//! layer.enqueue(EntityType::Feeding, SyncAction::Create, br#"[{"ml":120}]"#.to_vec()).await?;
//!
//! // platform connectivity callback
//! layer.reachability_reporter().report(NetworkStatus::Online);
//!
//! layer.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::health::{HealthCheck, HealthReport};
use crate::local_db::snapshots::BackupRecord;
use crate::local_db::LocalDatabase;
use crate::offline::{LocalStore, MutationQueue};
use crate::shared::clock::Clock;
use crate::shared::config::DurabilityConfig;
use crate::shared::entity::{EntityType, SyncAction};
use crate::shared::error::Result;
use crate::snapshot::{Snapshot, SnapshotService};
use crate::sync::{
    NetworkStatus, ReachabilityHandle, ReachabilityMonitor, ReachabilityReporter, SyncEngine,
    SyncOutcome, SyncScheduler, SyncTransport, SyncTrigger,
};

/// Every durability service, wired together
#[derive(Debug)]
pub struct DurabilityLayer {
    config: DurabilityConfig,
    db: Arc<LocalDatabase>,
    store: LocalStore,
    queue: MutationQueue,
    monitor: ReachabilityMonitor,
    engine: Arc<SyncEngine>,
    snapshots: SnapshotService,
    health: HealthCheck,
    scheduler: Mutex<Option<SyncScheduler>>,
}

impl DurabilityLayer {
    /// Validate `config`, open the database file and build every service
    ///
    /// Reachability starts offline, so the first online report counts as a
    /// reconnect and drains whatever was queued in a previous session.
    pub async fn open(
        config: DurabilityConfig,
        transport: Arc<dyn SyncTransport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let db = Arc::new(LocalDatabase::open(&config.database_path).await?);
        Ok(Self::with_database(config, db, transport, clock))
    }

    /// Build every service around an already opened database
    pub fn with_database(
        config: DurabilityConfig,
        db: Arc<LocalDatabase>,
        transport: Arc<dyn SyncTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = LocalStore::new(db.clone(), clock.clone());
        let queue = MutationQueue::new(db.clone(), clock.clone());
        let monitor = ReachabilityMonitor::new(NetworkStatus::Offline, config.reachability_debounce);
        let engine = Arc::new(SyncEngine::new(
            queue.clone(),
            transport,
            monitor.handle(),
            clock.clone(),
            config.item_timeout,
        ));
        let snapshots = SnapshotService::new(db.clone(), clock.clone(), config.snapshot_retention);
        let health = HealthCheck::new(db.clone(), clock, config.health.clone());

        tracing::info!(path = %config.database_path.display(), server = %config.server_url, "durability layer ready");

        Self {
            config,
            db,
            store,
            queue,
            monitor,
            engine,
            snapshots,
            health,
            scheduler: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DurabilityConfig {
        &self.config
    }

    pub fn database(&self) -> &Arc<LocalDatabase> {
        &self.db
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn snapshots(&self) -> &SnapshotService {
        &self.snapshots
    }

    pub fn health(&self) -> &HealthCheck {
        &self.health
    }

    /// Where the platform feeds raw connectivity changes
    pub fn reachability_reporter(&self) -> ReachabilityReporter {
        self.monitor.reporter()
    }

    /// Debounced connectivity state
    pub fn reachability(&self) -> ReachabilityHandle {
        self.monitor.handle()
    }

    /// Apply a change locally and queue it for sync
    pub async fn enqueue(
        &self,
        entity_type: EntityType,
        action: SyncAction,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Uuid> {
        self.queue.enqueue(entity_type, action, payload).await
    }

    /// Run a pass right now, bypassing the scheduler
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        self.engine.attempt_sync().await
    }

    pub async fn export_snapshot(&self) -> Result<Snapshot> {
        self.snapshots.export_snapshot().await
    }

    pub async fn import_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots.import_snapshot(snapshot).await
    }

    pub async fn create_backup(&self) -> Result<BackupRecord> {
        self.snapshots.create_backup().await
    }

    pub async fn health_check(&self) -> HealthReport {
        self.health.run().await
    }

    /// Drop the Local Store and every pending item
    pub async fn clear_cache(&self) -> Result<(u64, u64)> {
        self.queue.clear_cache().await
    }

    /// Start reacting to reconnects and the periodic timer; no-op if running
    pub async fn start_scheduler(&self) {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.is_none() {
            *scheduler = Some(SyncScheduler::start(
                self.engine.clone(),
                self.monitor.handle(),
                self.config.periodic_sync,
            ));
        }
    }

    /// Ask the scheduler for an attempt; false when it is not running
    pub async fn trigger(&self, trigger: SyncTrigger) -> bool {
        match self.scheduler.lock().await.as_ref() {
            Some(scheduler) => scheduler.trigger(trigger),
            None => false,
        }
    }

    /// Stop the scheduler, let a running pass record its results, then close the database
    pub async fn shutdown(&self) {
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown().await;
        }
        // a pass started through sync_now is not owned by the scheduler
        self.engine.wait_idle().await;
        self.db.close().await;
        tracing::info!("durability layer shut down");
    }
}
