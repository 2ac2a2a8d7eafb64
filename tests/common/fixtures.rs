//! On-disk fixtures
//!
//! Every fixture owns a temporary directory holding a real SQLite file, so
//! reopening exercises the same path a restarted app would.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use cradlesync::health::HealthCheck;
use cradlesync::local_db::LocalDatabase;
use cradlesync::offline::{LocalStore, MutationQueue};
use cradlesync::shared::{Clock, DurabilityConfig, HealthThresholds, SystemClock};
use cradlesync::snapshot::SnapshotService;
use cradlesync::sync::{ReachabilityHandle, SyncEngine, SyncTransport};

pub const DB_FILE: &str = "cradlesync.db";

/// Services over one database file
pub struct TestEnv {
    pub dir: TempDir,
    pub db: Arc<LocalDatabase>,
    pub clock: Arc<dyn Clock>,
    pub store: LocalStore,
    pub queue: MutationQueue,
    pub snapshots: SnapshotService,
    pub health: HealthCheck,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        Self::open_in(dir).await
    }

    async fn open_in(dir: TempDir) -> Self {
        let db = Arc::new(
            LocalDatabase::open(dir.path().join(DB_FILE))
                .await
                .expect("Failed to open test database"),
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

        Self {
            store: LocalStore::new(db.clone(), clock.clone()),
            queue: MutationQueue::new(db.clone(), clock.clone()),
            snapshots: SnapshotService::new(db.clone(), clock.clone(), 5),
            health: HealthCheck::new(db.clone(), clock.clone(), HealthThresholds::default()),
            dir,
            db,
            clock,
        }
    }

    /// Close the pool and open the same file again, as after a restart
    pub async fn reopen(self) -> Self {
        let Self { dir, db, .. } = self;
        db.close().await;
        drop(db);
        Self::open_in(dir).await
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join(DB_FILE)
    }

    /// Engine that always sees the network as up
    pub fn engine(&self, transport: Arc<dyn SyncTransport>) -> SyncEngine {
        self.engine_with(transport, ReachabilityHandle::always_online())
    }

    pub fn engine_with(
        &self,
        transport: Arc<dyn SyncTransport>,
        reachability: ReachabilityHandle,
    ) -> SyncEngine {
        SyncEngine::new(
            self.queue.clone(),
            transport,
            reachability,
            self.clock.clone(),
            Duration::from_secs(2),
        )
    }
}

/// Configuration pointing at `path` with the shortest allowed debounce
pub fn test_config(path: PathBuf, server_url: &str) -> DurabilityConfig {
    DurabilityConfig::builder()
        .database_path(path)
        .server_url(server_url)
        .reachability_debounce(Duration::from_secs(1))
        .item_timeout(Duration::from_secs(2))
        .periodic_sync(None)
        .build()
        .expect("Invalid test config")
}
