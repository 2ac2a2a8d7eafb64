//! # Snapshot Service
//!
//! Versioned export and import of everything needed to rebuild local state:
//! the Local Store, the pending queue and the last sync timestamp.
//!
//! ## Document format
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "createdAt": "2026-03-01T08:00:00Z",
//!   "entities": { "feeding": [91, 93] },
//!   "pendingItems": [ { "id": "...", "entityType": "feeding", ... } ],
//!   "lastSyncTimestamp": null
//! }
//! ```
//!
//! Any `1.x.y` document is accepted on import. The version is checked before
//! anything else is decoded or touched, so a rejected import leaves local state
//! exactly as it was.
//!
//! ## Backups
//!
//! `create_backup` keeps snapshots inside the database and evicts the oldest
//! beyond the configured retention. `write_to_file` / `read_from_file` cover
//! manual export and share.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::local_db::snapshots::BackupRecord;
use crate::local_db::LocalDatabase;
use crate::shared::clock::Clock;
use crate::shared::entity::EntityType;
use crate::shared::error::{DurabilityError, Result};
use crate::shared::sync_item::SyncItem;

/// Version written by this build
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Portable image of local state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub entities: BTreeMap<EntityType, Vec<u8>>,
    pub pending_items: Vec<SyncItem>,
    pub last_sync_timestamp: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Decode a document, rejecting unsupported versions before the body is read
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let version = value
            .get("version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DurabilityError::serialization("snapshot has no version field"))?;
        check_version(version)?;

        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Accept any version sharing the current major component
pub fn check_version(found: &str) -> Result<()> {
    let major = |version: &str| version.split('.').next().and_then(|m| m.parse::<u64>().ok());

    match (major(found), major(SNAPSHOT_VERSION)) {
        (Some(found_major), Some(supported_major)) if found_major == supported_major => Ok(()),
        _ => Err(DurabilityError::incompatible_version(found, SNAPSHOT_VERSION)),
    }
}

/// Export, import and retained backups of local state
#[derive(Debug, Clone)]
pub struct SnapshotService {
    db: Arc<LocalDatabase>,
    clock: Arc<dyn Clock>,
    retention: usize,
}

impl SnapshotService {
    pub fn new(db: Arc<LocalDatabase>, clock: Arc<dyn Clock>, retention: usize) -> Self {
        Self {
            db,
            clock,
            retention: retention.max(1),
        }
    }

    /// Capture current local state; works offline and regardless of sync status
    ///
    /// Corrupted store entries are left out. An unreadable pending item fails the
    /// export instead, since importing the snapshot would replace the queue without it.
    pub async fn export_snapshot(&self) -> Result<Snapshot> {
        // Holding the write guard keeps enqueue from interleaving with the reads
        let _guard = self.db.write_guard().await;
        let mut tx = self.db.pool().begin().await?;

        let mut entities = BTreeMap::new();
        for row in LocalDatabase::fetch_entity_rows_with(&mut *tx).await? {
            match row.decode() {
                Ok((entity_type, payload)) => {
                    entities.insert(entity_type, payload);
                }
                Err(reason) => {
                    tracing::warn!(key = %row.key, %reason, "leaving corrupted entry out of snapshot");
                }
            }
        }
        let queue = LocalDatabase::fetch_queue_rows_with(&mut *tx).await?;
        if !queue.unreadable.is_empty() {
            tracing::warn!(ids = ?queue.unreadable, "refusing to export unreadable pending items");
            return Err(DurabilityError::serialization(format!(
                "{} pending item(s) unreadable: {}",
                queue.unreadable.len(),
                queue.unreadable.join(", ")
            )));
        }
        let last_sync_timestamp = LocalDatabase::get_last_sync_time_with(&mut *tx).await?;
        tx.commit().await?;

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION.to_string(),
            created_at: self.clock.now(),
            entities,
            pending_items: queue.items,
            last_sync_timestamp,
        };

        tracing::info!(
            entities = snapshot.entities.len(),
            pending = snapshot.pending_items.len(),
            "exported snapshot"
        );
        Ok(snapshot)
    }

    /// Replace local state with `snapshot`
    ///
    /// All or nothing: on any error the previous state is kept.
    pub async fn import_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        check_version(&snapshot.version)?;

        let _guard = self.db.write_guard().await;
        let mut tx = self.db.pool().begin().await?;

        LocalDatabase::delete_all_entities(&mut *tx).await?;
        LocalDatabase::delete_all_queue_items(&mut *tx).await?;
        for (entity_type, payload) in &snapshot.entities {
            LocalDatabase::upsert_entity(&mut *tx, *entity_type, payload, snapshot.created_at).await?;
        }
        for item in &snapshot.pending_items {
            LocalDatabase::insert_queue_item(&mut *tx, item).await?;
        }
        LocalDatabase::put_last_sync_time(&mut *tx, snapshot.last_sync_timestamp).await?;

        tx.commit().await?;

        tracing::info!(
            version = %snapshot.version,
            entities = snapshot.entities.len(),
            pending = snapshot.pending_items.len(),
            "imported snapshot"
        );
        Ok(())
    }

    /// Export and retain a backup, evicting the oldest beyond retention
    pub async fn create_backup(&self) -> Result<BackupRecord> {
        let snapshot = self.export_snapshot().await?;
        let document = serde_json::to_string(&snapshot)?;
        let id = Uuid::new_v4().to_string();

        let evicted = self
            .db
            .insert_backup(&id, &snapshot.version, snapshot.created_at, &document, self.retention)
            .await?;
        tracing::info!(backup_id = %id, evicted, "created backup");

        Ok(BackupRecord {
            id,
            version: snapshot.version,
            created_at: snapshot.created_at,
            size_bytes: document.len() as u64,
        })
    }

    /// Retained backups, newest first
    pub async fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        self.db.list_backups().await
    }

    /// Decode a retained backup without applying it
    pub async fn load_backup(&self, id: &str) -> Result<Snapshot> {
        let document = self
            .db
            .fetch_backup_document(id)
            .await?
            .ok_or_else(|| DurabilityError::not_found(format!("backup {}", id)))?;
        Snapshot::from_json(&document)
    }

    /// Replace local state with a retained backup
    pub async fn restore_backup(&self, id: &str) -> Result<Snapshot> {
        let snapshot = self.load_backup(id).await?;
        self.import_snapshot(&snapshot).await?;
        tracing::info!(backup_id = %id, "restored backup");
        Ok(snapshot)
    }

    /// Export to a pretty-printed JSON file
    pub async fn write_to_file(&self, path: impl AsRef<Path>) -> Result<Snapshot> {
        let path = path.as_ref();
        let snapshot = self.export_snapshot().await?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, snapshot.to_json_pretty()?).await?;

        tracing::info!(path = %path.display(), "wrote snapshot file");
        Ok(snapshot)
    }

    /// Read and validate a snapshot file without applying it
    pub async fn read_from_file(&self, path: impl AsRef<Path>) -> Result<Snapshot> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Snapshot::from_json(&json)
    }
}
