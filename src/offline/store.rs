//! # Local Store
//!
//! Latest known value set per entity type. This is what the UI renders, so it
//! is written optimistically by every enqueue and never waits on the remote.
//!
//! Reads never fail on bad cache contents: an entry that cannot be decoded is
//! logged and reported as absent, and the health check flags it as an issue.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::local_db::entities::RawEntityRow;
use crate::local_db::LocalDatabase;
use crate::shared::clock::Clock;
use crate::shared::entity::EntityType;
use crate::shared::error::Result;

/// Durable key/value store partitioned by entity type
#[derive(Debug, Clone)]
pub struct LocalStore {
    db: Arc<LocalDatabase>,
    clock: Arc<dyn Clock>,
}

impl LocalStore {
    pub fn new(db: Arc<LocalDatabase>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Replace the value set of `entity_type`; committed before returning
    pub async fn put(&self, entity_type: EntityType, payload: &[u8]) -> Result<()> {
        let _guard = self.db.write_guard().await;
        LocalDatabase::upsert_entity(self.db.pool(), entity_type, payload, self.clock.now()).await
    }

    /// Latest value set, or `None` when absent or unreadable
    ///
    /// Only a storage failure is an error.
    pub async fn get(&self, entity_type: EntityType) -> Result<Option<Vec<u8>>> {
        let Some(row) = self.db.fetch_entity_row(entity_type).await? else {
            return Ok(None);
        };

        match row.decode() {
            Ok((_, payload)) => Ok(Some(payload)),
            Err(reason) => {
                tracing::warn!(entity_type = %entity_type, %reason, "ignoring corrupted local store entry");
                Ok(None)
            }
        }
    }

    /// Remove the value set of `entity_type`; returns whether one existed
    pub async fn remove(&self, entity_type: EntityType) -> Result<bool> {
        let _guard = self.db.write_guard().await;
        LocalDatabase::delete_entity(self.db.pool(), entity_type).await
    }

    /// Every readable entry; corrupted rows are skipped
    pub async fn entries(&self) -> Result<BTreeMap<EntityType, Vec<u8>>> {
        let mut entries = BTreeMap::new();
        for row in self.db.fetch_entity_rows().await? {
            match row.decode() {
                Ok((entity_type, payload)) => {
                    entries.insert(entity_type, payload);
                }
                Err(reason) => {
                    tracing::warn!(key = %row.key, %reason, "skipping corrupted local store entry");
                }
            }
        }
        Ok(entries)
    }

    /// Undecoded rows, for auditing
    pub async fn raw_entries(&self) -> Result<Vec<RawEntityRow>> {
        self.db.fetch_entity_rows().await
    }
}
