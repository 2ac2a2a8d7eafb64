//! # Mutation Queue
//!
//! Ordered, durable log of changes awaiting transmission.
//!
//! ## Guarantees
//!
//! - **Optimistic apply**: `enqueue` writes the Local Store entry and appends the
//!   queue item in one transaction, so the UI sees the change immediately.
//! - **Durable**: every mutation is committed before the call returns.
//! - **FIFO**: items are returned in enqueue order.
//! - **Id-based draining**: `remove_succeeded` evicts confirmed items by id, so
//!   failed items keep their relative order and items appended during a sync pass
//!   are untouched.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cradlesync::offline::MutationQueue;
//! use cradlesync::shared::{EntityType, SyncAction};
//!
//! # async fn example(queue: MutationQueue) -> cradlesync::shared::Result<()> {
//! let id = queue
//!     .enqueue(EntityType::Feeding, SyncAction::Create, br#"[{"ml":90}]"#.to_vec())
//!     .await?;
//!
//! for item in queue.peek_all().await? {
//!     // transmit...
//! }
//! queue.remove_succeeded(&[id]).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::local_db::LocalDatabase;
use crate::shared::clock::Clock;
use crate::shared::entity::{EntityType, SyncAction};
use crate::shared::error::Result;
use crate::shared::sync_item::SyncItem;

/// Durable FIFO of pending mutations
#[derive(Debug, Clone)]
pub struct MutationQueue {
    db: Arc<LocalDatabase>,
    clock: Arc<dyn Clock>,
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Total pending items
    pub pending: usize,
    /// Pending items per entity type
    pub by_entity: BTreeMap<EntityType, usize>,
    /// Enqueue time of the oldest pending item
    pub oldest: Option<DateTime<Utc>>,
}

impl MutationQueue {
    pub fn new(db: Arc<LocalDatabase>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Apply a change locally and queue it for sync
    ///
    /// The payload replaces the Local Store entry for `entity_type`. A delete
    /// with an empty payload removes the entry instead. Returns the new item id
    /// once both writes are durable; a storage failure is returned so the
    /// caller can warn that the change may not be saved.
    pub async fn enqueue(
        &self,
        entity_type: EntityType,
        action: SyncAction,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Uuid> {
        let _guard = self.db.write_guard().await;
        let item = SyncItem::new(entity_type, action, payload.into(), self.clock.now());

        let mut tx = self.db.pool().begin().await?;
        if action == SyncAction::Delete && item.payload.is_empty() {
            LocalDatabase::delete_entity(&mut *tx, entity_type).await?;
        } else {
            LocalDatabase::upsert_entity(&mut *tx, entity_type, &item.payload, item.timestamp)
                .await?;
        }
        LocalDatabase::insert_queue_item(&mut *tx, &item).await?;
        tx.commit().await?;

        tracing::debug!(
            item_id = %item.id,
            entity_type = %entity_type,
            action = %action,
            bytes = item.payload.len(),
            "enqueued mutation"
        );
        Ok(item.id)
    }

    /// Every pending item in enqueue order
    pub async fn peek_all(&self) -> Result<Vec<SyncItem>> {
        Ok(self.db.fetch_queue_rows().await?.items)
    }

    /// Remove the items confirmed by the remote; unknown ids are ignored
    pub async fn remove_succeeded(&self, ids: &[Uuid]) -> Result<u64> {
        let _guard = self.db.write_guard().await;
        let removed = LocalDatabase::delete_queue_items(self.db.pool(), ids).await?;
        tracing::debug!(requested = ids.len(), removed, "removed synced items");
        Ok(removed)
    }

    /// Remove the items of a fully successful pass and record the sync time atomically
    pub async fn complete_pass(&self, ids: &[Uuid], synced_at: DateTime<Utc>) -> Result<u64> {
        let removed = self.db.record_sync_results(ids, Some(synced_at)).await?;
        tracing::debug!(removed, %synced_at, "recorded completed sync pass");
        Ok(removed)
    }

    /// Drop every pending item
    pub async fn clear(&self) -> Result<u64> {
        let _guard = self.db.write_guard().await;
        let removed = LocalDatabase::delete_all_queue_items(self.db.pool()).await?;
        tracing::info!(removed, "cleared mutation queue");
        Ok(removed)
    }

    /// User-initiated reset: drop the Local Store and every pending item together
    ///
    /// Returns `(entities, items)` removed. Unsynced changes are lost.
    pub async fn clear_cache(&self) -> Result<(u64, u64)> {
        self.db.clear_local_data().await
    }

    /// Number of pending items
    pub async fn len(&self) -> Result<usize> {
        self.db.count_queue_items().await
    }

    /// Whether nothing is pending
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Pending counts per entity type and the oldest item's age
    pub async fn stats(&self) -> Result<QueueStats> {
        let items = self.peek_all().await?;
        let mut stats = QueueStats {
            pending: items.len(),
            oldest: items.first().map(|item| item.timestamp),
            ..QueueStats::default()
        };
        for item in &items {
            *stats.by_entity.entry(item.entity_type).or_insert(0) += 1;
        }
        Ok(stats)
    }
}
