//! # Sync Queue Rows
//!
//! Pending mutations, ordered by an autoincrement sequence so FIFO order does not
//! depend on clock values. Removal is always by item id, never by position, so
//! items appended while a sync pass is running are never touched by it.

use sqlx::{Row, Sqlite};
use uuid::Uuid;

use crate::local_db::{decode_timestamp, encode_timestamp, LocalDatabase};
use crate::shared::error::{DurabilityError, Result};
use crate::shared::sync_item::SyncItem;

/// Result of reading the queue: decodable items plus rows that could not be read
#[derive(Debug, Clone, Default)]
pub struct QueueRows {
    pub items: Vec<SyncItem>,
    pub unreadable: Vec<String>,
}

impl LocalDatabase {
    /// Append an item at the tail of the queue
    pub(crate) async fn insert_queue_item<'e, E>(executor: E, item: &SyncItem) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO sync_queue (id, entity_type, action, payload, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item.id.to_string())
        .bind(item.entity_type.as_str())
        .bind(item.action.as_str())
        .bind(item.payload.as_slice())
        .bind(encode_timestamp(item.timestamp))
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Read the whole queue in FIFO order
    pub async fn fetch_queue_rows(&self) -> Result<QueueRows> {
        Self::fetch_queue_rows_with(&self.pool).await
    }

    pub(crate) async fn fetch_queue_rows_with<'e, E>(executor: E) -> Result<QueueRows>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query(
            "SELECT id, entity_type, action, payload, created_at
             FROM sync_queue
             ORDER BY seq ASC",
        )
        .fetch_all(executor)
        .await?;

        let mut result = QueueRows::default();
        for row in rows {
            let id: String = row.try_get("id")?;
            match decode_queue_row(&row) {
                Ok(item) => result.items.push(item),
                Err(e) => {
                    tracing::warn!(item_id = %id, error = %e, "skipping unreadable queue row");
                    result.unreadable.push(id);
                }
            }
        }

        Ok(result)
    }

    /// Delete the given items; ids not present are ignored
    pub(crate) async fn delete_queue_items<'e, E>(executor: E, ids: &[Uuid]) -> Result<u64>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder = sqlx::QueryBuilder::<Sqlite>::new("DELETE FROM sync_queue WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.to_string());
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Delete every queued item
    pub(crate) async fn delete_all_queue_items<'e, E>(executor: E) -> Result<u64>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM sync_queue").execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Remove confirmed items and, after a full pass, record the sync time, in one transaction
    pub async fn record_sync_results(
        &self,
        succeeded: &[Uuid],
        last_sync: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<u64> {
        let _guard = self.write_guard().await;
        let mut tx = self.pool.begin().await?;
        let removed = Self::delete_queue_items(&mut *tx, succeeded).await?;
        if let Some(timestamp) = last_sync {
            Self::put_last_sync_time(&mut *tx, Some(timestamp)).await?;
        }
        tx.commit().await?;
        Ok(removed)
    }

    /// Number of queued rows
    pub async fn count_queue_items(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

fn decode_queue_row(row: &sqlx::sqlite::SqliteRow) -> Result<SyncItem> {
    let id: String = row.try_get("id")?;
    let entity_type: String = row.try_get("entity_type")?;
    let action: String = row.try_get("action")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(SyncItem {
        id: Uuid::parse_str(&id)
            .map_err(|e| DurabilityError::serialization(format!("bad item id '{}': {}", id, e)))?,
        entity_type: entity_type.parse()?,
        action: action.parse()?,
        payload: row.try_get("payload")?,
        timestamp: decode_timestamp(&created_at)?,
    })
}
