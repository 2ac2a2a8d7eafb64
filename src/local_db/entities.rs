//! # Local Store Rows
//!
//! One row per entity type holding the latest value set. The value column is a
//! JSON envelope naming the entity type and carrying the payload, so a row whose
//! text no longer parses, or whose envelope disagrees with its key, is detectable
//! as corrupt instead of being handed to the display layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite};

use crate::local_db::{encode_timestamp, LocalDatabase};
use crate::shared::entity::EntityType;
use crate::shared::error::Result;

/// Envelope stored in `local_store.value`
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    entity_type: EntityType,
    payload: Vec<u8>,
}

/// A `local_store` row exactly as persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntityRow {
    pub key: String,
    pub value: String,
}

impl RawEntityRow {
    /// Decode the envelope, describing what is wrong when it cannot be read
    pub fn decode(&self) -> std::result::Result<(EntityType, Vec<u8>), String> {
        let key: EntityType = self.key.parse().map_err(|e| format!("{}", e))?;
        let entry: StoredEntry = serde_json::from_str(&self.value)
            .map_err(|e| format!("unreadable value for '{}': {}", self.key, e))?;
        if entry.entity_type != key {
            return Err(format!(
                "row '{}' holds a value for '{}'",
                self.key, entry.entity_type
            ));
        }
        Ok((key, entry.payload))
    }
}

/// Encode a payload into the stored envelope
pub(crate) fn encode_entry(entity_type: EntityType, payload: &[u8]) -> Result<String> {
    Ok(serde_json::to_string(&StoredEntry {
        entity_type,
        payload: payload.to_vec(),
    })?)
}

impl LocalDatabase {
    /// Insert or replace the value set of one entity type
    pub(crate) async fn upsert_entity<'e, E>(
        executor: E,
        entity_type: EntityType,
        payload: &[u8],
        updated_at: DateTime<Utc>,
    ) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO local_store (entity_type, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(entity_type) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(entity_type.as_str())
        .bind(encode_entry(entity_type, payload)?)
        .bind(encode_timestamp(updated_at))
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Delete the value set of one entity type
    pub(crate) async fn delete_entity<'e, E>(executor: E, entity_type: EntityType) -> Result<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM local_store WHERE entity_type = ?")
            .bind(entity_type.as_str())
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every cached value set
    pub(crate) async fn delete_all_entities<'e, E>(executor: E) -> Result<u64>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM local_store").execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Fetch the raw row of one entity type
    pub async fn fetch_entity_row(&self, entity_type: EntityType) -> Result<Option<RawEntityRow>> {
        let row = sqlx::query("SELECT entity_type, value FROM local_store WHERE entity_type = ?")
            .bind(entity_type.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(RawEntityRow {
                key: row.try_get("entity_type")?,
                value: row.try_get("value")?,
            })),
            None => Ok(None),
        }
    }

    /// Fetch every raw row, ordered by key
    pub async fn fetch_entity_rows(&self) -> Result<Vec<RawEntityRow>> {
        Self::fetch_entity_rows_with(&self.pool).await
    }

    pub(crate) async fn fetch_entity_rows_with<'e, E>(executor: E) -> Result<Vec<RawEntityRow>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let rows = sqlx::query("SELECT entity_type, value FROM local_store ORDER BY entity_type")
            .fetch_all(executor)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(RawEntityRow {
                    key: row.try_get("entity_type")?,
                    value: row.try_get("value")?,
                })
            })
            .collect()
    }
}
