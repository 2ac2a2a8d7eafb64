//! Sync metadata key/value rows

use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite};

use crate::local_db::{decode_timestamp, encode_timestamp, LocalDatabase};
use crate::shared::error::Result;

/// Key of the last fully successful sync
pub const LAST_SYNC_KEY: &str = "last_sync_time";

impl LocalDatabase {
    /// Set sync metadata
    pub(crate) async fn set_sync_metadata<'e, E>(
        executor: E,
        key: &str,
        value: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT OR REPLACE INTO sync_metadata (key, value, updated_at)
             VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(encode_timestamp(updated_at))
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Remove sync metadata
    pub(crate) async fn delete_sync_metadata<'e, E>(executor: E, key: &str) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("DELETE FROM sync_metadata WHERE key = ?")
            .bind(key)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Get sync metadata
    pub async fn get_sync_metadata(&self, key: &str) -> Result<Option<String>> {
        Self::get_sync_metadata_with(&self.pool, key).await
    }

    pub(crate) async fn get_sync_metadata_with<'e, E>(executor: E, key: &str) -> Result<Option<String>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT value FROM sync_metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(executor)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    /// Get last sync timestamp
    pub async fn get_last_sync_time(&self) -> Result<Option<DateTime<Utc>>> {
        Self::get_last_sync_time_with(&self.pool).await
    }

    pub(crate) async fn get_last_sync_time_with<'e, E>(executor: E) -> Result<Option<DateTime<Utc>>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        Self::get_sync_metadata_with(executor, LAST_SYNC_KEY)
            .await?
            .map(|value| decode_timestamp(&value))
            .transpose()
    }

    /// Set or clear the last sync timestamp
    pub(crate) async fn put_last_sync_time<'e, E>(
        executor: E,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        match timestamp {
            Some(timestamp) => {
                Self::set_sync_metadata(executor, LAST_SYNC_KEY, &encode_timestamp(timestamp), timestamp)
                    .await
            }
            None => Self::delete_sync_metadata(executor, LAST_SYNC_KEY).await,
        }
    }
}
