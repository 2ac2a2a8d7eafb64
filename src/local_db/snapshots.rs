//! Retained backup rows

use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::local_db::{decode_timestamp, encode_timestamp, LocalDatabase};
use crate::shared::error::Result;

/// Metadata of a retained backup
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub id: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl LocalDatabase {
    /// Store a backup document and evict the oldest beyond `retain`
    ///
    /// Returns the number of evicted backups.
    pub async fn insert_backup(
        &self,
        id: &str,
        version: &str,
        created_at: DateTime<Utc>,
        document: &str,
        retain: usize,
    ) -> Result<u64> {
        let _guard = self.write_guard().await;
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO snapshots (id, version, created_at, document) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(version)
            .bind(encode_timestamp(created_at))
            .bind(document)
            .execute(&mut *tx)
            .await?;

        let evicted = sqlx::query(
            "DELETE FROM snapshots WHERE seq NOT IN (
                SELECT seq FROM snapshots ORDER BY seq DESC LIMIT ?
            )",
        )
        .bind(retain as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(evicted.rows_affected())
    }

    /// Retained backups, newest first
    pub async fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        let rows = sqlx::query(
            "SELECT id, version, created_at, LENGTH(document) AS size_bytes
             FROM snapshots
             ORDER BY seq DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.try_get("created_at")?;
                let size_bytes: i64 = row.try_get("size_bytes")?;
                Ok(BackupRecord {
                    id: row.try_get("id")?,
                    version: row.try_get("version")?,
                    created_at: decode_timestamp(&created_at)?,
                    size_bytes: size_bytes.max(0) as u64,
                })
            })
            .collect()
    }

    /// Fetch the document of one backup
    pub async fn fetch_backup_document(&self, id: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT document FROM snapshots WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("document")?)),
            None => Ok(None),
        }
    }
}
