//! # Local Database Module
//!
//! SQLite persistence shared by every durability component. Each component owns a
//! disjoint table:
//!
//! - `local_store` - latest value set per entity type (`entities.rs`)
//! - `sync_queue` - pending mutations in FIFO order (`queue.rs`)
//! - `sync_metadata` - last sync timestamp and other markers (`metadata.rs`)
//! - `snapshots` - retained backups (`snapshots.rs`)
//!
//! Every write commits before the call returns. Writers are serialized by a
//! coarse async lock on top of SQLite's own locking, so concurrent enqueues from
//! several UI actions never interleave inside a transaction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cradlesync::local_db::LocalDatabase;
//!
//! # async fn example() -> cradlesync::shared::Result<()> {
//! let db = LocalDatabase::open("/tmp/cradlesync.db").await?;
//! let stats = db.get_stats().await?;
//! println!("{} pending items", stats.pending_items);
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod queue;
pub mod metadata;
pub mod snapshots;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

use crate::shared::error::{DurabilityError, Result};

/// Schema version this build writes
pub const SCHEMA_VERSION: i64 = 1;

/// Every schema version, oldest first, with what it introduced
const MIGRATIONS: &[(i64, &str)] = &[(1, "local store, sync queue, metadata and snapshots")];

/// Local database connection manager
///
/// Owns the SQLite pool and the write lock that serializes mutations.
#[derive(Debug)]
pub struct LocalDatabase {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl LocalDatabase {
    /// Open or create the database file
    ///
    /// Creates parent directories and the schema when missing. WAL journaling
    /// with `synchronous=FULL` makes each commit durable before it returns.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "opened local database");
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database
    ///
    /// Uses a single long-lived connection since every SQLite memory connection
    /// is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        db.init_schema().await?;
        Ok(db)
    }

    /// Create all tables and apply pending migrations
    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("schema.sql"))
            .execute(&self.pool)
            .await?;

        self.run_migrations().await
    }

    /// Record applied schema versions; a database written by a newer build is refused
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let (applied,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        if applied > SCHEMA_VERSION {
            return Err(DurabilityError::incompatible_version(
                format!("schema {}", applied),
                format!("schema {}", SCHEMA_VERSION),
            ));
        }
        if applied == SCHEMA_VERSION {
            tracing::debug!(version = applied, "schema up to date");
            return Ok(());
        }

        for &(version, description) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
            sqlx::query(
                "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?, ?, ?)",
            )
            .bind(version)
            .bind(description)
            .bind(encode_timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
            tracing::info!(version, description, "applied schema migration");
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire the coarse write lock
    pub(crate) async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Close every pooled connection; later calls fail with a persistence error
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Size of the database in bytes (pages in use times page size)
    pub async fn storage_bytes(&self) -> Result<u64> {
        let (bytes,): (i64,) = sqlx::query_as(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(bytes.max(0) as u64)
    }

    /// Drop the cached value sets and every pending mutation in one transaction
    ///
    /// Backups and the last sync timestamp are kept.
    pub async fn clear_local_data(&self) -> Result<(u64, u64)> {
        let _guard = self.write_guard().await;
        let mut tx = self.pool.begin().await?;
        let entities = Self::delete_all_entities(&mut *tx).await?;
        let items = Self::delete_all_queue_items(&mut *tx).await?;
        tx.commit().await?;

        tracing::warn!(entities, items, "cleared local cache and pending mutations");
        Ok((entities, items))
    }

    /// Get database statistics
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let (entity_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM local_store")
            .fetch_one(&self.pool)
            .await?;
        let (pending_items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(&self.pool)
            .await?;
        let (backup_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM snapshots")
            .fetch_one(&self.pool)
            .await?;

        Ok(DatabaseStats {
            entity_count: entity_count as u64,
            pending_items: pending_items as u64,
            backup_count: backup_count as u64,
            storage_bytes: self.storage_bytes().await?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Entity types with a cached value set
    pub entity_count: u64,
    /// Items waiting in the sync queue
    pub pending_items: u64,
    /// Retained backups
    pub backup_count: u64,
    /// Database size in bytes
    pub storage_bytes: u64,
}

/// Timestamps are stored as RFC 3339 with nanosecond precision so they read back exactly
pub(crate) fn encode_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| DurabilityError::serialization(format!("bad timestamp '{}': {}", value, e)))
}
