//! cradlesync - Local-First Durability Layer
//!
//! cradlesync keeps an infant-care app's records safe on the device and gets them
//! to the server eventually. Every change is applied to a local cache and written
//! to a durable queue before the caller gets control back; the queue drains
//! whenever connectivity returns.
//!
//! # Module Structure
//!
//! - **`shared`** - Types used everywhere
//!   - Entity types, mutation actions and the queued `SyncItem`
//!   - Clock abstraction, configuration, error types
//!
//! - **`local_db`** - SQLite persistence (sqlx, WAL mode)
//!   - Local Store rows, sync queue rows, sync metadata, retained backups
//!   - Schema versioning
//!
//! - **`offline`** - Optimistic writes
//!   - `LocalStore`: latest value set per entity type
//!   - `MutationQueue`: durable FIFO of pending changes
//!
//! - **`sync`** - Getting changes to the remote
//!   - `SyncEngine`: single-pass state machine with progress reporting
//!   - `ReachabilityMonitor`: debounced connectivity
//!   - `SyncScheduler`: reconnect, periodic and manual triggers
//!   - `SyncTransport` / `HttpTransport`
//!
//! - **`snapshot`** - Versioned export/import and retained backups
//!
//! - **`health`** - Read-only audit of local storage
//!
//! - **`durability`** - `DurabilityLayer`, the composition root
//!
//! # Guarantees
//!
//! - A change acknowledged by `enqueue` survives a process kill
//! - Pending changes are sent in the order they were made
//! - Only changes the remote confirmed leave the queue
//! - At most one sync pass runs at a time
//! - Corrupted cache entries read as absent and show up in the health report
//!
//! # Usage
//!
//! ```rust,no_run
//! use cradlesync::durability::DurabilityLayer;
//! use cradlesync::shared::{DurabilityConfig, EntityType, SyncAction, SystemClock};
//! use cradlesync::sync::HttpTransport;
//! use std::sync::Arc;
//!
//! # async fn example() -> cradlesync::shared::Result<()> {
//! let config = DurabilityConfig::from_env()?;
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let layer = DurabilityLayer::open(config, transport, Arc::new(SystemClock::new())).await?;
//!
//! layer.enqueue(EntityType::Milestone, SyncAction::Create, br#"[{"title":"first smile"}]"#.to_vec()).await?;
//! let report = layer.health_check().await;
//! assert!(report.is_healthy);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - `DurabilityError` for storage, serialization, version and configuration failures
//! - `TransportError` for a single item that could not be sent; recorded in the
//!   pass outcome, never raised
//! - The health check never fails; problems are reported as issues

/// Shared types and data structures
pub mod shared;

/// SQLite persistence
pub mod local_db;

/// Local Store and Mutation Queue
pub mod offline;

/// Sync engine, reachability and scheduling
pub mod sync;

/// Snapshot export/import and backups
pub mod snapshot;

/// Storage health audit
pub mod health;

/// Composition root
pub mod durability;
