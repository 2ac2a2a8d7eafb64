//! Shared Module
//!
//! Types used by every component of the durability layer: the entity and action
//! enums, the queued [`SyncItem`], the clock abstraction, configuration and the
//! error taxonomy.

/// Entity types and mutation actions
pub mod entity;

/// Queued mutation type
pub mod sync_item;

/// Clock abstraction
pub mod clock;

/// Durability layer configuration
pub mod config;

/// Error types
pub mod error;

/// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, DurabilityConfig, DurabilityConfigBuilder, HealthThresholds};
pub use entity::{EntityType, SyncAction};
pub use error::{DurabilityError, Result};
pub use sync_item::SyncItem;
