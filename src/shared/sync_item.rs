//! Queued mutation awaiting transmission

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::entity::{EntityType, SyncAction};

/// One durable, queued mutation
///
/// The payload is the record's full serialized state at enqueue time; it is
/// opaque to the durability layer. Deletes carry an empty payload by convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncItem {
    /// Identifier assigned at enqueue time, never reused
    pub id: Uuid,
    /// Kind of record
    pub entity_type: EntityType,
    /// Kind of change
    pub action: SyncAction,
    /// Serialized record state
    pub payload: Vec<u8>,
    /// Enqueue time
    pub timestamp: DateTime<Utc>,
}

impl SyncItem {
    /// Create a new item with a fresh identifier
    pub fn new(
        entity_type: EntityType,
        action: SyncAction,
        payload: Vec<u8>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            action,
            payload,
            timestamp,
        }
    }
}
