//! Entity types and mutation actions
//!
//! [`EntityType`] is the closed set of record kinds the app keeps. It partitions
//! the local store and tags every queued mutation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::error::DurabilityError;

/// Kind of record being cached and synchronized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Feeding,
    Sleep,
    DiaperChange,
    Milestone,
    GrowthMeasurement,
    Vaccination,
    Appointment,
    Reminder,
    MoodEntry,
    SelfCareEntry,
}

impl EntityType {
    /// Every entity type, in declaration order
    pub const ALL: [EntityType; 10] = [
        EntityType::Feeding,
        EntityType::Sleep,
        EntityType::DiaperChange,
        EntityType::Milestone,
        EntityType::GrowthMeasurement,
        EntityType::Vaccination,
        EntityType::Appointment,
        EntityType::Reminder,
        EntityType::MoodEntry,
        EntityType::SelfCareEntry,
    ];

    /// Storage key of this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Feeding => "feeding",
            EntityType::Sleep => "sleep",
            EntityType::DiaperChange => "diaper_change",
            EntityType::Milestone => "milestone",
            EntityType::GrowthMeasurement => "growth_measurement",
            EntityType::Vaccination => "vaccination",
            EntityType::Appointment => "appointment",
            EntityType::Reminder => "reminder",
            EntityType::MoodEntry => "mood_entry",
            EntityType::SelfCareEntry => "self_care_entry",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DurabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|entity| entity.as_str() == s)
            .ok_or_else(|| DurabilityError::serialization(format!("unknown entity type '{}'", s)))
    }
}

/// Kind of change a queued mutation carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    /// Storage name of this action
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = DurabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(SyncAction::Create),
            "update" => Ok(SyncAction::Update),
            "delete" => Ok(SyncAction::Delete),
            other => Err(DurabilityError::serialization(format!(
                "unknown sync action '{}'",
                other
            ))),
        }
    }
}
