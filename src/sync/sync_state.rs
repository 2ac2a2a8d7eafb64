//! # Sync State
//!
//! Status, progress and outcome types of the sync engine.
//!
//! ```text
//! Idle ──► Syncing ──► Completed ──► Syncing ...
//!              └─────► Failed(reason) ──► Syncing ...
//! ```

use serde::Serialize;

/// Lifecycle state of the sync engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Completed,
    Failed(String),
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    /// Failure reason, if the last pass failed
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            SyncStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Progress of the running pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    /// Items confirmed by the remote so far
    pub succeeded: usize,
    /// Items in the pass
    pub total: usize,
}

impl SyncProgress {
    /// Fraction complete (0.0 to 1.0)
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f32 / self.total as f32
        }
    }
}

/// Why `attempt_sync` did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadySyncing,
    Offline,
    QueueEmpty,
}

/// Result of one `attempt_sync` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No pass was started
    Skipped { reason: SkipReason },
    /// Every item of the pass was confirmed
    Completed { synced: usize },
    /// Some items remain queued
    Failed {
        synced: usize,
        failed: usize,
        reason: String,
    },
}

impl SyncOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::Skipped { .. })
    }
}
