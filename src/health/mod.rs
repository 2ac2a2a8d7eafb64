//! # Health Check
//!
//! Read-only audit of local storage. Produces a [`HealthReport`] listing
//! problems that lose data (issues) and conditions worth surfacing to the user
//! (warnings). The check never writes and never fails: a storage error while
//! auditing becomes an issue in the report.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;

use crate::local_db::LocalDatabase;
use crate::shared::clock::Clock;
use crate::shared::config::HealthThresholds;

/// Outcome of a health check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// True iff `issues` is empty
    pub is_healthy: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub storage_bytes: u64,
    pub pending_item_count: usize,
}

/// Auditor over the local database
#[derive(Debug, Clone)]
pub struct HealthCheck {
    db: Arc<LocalDatabase>,
    clock: Arc<dyn Clock>,
    thresholds: HealthThresholds,
}

impl HealthCheck {
    pub fn new(db: Arc<LocalDatabase>, clock: Arc<dyn Clock>, thresholds: HealthThresholds) -> Self {
        Self {
            db,
            clock,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &HealthThresholds {
        &self.thresholds
    }

    /// Audit local state
    pub async fn run(&self) -> HealthReport {
        let mut report = HealthReport::default();
        let now = self.clock.now();

        match self.db.fetch_entity_rows().await {
            Ok(rows) => {
                for row in rows {
                    if let Err(reason) = row.decode() {
                        report
                            .issues
                            .push(format!("corrupted local store entry '{}': {}", row.key, reason));
                    }
                }
            }
            Err(e) => report.issues.push(format!("local store unreadable: {}", e)),
        }

        match self.db.fetch_queue_rows().await {
            Ok(rows) => {
                report.pending_item_count = rows.items.len() + rows.unreadable.len();
                for id in rows.unreadable {
                    report.issues.push(format!("unreadable pending item {}", id));
                }
            }
            Err(e) => report.issues.push(format!("sync queue unreadable: {}", e)),
        }

        if report.pending_item_count > self.thresholds.max_pending_items {
            report.warnings.push(format!(
                "{} items waiting to sync (more than {})",
                report.pending_item_count, self.thresholds.max_pending_items
            ));
        }

        match self.db.get_last_sync_time().await {
            Ok(Some(last_sync)) => {
                let age = now - last_sync;
                if age > Duration::days(self.thresholds.stale_sync_days) {
                    report
                        .warnings
                        .push(format!("last successful sync was {} ago", describe_age(age)));
                }
            }
            Ok(None) if report.pending_item_count > 0 => {
                report.warnings.push(format!(
                    "never synced with {} items pending",
                    report.pending_item_count
                ));
            }
            Ok(None) => {}
            Err(e) => report.issues.push(format!("last sync time unreadable: {}", e)),
        }

        match self.db.storage_bytes().await {
            Ok(bytes) => {
                report.storage_bytes = bytes;
                if bytes > self.thresholds.max_storage_bytes {
                    report.warnings.push(format!(
                        "local storage uses {} bytes (more than {})",
                        bytes, self.thresholds.max_storage_bytes
                    ));
                }
            }
            Err(e) => report.issues.push(format!("storage size unavailable: {}", e)),
        }

        match self.db.list_backups().await {
            Ok(backups) => {
                let stale_after = Duration::days(self.thresholds.stale_backup_days);
                if let Some(newest) = backups.first() {
                    let age = now - newest.created_at;
                    if age > stale_after {
                        report
                            .warnings
                            .push(format!("newest backup is {} old", describe_age(age)));
                    }
                }
            }
            Err(e) => report.issues.push(format!("backups unreadable: {}", e)),
        }

        report.is_healthy = report.issues.is_empty();

        if report.is_healthy {
            tracing::debug!(warnings = report.warnings.len(), "health check passed");
        } else {
            tracing::warn!(issues = ?report.issues, "health check found issues");
        }
        report
    }
}

/// Whole days, plus leftover hours when there are any
fn describe_age(age: Duration) -> String {
    let days = age.num_days();
    let hours = (age - Duration::days(days)).num_hours();
    let plural = |n: i64| if n == 1 { "" } else { "s" };
    if hours == 0 {
        format!("{} day{}", days, plural(days))
    } else {
        format!("{} day{} {} hour{}", days, plural(days), hours, plural(hours))
    }
}
