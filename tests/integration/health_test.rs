//! Health check over a real database file

use chrono::Duration;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use cradlesync::health::HealthCheck;
use cradlesync::shared::{EntityType, HealthThresholds, ManualClock, SyncAction};
use cradlesync::sync::SyncStatus;

use crate::common::*;

#[tokio::test]
async fn test_repeated_runs_change_nothing() {
    let env = TestEnv::new().await;
    env.queue.enqueue(EntityType::Feeding, SyncAction::Create, b"f".to_vec()).await.unwrap();
    env.queue.enqueue(EntityType::Milestone, SyncAction::Create, b"m".to_vec()).await.unwrap();
    sqlx::query("UPDATE local_store SET value = 'garbage' WHERE entity_type = 'milestone'")
        .execute(env.db.pool())
        .await
        .unwrap();

    let engine = env.engine(Arc::new(ScriptedTransport::accepting()));
    let rows_before = env.db.fetch_entity_rows().await.unwrap();
    let queue_before = env.queue.peek_all().await.unwrap();

    let first = env.health.run().await;
    for _ in 0..5 {
        assert_eq!(env.health.run().await, first);
    }

    assert!(!first.is_healthy);
    assert_eq!(first.issues.len(), 1);
    assert_eq!(first.pending_item_count, 2);
    assert_eq!(env.db.fetch_entity_rows().await.unwrap(), rows_before);
    assert_eq!(env.queue.peek_all().await.unwrap(), queue_before);
    assert_eq!(engine.status(), SyncStatus::Idle);
}

#[tokio::test]
async fn test_report_serializes_with_camel_case_fields() {
    let env = TestEnv::new().await;
    let report = env.health.run().await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["isHealthy"], serde_json::json!(true));
    assert!(json.get("pendingItemCount").is_some());
    assert!(json.get("storageBytes").is_some());
}

#[tokio::test]
async fn test_stale_backup_warning() {
    let env = TestEnv::new().await;
    env.snapshots.create_backup().await.unwrap();

    let clock = Arc::new(ManualClock::new(env.clock.now()));
    let health = HealthCheck::new(env.db.clone(), clock.clone(), HealthThresholds::default());
    assert!(health.run().await.warnings.is_empty());

    clock.advance(Duration::days(8));
    let report = health.run().await;
    assert!(report.is_healthy);
    assert_eq!(report.warnings, vec!["newest backup is 8 days old".to_string()]);
}
