//! Snapshot export, import and backups on a real database file

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use cradlesync::shared::{DurabilityError, EntityType, SyncAction};
use cradlesync::snapshot::{Snapshot, SNAPSHOT_VERSION};

use crate::common::*;

async fn seed(env: &TestEnv) {
    env.queue.enqueue(EntityType::Feeding, SyncAction::Create, br#"[{"ml":90}]"#.to_vec()).await.unwrap();
    env.queue.enqueue(EntityType::Sleep, SyncAction::Create, br#"[{"min":45}]"#.to_vec()).await.unwrap();
    env.queue.enqueue(EntityType::Feeding, SyncAction::Update, br#"[{"ml":120}]"#.to_vec()).await.unwrap();
    env.queue.enqueue(EntityType::Reminder, SyncAction::Delete, Vec::new()).await.unwrap();
}

#[tokio::test]
async fn test_round_trip_is_byte_for_byte() {
    let env = TestEnv::new().await;
    seed(&env).await;

    let rows_before = env.db.fetch_entity_rows().await.unwrap();
    let queue_before = env.queue.peek_all().await.unwrap();

    let snapshot = env.snapshots.export_snapshot().await.unwrap();
    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    env.snapshots.import_snapshot(&snapshot).await.unwrap();

    assert_eq!(env.db.fetch_entity_rows().await.unwrap(), rows_before);
    assert_eq!(env.queue.peek_all().await.unwrap(), queue_before);
}

#[tokio::test]
async fn test_round_trip_through_file_into_fresh_database() {
    let source = TestEnv::new().await;
    seed(&source).await;
    let path = source.dir.path().join("export.json");
    let written = source.snapshots.write_to_file(&path).await.unwrap();

    let target = TestEnv::new().await;
    let read = target.snapshots.read_from_file(&path).await.unwrap();
    assert_eq!(read, written);
    target.snapshots.import_snapshot(&read).await.unwrap();

    assert_eq!(target.store.entries().await.unwrap(), source.store.entries().await.unwrap());
    assert_eq!(target.queue.peek_all().await.unwrap(), source.queue.peek_all().await.unwrap());
}

#[tokio::test]
async fn test_unknown_version_leaves_state_unchanged() {
    let env = TestEnv::new().await;
    seed(&env).await;
    let rows_before = env.db.fetch_entity_rows().await.unwrap();
    let queue_before = env.queue.peek_all().await.unwrap();

    let mut incoming = Snapshot {
        version: "3.1.0".to_string(),
        ..env.snapshots.export_snapshot().await.unwrap()
    };
    incoming.entities.clear();
    incoming.pending_items.clear();

    let err = env.snapshots.import_snapshot(&incoming).await.unwrap_err();
    assert_matches!(
        err,
        DurabilityError::IncompatibleVersion { ref found, ref supported }
            if found == "3.1.0" && supported == SNAPSHOT_VERSION
    );

    // file path rejects before decoding the body
    let path = env.dir.path().join("future.json");
    tokio::fs::write(&path, r#"{"version":"2.0.0","entities":[]}"#).await.unwrap();
    assert_matches!(
        env.snapshots.read_from_file(&path).await,
        Err(DurabilityError::IncompatibleVersion { .. })
    );

    assert_eq!(env.db.fetch_entity_rows().await.unwrap(), rows_before);
    assert_eq!(env.queue.peek_all().await.unwrap(), queue_before);
}

#[tokio::test]
async fn test_backups_survive_reopen() {
    let env = TestEnv::new().await;
    seed(&env).await;
    let record = env.snapshots.create_backup().await.unwrap();
    env.queue.clear_cache().await.unwrap();

    let env = env.reopen().await;
    let backups = env.snapshots.list_backups().await.unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].id, record.id);
    assert_eq!(backups[0].size_bytes, record.size_bytes);

    env.snapshots.restore_backup(&record.id).await.unwrap();
    assert_eq!(env.queue.len().await.unwrap(), 4);
    assert_eq!(
        env.store.get(EntityType::Feeding).await.unwrap(),
        Some(br#"[{"ml":120}]"#.to_vec())
    );
}
