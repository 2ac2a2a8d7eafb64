//! Sync engine passes against deterministic transports

use assert_matches::assert_matches;
use chrono::Utc;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use uuid::Uuid;

use cradlesync::shared::{EntityType, SyncAction};
use cradlesync::sync::{
    NetworkStatus, ReachabilityHandle, SkipReason, SyncOutcome, SyncProgress, SyncStatus,
};

use crate::common::*;

async fn queued_ids(env: &TestEnv) -> Vec<Uuid> {
    env.queue.peek_all().await.unwrap().iter().map(|item| item.id).collect()
}

#[tokio::test]
async fn test_partial_success_keeps_failed_subset_in_order() {
    let env = TestEnv::new().await;
    let plan = [
        EntityType::Feeding,
        EntityType::Milestone,
        EntityType::Sleep,
        EntityType::Milestone,
        EntityType::GrowthMeasurement,
        EntityType::SelfCareEntry,
    ];
    let mut ids = Vec::new();
    for entity in plan {
        ids.push(env.queue.enqueue(entity, SyncAction::Create, b"x".to_vec()).await.unwrap());
    }

    let transport = Arc::new(ScriptedTransport::rejecting(&[
        EntityType::Milestone,
        EntityType::SelfCareEntry,
    ]));
    let engine = env.engine(transport.clone());
    let outcome = engine.attempt_sync().await.unwrap();

    assert_matches!(outcome, SyncOutcome::Failed { synced: 3, failed: 3, .. });
    assert_eq!(queued_ids(&env).await, vec![ids[1], ids[3], ids[5]]);
    assert_matches!(engine.status(), SyncStatus::Failed(reason) if reason.contains("milestone"));
    assert_eq!(engine.progress(), SyncProgress { succeeded: 3, total: 6 });

    // sent in FIFO order, one attempt each
    let attempted: Vec<Uuid> = transport.attempted().iter().map(|item| item.id).collect();
    assert_eq!(attempted, ids);
    assert!(env.db.get_last_sync_time().await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_success_clears_queue_and_records_time() {
    let env = TestEnv::new().await;
    for entity in [EntityType::Sleep, EntityType::MoodEntry, EntityType::Sleep] {
        env.queue.enqueue(entity, SyncAction::Update, b"y".to_vec()).await.unwrap();
    }

    let started = Utc::now();
    let engine = env.engine(Arc::new(ScriptedTransport::accepting()));
    let outcome = engine.attempt_sync().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Completed { synced: 3 });
    assert!(env.queue.is_empty().await.unwrap());
    assert_eq!(engine.status(), SyncStatus::Completed);
    let last_sync = env.db.get_last_sync_time().await.unwrap().expect("last sync recorded");
    assert!(last_sync >= started);

    let metrics = engine.metrics().await;
    assert_eq!(metrics.completed_passes, 1);
    assert_eq!(metrics.items_sent, 3);
}

#[tokio::test]
async fn test_second_attempt_during_pass_is_a_no_op() {
    let env = TestEnv::new().await;
    env.queue.enqueue(EntityType::Feeding, SyncAction::Create, b"1".to_vec()).await.unwrap();
    env.queue.enqueue(EntityType::Feeding, SyncAction::Update, b"2".to_vec()).await.unwrap();

    let transport = Arc::new(GatedTransport::default());
    let engine = Arc::new(env.engine(transport.clone()));

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.attempt_sync().await }
    });
    transport.started.notified().await;
    assert_eq!(engine.status(), SyncStatus::Syncing);

    let second = engine.attempt_sync().await.unwrap();
    assert_eq!(second, SyncOutcome::Skipped { reason: SkipReason::AlreadySyncing });

    // enqueued mid-pass: not part of this pass
    let late = env.queue.enqueue(EntityType::Sleep, SyncAction::Create, b"late".to_vec()).await.unwrap();

    transport.release.notify_one();
    let outcome = first.await.unwrap().unwrap();

    assert_eq!(outcome, SyncOutcome::Completed { synced: 2 });
    assert_eq!(transport.calls(), 2);
    assert_eq!(queued_ids(&env).await, vec![late]);
}

#[tokio::test]
async fn test_going_offline_mid_pass_stops_after_in_flight_item() {
    let env = TestEnv::new().await;
    let mut ids = Vec::new();
    for entity in [EntityType::Feeding, EntityType::Sleep, EntityType::Reminder] {
        ids.push(env.queue.enqueue(entity, SyncAction::Create, b"z".to_vec()).await.unwrap());
    }

    let (network, reachability) = ReachabilityHandle::channel(NetworkStatus::Online);
    let transport = Arc::new(DisconnectingTransport::new(0, network));
    let engine = env.engine_with(transport.clone(), reachability);

    let outcome = engine.attempt_sync().await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Failed { synced: 1, failed: 2, reason: "offline".to_string() }
    );
    assert_eq!(transport.calls(), 1);
    assert_eq!(queued_ids(&env).await, vec![ids[1], ids[2]]);
    assert_eq!(engine.status(), SyncStatus::Failed("offline".to_string()));
}

#[tokio::test]
async fn test_feeding_and_milestone_scenario() {
    let env = TestEnv::new().await;
    let (network, reachability) = ReachabilityHandle::channel(NetworkStatus::Offline);
    let transport = Arc::new(ScriptedTransport::rejecting(&[EntityType::Milestone]));
    let engine = env.engine_with(transport.clone(), reachability);

    env.queue.enqueue(EntityType::Feeding, SyncAction::Create, b"A".to_vec()).await.unwrap();
    let b = env.queue.enqueue(EntityType::Milestone, SyncAction::Create, b"B".to_vec()).await.unwrap();
    assert_eq!(env.queue.len().await.unwrap(), 2);
    assert_eq!(
        engine.attempt_sync().await.unwrap(),
        SyncOutcome::Skipped { reason: SkipReason::Offline }
    );

    network.send_replace(NetworkStatus::Online);
    engine.attempt_sync().await.unwrap();

    assert_eq!(queued_ids(&env).await, vec![b]);
    assert_matches!(engine.status(), SyncStatus::Failed(_));
    assert_eq!(env.store.get(EntityType::Feeding).await.unwrap(), Some(b"A".to_vec()));
    assert_eq!(env.store.get(EntityType::Milestone).await.unwrap(), Some(b"B".to_vec()));

    transport.set_rejected(&[]);
    assert_eq!(engine.attempt_sync().await.unwrap(), SyncOutcome::Completed { synced: 1 });
    assert!(env.queue.is_empty().await.unwrap());
    assert_eq!(engine.status(), SyncStatus::Completed);
}
