//! Sync passes over HTTP against a mock endpoint

use pretty_assertions::assert_eq;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cradlesync::shared::{EntityType, SyncAction};
use cradlesync::sync::transport::SYNC_ITEMS_PATH;
use cradlesync::sync::{HttpTransport, SyncOutcome};

use crate::common::*;

#[tokio::test]
async fn test_rejected_type_stays_queued() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SYNC_ITEMS_PATH))
        .and(body_partial_json(serde_json::json!({ "entityType": "milestone" })))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SYNC_ITEMS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let env = TestEnv::new().await;
    env.queue.enqueue(EntityType::Feeding, SyncAction::Create, b"A".to_vec()).await.unwrap();
    let b = env.queue.enqueue(EntityType::Milestone, SyncAction::Create, b"B".to_vec()).await.unwrap();
    env.queue.enqueue(EntityType::Sleep, SyncAction::Create, b"C".to_vec()).await.unwrap();

    let transport = Arc::new(HttpTransport::new(&server.uri()).unwrap());
    let outcome = env.engine(transport).attempt_sync().await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Failed {
            synced: 2,
            failed: 1,
            reason: "1 of 3 items failed (milestone)".to_string(),
        }
    );
    let remaining: Vec<_> = env.queue.peek_all().await.unwrap().iter().map(|item| item.id).collect();
    assert_eq!(remaining, vec![b]);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_unreachable_server_fails_every_item() {
    let env = TestEnv::new().await;
    env.queue.enqueue(EntityType::Feeding, SyncAction::Create, b"A".to_vec()).await.unwrap();
    env.queue.enqueue(EntityType::Feeding, SyncAction::Update, b"B".to_vec()).await.unwrap();

    let transport = Arc::new(HttpTransport::new("http://127.0.0.1:1").unwrap());
    let outcome = env.engine(transport).attempt_sync().await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Failed {
            synced: 0,
            failed: 2,
            reason: "2 of 2 items failed (feeding)".to_string(),
        }
    );
    assert_eq!(env.queue.len().await.unwrap(), 2);
}
