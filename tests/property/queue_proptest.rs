//! Property-based tests for the mutation queue

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

use cradlesync::local_db::LocalDatabase;
use cradlesync::offline::{LocalStore, MutationQueue};
use cradlesync::shared::{Clock, EntityType, SyncAction, SystemClock};

fn entity_type() -> impl Strategy<Value = EntityType> {
    prop::sample::select(EntityType::ALL.to_vec())
}

fn action() -> impl Strategy<Value = SyncAction> {
    prop_oneof![
        Just(SyncAction::Create),
        Just(SyncAction::Update),
        Just(SyncAction::Delete),
    ]
}

fn mutation() -> impl Strategy<Value = (EntityType, SyncAction, Vec<u8>)> {
    (entity_type(), action(), prop::collection::vec(any::<u8>(), 0..32))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn services() -> (LocalStore, MutationQueue) {
    let db = Arc::new(LocalDatabase::open_in_memory().await.unwrap());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    (LocalStore::new(db.clone(), clock.clone()), MutationQueue::new(db, clock))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_queue_is_fifo_and_store_keeps_last_write(mutations in prop::collection::vec(mutation(), 1..24)) {
        let (queued, expected_ids, entries, expected_entries) = runtime().block_on(async {
            let (store, queue) = services().await;
            let mut ids = Vec::new();
            let mut expected = BTreeMap::new();

            for (entity, action, payload) in &mutations {
                ids.push(queue.enqueue(*entity, *action, payload.clone()).await.unwrap());
                if *action == SyncAction::Delete && payload.is_empty() {
                    expected.remove(entity);
                } else {
                    expected.insert(*entity, payload.clone());
                }
            }

            let queued: Vec<_> = queue.peek_all().await.unwrap().iter().map(|item| item.id).collect();
            (queued, ids, store.entries().await.unwrap(), expected)
        });

        prop_assert_eq!(queued, expected_ids);
        prop_assert_eq!(entries, expected_entries);
    }

    #[test]
    fn test_remove_succeeded_keeps_complement_in_order(
        mutations in prop::collection::vec(mutation(), 1..24),
        keep_mask in prop::collection::vec(any::<bool>(), 24),
    ) {
        let (remaining, expected) = runtime().block_on(async {
            let (_store, queue) = services().await;
            let mut succeeded = Vec::new();
            let mut failed = Vec::new();

            for (index, (entity, action, payload)) in mutations.iter().enumerate() {
                let id = queue.enqueue(*entity, *action, payload.clone()).await.unwrap();
                if keep_mask[index] {
                    failed.push(id);
                } else {
                    succeeded.push(id);
                }
            }

            queue.remove_succeeded(&succeeded).await.unwrap();
            let remaining: Vec<_> = queue.peek_all().await.unwrap().iter().map(|item| item.id).collect();
            (remaining, failed)
        });

        prop_assert_eq!(remaining, expected);
    }
}
