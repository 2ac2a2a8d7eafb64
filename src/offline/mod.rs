//! # Offline Storage
//!
//! The local-first half of the durability layer:
//!
//! - `store.rs`: [`LocalStore`], the latest value set per entity type
//! - `queue.rs`: [`MutationQueue`], pending changes awaiting sync
//!
//! Both share one [`LocalDatabase`](crate::local_db::LocalDatabase) and its write
//! lock, which is what keeps an enqueue's local apply and queue append atomic
//! with respect to every other writer.

pub mod queue;
pub mod store;

pub use queue::{MutationQueue, QueueStats};
pub use store::LocalStore;
