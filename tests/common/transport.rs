//! Deterministic sync transports

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{watch, Notify};

use cradlesync::shared::{EntityType, SyncItem};
use cradlesync::sync::{NetworkStatus, SyncTransport, TransportError};

/// Accepts everything except the entity types it was told to reject
#[derive(Default)]
pub struct ScriptedTransport {
    rejected: Mutex<HashSet<EntityType>>,
    attempted: Mutex<Vec<SyncItem>>,
}

impl ScriptedTransport {
    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn rejecting(types: &[EntityType]) -> Self {
        let transport = Self::default();
        transport.set_rejected(types);
        transport
    }

    pub fn set_rejected(&self, types: &[EntityType]) {
        *self.rejected.lock().unwrap() = types.iter().copied().collect();
    }

    /// Every item handed to `send`, in call order
    pub fn attempted(&self) -> Vec<SyncItem> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn send(&self, item: &SyncItem) -> Result<(), TransportError> {
        self.attempted.lock().unwrap().push(item.clone());
        if self.rejected.lock().unwrap().contains(&item.entity_type) {
            Err(TransportError::Rejected { status: 422 })
        } else {
            Ok(())
        }
    }
}

/// Holds the first item in flight until released
#[derive(Default)]
pub struct GatedTransport {
    pub started: Notify,
    pub release: Notify,
    calls: AtomicUsize,
}

impl GatedTransport {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTransport for GatedTransport {
    async fn send(&self, _item: &SyncItem) -> Result<(), TransportError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.started.notify_one();
            self.release.notified().await;
        }
        Ok(())
    }
}

/// Drops connectivity while sending the item at `index`
pub struct DisconnectingTransport {
    index: usize,
    network: watch::Sender<NetworkStatus>,
    calls: AtomicUsize,
}

impl DisconnectingTransport {
    pub fn new(index: usize, network: watch::Sender<NetworkStatus>) -> Self {
        Self {
            index,
            network,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTransport for DisconnectingTransport {
    async fn send(&self, _item: &SyncItem) -> Result<(), TransportError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.index {
            self.network.send_replace(NetworkStatus::Offline);
        }
        Ok(())
    }
}
