//! # Sync Transport
//!
//! Narrow seam between the sync engine and the remote: one call per item,
//! success or failure. [`HttpTransport`] posts items as JSON; tests use
//! deterministic fakes.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::shared::config::DurabilityConfig;
use crate::shared::error::{DurabilityError, Result};
use crate::shared::sync_item::SyncItem;

/// Path the HTTP transport posts items to
pub const SYNC_ITEMS_PATH: &str = "/api/sync/items";

/// Failure to transmit a single item; never fatal to a pass
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("remote rejected item with HTTP {status}")]
    Rejected { status: u16 },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Remote counterpart of the mutation queue
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn send(&self, item: &SyncItem) -> std::result::Result<(), TransportError>;
}

/// Posts each item as JSON to `{server_url}/api/sync/items`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(server_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DurabilityError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", server_url.trim_end_matches('/'), SYNC_ITEMS_PATH),
        })
    }

    pub fn from_config(config: &DurabilityConfig) -> Result<Self> {
        Self::new(&config.server_url)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn send(&self, item: &SyncItem) -> std::result::Result<(), TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(item)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
