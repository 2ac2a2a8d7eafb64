//! # Network Monitor
//!
//! Turns raw connectivity signals into settled online/offline transitions.
//!
//! ## Features
//!
//! - **Debounce**: a change is only published after the raw signal has been
//!   quiet for the configured period, so online/offline/online flapping inside
//!   the window never reaches subscribers
//! - **Subscriptions**: a `watch` receiver for the current state and a stream
//!   of transitions
//! - **TCP probe**: optional poller for hosts without a platform network-path API
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cradlesync::sync::network_monitor::{NetworkStatus, ReachabilityMonitor};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let monitor = ReachabilityMonitor::new(NetworkStatus::Offline, Duration::from_millis(1500));
//! let reporter = monitor.reporter();
//!
//! // Called from the platform connectivity callback
//! reporter.report(NetworkStatus::Online);
//! # }
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;

use crate::shared::error::{DurabilityError, Result};

/// Network connectivity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

impl From<bool> for NetworkStatus {
    fn from(online: bool) -> Self {
        if online {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    }
}

/// Feeds raw connectivity signals into a monitor
#[derive(Debug, Clone)]
pub struct ReachabilityReporter {
    raw: Arc<watch::Sender<NetworkStatus>>,
}

impl ReachabilityReporter {
    /// Record the latest raw observation
    pub fn report(&self, status: NetworkStatus) {
        let previous = self.raw.send_replace(status);
        if previous != status {
            tracing::trace!(?status, "raw connectivity change");
        }
    }
}

/// Read side of the settled connectivity state
#[derive(Debug, Clone)]
pub struct ReachabilityHandle {
    settled: watch::Receiver<NetworkStatus>,
}

impl ReachabilityHandle {
    /// Handle driven directly by the returned sender, with no debounce
    pub fn channel(initial: NetworkStatus) -> (watch::Sender<NetworkStatus>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self { settled: rx })
    }

    /// Handle that always reports online
    pub fn always_online() -> Self {
        Self::channel(NetworkStatus::Online).1
    }

    /// Current settled state
    pub fn status(&self) -> NetworkStatus {
        *self.settled.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    /// Receiver notified on every settled transition
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        let mut rx = self.settled.clone();
        rx.borrow_and_update();
        rx
    }

    /// Stream of settled transitions, excluding the current state
    pub fn transitions(&self) -> WatchStream<NetworkStatus> {
        WatchStream::from_changes(self.settled.clone())
    }
}

/// Debounced reachability monitor
#[derive(Debug)]
pub struct ReachabilityMonitor {
    raw: Arc<watch::Sender<NetworkStatus>>,
    handle: ReachabilityHandle,
    task: JoinHandle<()>,
}

impl ReachabilityMonitor {
    /// Start a monitor; must be called inside a Tokio runtime
    pub fn new(initial: NetworkStatus, quiet_period: Duration) -> Self {
        let (raw_tx, raw_rx) = watch::channel(initial);
        let (settled_tx, settled_rx) = watch::channel(initial);

        let task = tokio::spawn(debounce_loop(raw_rx, settled_tx, quiet_period));

        Self {
            raw: Arc::new(raw_tx),
            handle: ReachabilityHandle { settled: settled_rx },
            task,
        }
    }

    pub fn reporter(&self) -> ReachabilityReporter {
        ReachabilityReporter {
            raw: Arc::clone(&self.raw),
        }
    }

    pub fn handle(&self) -> ReachabilityHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> NetworkStatus {
        self.handle.status()
    }

    pub fn is_online(&self) -> bool {
        self.handle.is_online()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.handle.subscribe()
    }

    pub fn transitions(&self) -> WatchStream<NetworkStatus> {
        self.handle.transitions()
    }
}

impl Drop for ReachabilityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop(
    mut raw: watch::Receiver<NetworkStatus>,
    settled: watch::Sender<NetworkStatus>,
    quiet_period: Duration,
) {
    loop {
        if raw.changed().await.is_err() {
            break;
        }

        // Restart the quiet period on every further change
        loop {
            match tokio::time::timeout(quiet_period, raw.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) | Err(_) => break,
            }
        }

        let candidate = *raw.borrow_and_update();
        settled.send_if_modified(|current| {
            if *current == candidate {
                tracing::debug!(status = ?candidate, "connectivity flap settled on previous state");
                false
            } else {
                tracing::info!(from = ?*current, to = ?candidate, "connectivity changed");
                *current = candidate;
                true
            }
        });
    }
}

/// Derives raw connectivity from TCP connects to the sync host
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    connect_timeout: Duration,
    interval: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, connect_timeout: Duration, interval: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            interval,
        }
    }

    /// Probe the host and port of an http(s) URL
    pub fn for_url(url: &str, connect_timeout: Duration, interval: Duration) -> Result<Self> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| DurabilityError::Config { message: format!("invalid URL '{}': {}", url, e) })?;
        let host = parsed.host_str().ok_or_else(|| DurabilityError::Config {
            message: format!("URL '{}' has no host", url),
        })?;
        let port = parsed.port_or_known_default().unwrap_or(80);
        Ok(Self::new(format!("{}:{}", host, port), connect_timeout, interval))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Single connect attempt
    pub async fn probe_once(&self) -> NetworkStatus {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => NetworkStatus::Online,
            Ok(Err(e)) => {
                tracing::debug!(address = %self.address, error = %e, "probe connect failed");
                NetworkStatus::Offline
            }
            Err(_) => {
                tracing::debug!(address = %self.address, "probe connect timed out");
                NetworkStatus::Offline
            }
        }
    }

    /// Probe forever, reporting every observation
    pub fn spawn(self, reporter: ReachabilityReporter) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                reporter.report(self.probe_once().await);
            }
        })
    }
}
