//! # Sync Metrics
//!
//! Counters describing sync passes, for diagnostics screens and logs.

use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncMetrics {
    pub total_passes: u64,
    pub completed_passes: u64,
    pub failed_passes: u64,
    pub items_sent: u64,
    pub items_failed: u64,
    pub average_pass_duration: Duration,
    pub last_pass_duration: Option<Duration>,
    #[serde(skip)]
    pass_start: Option<Instant>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass_start(&mut self) {
        self.pass_start = Some(Instant::now());
        self.total_passes += 1;
    }

    pub fn record_pass_end(&mut self, sent: usize, failed: usize) {
        self.items_sent += sent as u64;
        self.items_failed += failed as u64;
        if failed == 0 {
            self.completed_passes += 1;
        } else {
            self.failed_passes += 1;
        }

        if let Some(start) = self.pass_start.take() {
            let duration = start.elapsed();
            self.last_pass_duration = Some(duration);

            // Rolling average over finished passes
            let finished = (self.completed_passes + self.failed_passes) as u32;
            let total = self.average_pass_duration * (finished - 1) + duration;
            self.average_pass_duration = total / finished;
        }
    }

    /// Share of finished passes that completed
    pub fn success_rate(&self) -> f64 {
        let finished = self.completed_passes + self.failed_passes;
        if finished == 0 {
            0.0
        } else {
            self.completed_passes as f64 / finished as f64
        }
    }
}
