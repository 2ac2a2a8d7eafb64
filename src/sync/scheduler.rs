//! # Sync Scheduler
//!
//! Turns discrete events into sync attempts. The engine never polls on its own;
//! the scheduler calls [`SyncEngine::attempt_sync`] when:
//!
//! - **Reconnected**: the debounced reachability state goes offline to online
//! - **Periodic**: the optional interval elapses
//! - **Manual / Foreground**: the host asks through [`SyncScheduler::trigger`]
//!
//! Every attempt runs on its own task, so a trigger arriving mid-pass reaches the
//! engine and is skipped there instead of waiting in line behind the pass.
//! [`SyncScheduler::shutdown`] stops the loop and then waits for those tasks, so a
//! pass whose items the remote already accepted still records them locally.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::network_monitor::{NetworkStatus, ReachabilityHandle};
use super::SyncEngine;

/// Pending triggers beyond this are dropped; an attempt is already on its way
const TRIGGER_BUFFER: usize = 16;

/// Why an attempt was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Reconnected,
    Periodic,
    Manual,
    Foreground,
}

/// Background task feeding triggers into a [`SyncEngine`]
#[derive(Debug)]
pub struct SyncScheduler {
    triggers: mpsc::Sender<SyncTrigger>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Spawn the scheduler loop; `periodic = None` disables the timer
    pub fn start(
        engine: Arc<SyncEngine>,
        reachability: ReachabilityHandle,
        periodic: Option<Duration>,
    ) -> Self {
        let (triggers, receiver) = mpsc::channel(TRIGGER_BUFFER);
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(run(engine, reachability, periodic, receiver, stopped));
        tracing::info!(periodic = ?periodic, "sync scheduler started");

        Self {
            triggers,
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Ask for an attempt; returns false when the scheduler is gone or saturated
    pub fn trigger(&self, trigger: SyncTrigger) -> bool {
        match self.triggers.try_send(trigger) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(?trigger, error = %e, "sync trigger dropped");
                false
            }
        }
    }

    /// Stop reacting to triggers and wait for attempts already started
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "sync scheduler task failed");
            }
        }
        tracing::info!("sync scheduler stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    engine: Arc<SyncEngine>,
    reachability: ReachabilityHandle,
    periodic: Option<Duration>,
    mut receiver: mpsc::Receiver<SyncTrigger>,
    mut stopped: oneshot::Receiver<()>,
) {
    let mut attempts: JoinSet<()> = JoinSet::new();
    let mut status = reachability.subscribe();
    let mut last: NetworkStatus = *status.borrow_and_update();
    let mut reachability_open = true;

    let mut ticker = periodic.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let trigger = tokio::select! {
            _ = &mut stopped => break,
            Some(joined) = attempts.join_next(), if !attempts.is_empty() => {
                report_join(joined);
                continue;
            }
            changed = status.changed(), if reachability_open => {
                if changed.is_err() {
                    reachability_open = false;
                    continue;
                }
                let current = *status.borrow_and_update();
                let reconnected = !last.is_online() && current.is_online();
                last = current;
                if !reconnected {
                    continue;
                }
                SyncTrigger::Reconnected
            }
            _ = tick(&mut ticker) => SyncTrigger::Periodic,
            received = receiver.recv() => match received {
                Some(trigger) => trigger,
                None => break,
            },
        };

        tracing::debug!(?trigger, "starting sync attempt");
        let engine = Arc::clone(&engine);
        attempts.spawn(async move {
            match engine.attempt_sync().await {
                Ok(outcome) => tracing::debug!(?trigger, ?outcome, "sync attempt finished"),
                Err(e) => tracing::error!(?trigger, error = %e, "sync attempt hit a storage error"),
            }
        });
    }

    if !attempts.is_empty() {
        tracing::debug!(in_flight = attempts.len(), "waiting for sync attempts to finish");
    }
    while let Some(joined) = attempts.join_next().await {
        report_join(joined);
    }
}

fn report_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "sync attempt task failed");
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
