// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Periodic observation driver.
//!
//! The registry itself never polls; this task owns the tick loop, calls
//! `observe_all` on the wall clock, and forwards snapshot batches to the
//! presentation boundary. Cancellation belongs to the driver, not the core.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use stream_registry::{StreamRegistry, StreamSnapshot};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;

pub struct ObserverDriver;

impl ObserverDriver {
    /// Spawns the tick loop. The returned receiver yields one batch per tick
    /// (skipping ticks while the registry is empty); dropping it stops the
    /// driver on its next send.
    pub fn spawn(
        registry: Arc<StreamRegistry>,
        config: ServiceConfig,
    ) -> (DriverHandle, mpsc::Receiver<Vec<StreamSnapshot>>) {
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let cancel = CancellationToken::new();
        let join = tokio::spawn(run(registry, config, tx, cancel.clone()));
        (DriverHandle { cancel, join }, rx)
    }
}

async fn run(
    registry: Arc<StreamRegistry>,
    config: ServiceConfig,
    tx: mpsc::Sender<Vec<StreamSnapshot>>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("observer driver started (interval {:?})", config.poll_interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            _ = ticker.tick() => {
                let snapshots = registry.observe_all(Utc::now());
                if snapshots.is_empty() {
                    continue;
                }
                if tx.send(snapshots).await.is_err() {
                    warn!("snapshot receiver dropped; observer driver stopping");
                    break;
                }
            }
        }
    }
    info!("observer driver stopped");
}

pub struct DriverHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl DriverHandle {
    /// Signals the loop to stop without waiting for it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stops the loop and waits for the task to drain.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.join.await;
    }
}
