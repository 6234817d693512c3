//! Scheduler module: periodic rounds and snapshot publication.

mod round;

pub use round::*;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};

use crate::probe::Prober;
use crate::target::{Snapshot, Target};

/// Drives rounds on a fixed interval and publishes each completed snapshot.
///
/// Readers hold the last published snapshot while the next round works on
/// its own copy; publication swaps the whole snapshot at once.
pub struct Monitor<P: Prober> {
    runner: Arc<RoundRunner<P>>,
    snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
    stop: Mutex<Option<broadcast::Sender<()>>>,
}

impl<P: Prober> Monitor<P> {
    /// Create a monitor whose initial snapshot holds `targets` unprobed.
    pub fn new(runner: RoundRunner<P>, targets: Vec<Target>) -> Self {
        let (tx, _) = watch::channel(Arc::new(Snapshot::initial(targets)));
        Self {
            runner: Arc::new(runner),
            snapshot_tx: Arc::new(tx),
            stop: Mutex::new(None),
        }
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Run a single round now and publish it.
    #[cfg(test)]
    pub async fn run_once(&self) -> Arc<Snapshot> {
        publish_round(&self.runner, &self.snapshot_tx).await
    }

    /// Start running rounds every `interval`, the first one immediately.
    ///
    /// Rounds never overlap: a round that outlasts the interval delays the
    /// next one and missed ticks are skipped.
    pub async fn start(&self, interval: Duration) {
        let mut stop = self.stop.lock().await;
        if stop.is_some() {
            return; // Already running
        }

        let (stop_tx, stop_rx) = broadcast::channel(1);
        *stop = Some(stop_tx);
        drop(stop);

        tracing::info!(
            "Starting monitor with {} targets every {:?}",
            self.latest().targets.len(),
            interval
        );

        tokio::spawn(run_monitor_loop(
            self.runner.clone(),
            self.snapshot_tx.clone(),
            interval,
            stop_rx,
        ));
    }

    /// Stop the periodic rounds. The last snapshot stays readable.
    pub async fn stop(&self) {
        if let Some(tx) = self.stop.lock().await.take() {
            let _ = tx.send(());
            tracing::info!("Monitor stopped");
        }
    }
}

async fn run_monitor_loop<P: Prober>(
    runner: Arc<RoundRunner<P>>,
    snapshot_tx: Arc<watch::Sender<Arc<Snapshot>>>,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                let snapshot = publish_round(&runner, &snapshot_tx).await;
                tracing::debug!("Round {} complete", snapshot.round);
            }
        }
    }
}

/// Run one round over the current snapshot and publish the result.
async fn publish_round<P: Prober>(
    runner: &RoundRunner<P>,
    snapshot_tx: &watch::Sender<Arc<Snapshot>>,
) -> Arc<Snapshot> {
    let previous = snapshot_tx.borrow().clone();
    let targets = runner.run_round(&previous.targets).await;

    let snapshot = Arc::new(Snapshot {
        round: previous.round + 1,
        completed_at: Utc::now(),
        targets,
    });
    snapshot_tx.send_replace(snapshot.clone());
    snapshot
}
