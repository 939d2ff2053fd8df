//! Periodic driver for a [`FleetSimulator`].
//!
//! The simulator moves into a tokio task and is the only writer of fleet
//! state. Fleet commands are queued and applied between ticks, so a tick
//! always completes before anything else touches the fleet.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::fleet::{FleetCommand, FleetError, FleetSimulator, FleetSnapshot};

pub struct Ticker {
    commands: mpsc::UnboundedSender<FleetCommand>,
    feed: watch::Receiver<Arc<FleetSnapshot>>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<FleetSimulator>,
}

impl Ticker {
    /// Starts ticking every `interval`. The first tick fires one interval from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(simulator: FleetSimulator, interval: Duration) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let feed = simulator.subscribe();

        info!(?interval, "starting fleet ticker");
        let task = tokio::spawn(run(simulator, interval, command_rx, shutdown_rx));

        Self {
            commands,
            feed,
            shutdown,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.feed.clone()
    }

    /// Queues a fleet change for the next gap between ticks.
    pub fn send(&self, command: FleetCommand) -> Result<(), FleetError> {
        self.commands
            .send(command)
            .map_err(|_| FleetError::TickerStopped)
    }

    /// Stops ticking and hands the simulator back.
    pub async fn shutdown(self) -> Result<FleetSimulator, FleetError> {
        // the task may already be gone, the join below reports that
        let _ = self.shutdown.send(());
        self.task.await.map_err(|_| FleetError::TickerStopped)
    }
}

async fn run(
    mut simulator: FleetSimulator,
    interval: Duration,
    mut commands: mpsc::UnboundedReceiver<FleetCommand>,
    mut shutdown: oneshot::Receiver<()>,
) -> FleetSimulator {
    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            // an explicit shutdown or a dropped ticker handle both end the loop
            _ = &mut shutdown => break,

            Some(command) = commands.recv() => {
                if let Err(error) = simulator.apply(command, Utc::now()) {
                    warn!(%error, "fleet command rejected");
                }
            }

            _ = ticks.tick() => {
                let report = simulator.tick(Utc::now());
                debug!(
                    version = report.version,
                    arrivals = report.arrivals.len(),
                    faults = report.faults.len(),
                    "tick"
                );
            }
        }
    }

    info!("fleet ticker stopped");
    simulator
}
