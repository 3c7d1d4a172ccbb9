//! Interval daemon that runs wake cycles until cancelled.
//!
//! A wake runs immediately on start, then once per interval. The interval
//! stretches while health is low; it never influences what a wake decides.

use crate::agent::WakeCycle;
use crate::error::CycleError;
use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Background wake daemon.
pub struct WakeDaemon {
    cycle: WakeCycle,
    base_interval: Duration,
    last_health: u8,
    wakes: u64,
}

impl WakeDaemon {
    pub fn new(cycle: WakeCycle, base_interval: Duration) -> Self {
        Self {
            cycle,
            base_interval,
            last_health: 100,
            wakes: 0,
        }
    }

    /// Completed wakes since the daemon started.
    pub fn wakes(&self) -> u64 {
        self.wakes
    }

    /// Run the wake loop. Exits cooperatively when `cancel` is triggered,
    /// never in the middle of a wake.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!(
            "Wake daemon started (base interval {}s)",
            self.base_interval.as_secs()
        );

        loop {
            // A started wake always runs to its flush; cancellation is only
            // observed between wakes.
            self.tick().await;
            if cancel.is_cancelled() {
                info!("Wake daemon shutting down after {} wakes", self.wakes);
                return Ok(());
            }

            let interval = adaptive_interval(self.base_interval, self.last_health);
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => {
                    info!("Wake daemon shutting down after {} wakes", self.wakes);
                    return Ok(());
                }
            }
        }
    }

    async fn tick(&mut self) {
        match self.cycle.run_once().await {
            Ok(report) => {
                self.wakes += 1;
                self.last_health = report.health_score;
            }
            Err(CycleError::WakeInProgress(path)) => {
                warn!("Skipping wake: lock held at {:?}", path);
            }
            Err(e) => error!("Wake aborted, state left untouched: {e}"),
        }
    }
}

/// Base interval scaled by health: x1.5 below 70, x2 below 30.
pub fn adaptive_interval(base: Duration, health: u8) -> Duration {
    if health < 30 {
        base * 2
    } else if health < 70 {
        base.mul_f64(1.5)
    } else {
        base
    }
}
