//! Elapsed-time ticker

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Periodic tick source driving the elapsed counter.
///
/// At most one tick task runs at a time. Every `start` opens a new epoch;
/// callbacks receive the epoch they were started with so a tick racing a
/// `stop` can be recognised as stale via [`ElapsedTicker::is_current`].
/// The ticker never touches the counter itself.
#[derive(Debug)]
pub struct ElapsedTicker {
    period: Duration,
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl ElapsedTicker {
    /// Create a stopped ticker with the given period
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            epoch: 0,
            task: None,
        }
    }

    /// Start ticking, cancelling any running tick source first.
    ///
    /// `on_tick` is called once per period with the epoch of this start.
    /// Returning `false` ends the tick task. Must be called within a tokio
    /// runtime.
    pub fn start<F>(&mut self, mut on_tick: F) -> u64
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        self.stop();
        self.epoch = self.epoch.wrapping_add(1);
        let epoch = self.epoch;
        let period = self.period;

        self.task = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if !on_tick(epoch) {
                    break;
                }
            }
        }));
        epoch
    }

    /// Cancel the tick source. Safe to call when not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether a tick source is active
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Whether `epoch` belongs to the active tick source
    pub fn is_current(&self, epoch: u64) -> bool {
        self.is_running() && self.epoch == epoch
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
