//! Day/night timer driver.
//!
//! The timer task only keeps time. Each tick is sent to the owner as
//! `Internal::Tick { generation }`; the owner toggles the `DayNightCycle`.
//! Stopping bumps the generation, so ticks already in flight from a stopped
//! timer are recognised as stale and dropped.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crazyzoo_zoo::Phase;

use crate::runtime::{Internal, cancelled};

/// Observable state of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleState {
    pub phase: Phase,
    pub day_count: u32,
    pub running: bool,
    pub interval: Duration,
}

struct Running {
    interval: watch::Sender<Duration>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub(crate) struct DayNightDriver {
    interval: Duration,
    generation: u64,
    running: Option<Running>,
    inbox: mpsc::UnboundedSender<Internal>,
}

impl DayNightDriver {
    pub(crate) fn new(interval: Duration, inbox: mpsc::UnboundedSender<Internal>) -> Self {
        Self {
            interval,
            generation: 0,
            running: None,
            inbox,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a tick with this generation comes from the live timer.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.running.is_some() && generation == self.generation
    }

    /// Start ticking. `false` if already running.
    pub(crate) fn start(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }

        self.generation += 1;
        let (interval_tx, interval_rx) = watch::channel(self.interval);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(tick_loop(
            self.generation,
            interval_rx,
            stop_rx,
            self.inbox.clone(),
        ));

        info!(generation = self.generation, interval = ?self.interval, "day/night timer started");
        self.running = Some(Running {
            interval: interval_tx,
            stop: stop_tx,
            task,
        });
        true
    }

    /// Stop ticking. `false` if already stopped.
    pub(crate) fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };
        self.generation += 1;
        let _ = running.stop.send(true);
        running.task.abort();
        info!("day/night timer stopped");
        true
    }

    /// New period, applied from the next scheduled tick onward.
    pub(crate) fn change_interval(&mut self, interval: Duration) {
        self.interval = interval;
        if let Some(running) = &self.running {
            let _ = running.interval.send(interval);
        }
    }
}

async fn tick_loop(
    generation: u64,
    interval: watch::Receiver<Duration>,
    mut stop: watch::Receiver<bool>,
    inbox: mpsc::UnboundedSender<Internal>,
) {
    let mut next = Instant::now() + *interval.borrow();
    loop {
        tokio::select! {
            _ = cancelled(&mut stop) => break,
            _ = sleep_until(next) => {
                debug!(generation, "day/night tick");
                if inbox.send(Internal::Tick { generation }).is_err() {
                    break;
                }
                // The tick that just fired was scheduled with the old period;
                // the period in effect now decides when the following one fires.
                next += *interval.borrow();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_carry_the_generation_and_stop_invalidates_it() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut driver = DayNightDriver::new(Duration::from_secs(5), tx);

        assert!(driver.start());
        assert!(!driver.start());

        let started = Instant::now();
        let Some(Internal::Tick { generation }) = rx.recv().await else {
            panic!("expected a tick");
        };
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert!(driver.is_current(generation));

        assert!(driver.stop());
        assert!(!driver.stop());
        assert!(!driver.is_current(generation));

        assert!(driver.start());
        assert!(!driver.is_current(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut driver = DayNightDriver::new(Duration::from_secs(1), tx);
        driver.start();
        driver.stop();

        let waited = tokio::time::timeout(Duration::from_secs(30), rx.recv()).await;
        assert!(waited.is_err());
    }
}
