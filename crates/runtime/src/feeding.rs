//! Feeding coordinator.
//!
//! Every `FoodDropped` becomes a `FeedingRun` carrying the roster snapshot taken
//! when the event fired. Runs go to one worker task per enclosure, so feeding in
//! different enclosures proceeds independently while runs for the same
//! enclosure are queued and never interleave.
//!
//! A worker walks its roster in arrival order: food reaction, eating delay,
//! "finished" line, next animal; then one "all fed" line. Lines are sent to the
//! owner as `Internal::Narrate`. Cancelling a worker abandons the current delay;
//! lines already sent stay, nothing partial is produced.

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crazyzoo_zoo::Animal;

use crate::narration::{all_fed, finished_eating, food_reaction};
use crate::runtime::{Internal, cancelled};

#[derive(Debug, Clone)]
pub(crate) struct FeedingRun {
    pub(crate) id: Uuid,
    pub(crate) enclosure: String,
    pub(crate) food: String,
    pub(crate) roster: Vec<Animal>,
}

impl FeedingRun {
    pub(crate) fn new(enclosure: String, food: String, roster: Vec<Animal>) -> Self {
        Self {
            id: Uuid::now_v7(),
            enclosure,
            food,
            roster,
        }
    }
}

struct Worker {
    runs: mpsc::UnboundedSender<FeedingRun>,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

pub(crate) struct FeedingCoordinator {
    workers: HashMap<String, Worker>,
    inbox: mpsc::UnboundedSender<Internal>,
}

impl FeedingCoordinator {
    pub(crate) fn new(inbox: mpsc::UnboundedSender<Internal>) -> Self {
        Self {
            workers: HashMap::new(),
            inbox,
        }
    }

    /// Queue a run behind any run already in progress for the same enclosure.
    pub(crate) fn schedule(&mut self, run: FeedingRun) {
        debug!(run_id = %run.id, enclosure = %run.enclosure, animals = run.roster.len(), "feeding queued");

        let run = match self.workers.get(&run.enclosure) {
            Some(worker) => match worker.runs.send(run) {
                Ok(()) => return,
                Err(mpsc::error::SendError(run)) => run,
            },
            None => run,
        };

        let worker = self.spawn_worker(&run.enclosure);
        let enclosure = run.enclosure.clone();
        if worker.runs.send(run).is_ok() {
            self.workers.insert(enclosure, worker);
        }
    }

    fn spawn_worker(&self, enclosure: &str) -> Worker {
        let (runs_tx, runs_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(
            work(runs_rx, cancel_rx, self.inbox.clone())
                .instrument(info_span!("feeding_worker", enclosure = %enclosure)),
        );
        Worker {
            runs: runs_tx,
            cancel: cancel_tx,
            task,
        }
    }

    /// Abandon current and queued runs for one enclosure.
    pub(crate) fn cancel(&mut self, enclosure: &str) {
        if let Some(worker) = self.workers.remove(enclosure) {
            let _ = worker.cancel.send(true);
        }
    }

    /// Abandon everything and wait for the workers to finish.
    pub(crate) async fn shutdown(&mut self) {
        let workers: Vec<Worker> = self.workers.drain().map(|(_, worker)| worker).collect();
        for worker in &workers {
            let _ = worker.cancel.send(true);
        }
        for worker in workers {
            drop(worker.runs);
            let _ = worker.task.await;
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, worker) in self.workers.drain() {
            let _ = worker.cancel.send(true);
        }
    }
}

async fn work(
    mut runs: mpsc::UnboundedReceiver<FeedingRun>,
    mut cancel: watch::Receiver<bool>,
    inbox: mpsc::UnboundedSender<Internal>,
) {
    loop {
        let run = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => return,
            run = runs.recv() => match run {
                Some(run) => run,
                None => return,
            },
        };

        let span = info_span!("feeding", run_id = %run.id, food = %run.food);
        let completed = feed(&run, &mut cancel, &inbox).instrument(span).await;
        if !completed {
            return;
        }
    }
}

/// Drive one run. `false` when cancelled or the owner is gone.
async fn feed(
    run: &FeedingRun,
    cancel: &mut watch::Receiver<bool>,
    inbox: &mpsc::UnboundedSender<Internal>,
) -> bool {
    let narrate = |line: String| inbox.send(Internal::Narrate(line)).is_ok();

    for animal in &run.roster {
        if *cancel.borrow() || !narrate(food_reaction(animal, &run.food)) {
            return false;
        }

        tokio::select! {
            biased;
            _ = cancelled(cancel) => {
                info!(animal = %animal.name(), "feeding cancelled mid-meal");
                return false;
            }
            _ = tokio::time::sleep(animal.eating_duration()) => {}
        }

        if !narrate(finished_eating(animal)) {
            return false;
        }
    }

    info!(enclosure = %run.enclosure, animals = run.roster.len(), "feeding finished");
    narrate(all_fed(&run.enclosure))
}
