//! The owner task and its handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crazyzoo_core::{AnimalId, DomainError};
use crazyzoo_events::{EventBus, EventHandler, InMemoryEventBus, Subscription};
use crazyzoo_infra::{AnimalRepository, LogSink, LogSinkError, StoreError, load_zoo, save_zoo};
use crazyzoo_zoo::{Animal, DayNightCycle, Enclosure, Zoo, ZooEvent, ZooStatistics};

use crate::day_night::{CycleState, DayNightDriver};
use crate::feeding::{FeedingCoordinator, FeedingRun};
use crate::narration::{EventContext, Narration, ZooRegistry, register_builtin};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Log(#[from] LogSinkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("zoo runtime has shut down")]
    Closed,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub night_interval: Duration,
    /// Fixed seed for erratic actions and night events; entropy when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            night_interval: Duration::from_secs(10),
            rng_seed: None,
        }
    }
}

impl RuntimeConfig {
    pub fn with_night_interval(mut self, interval: Duration) -> Self {
        self.night_interval = interval;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

/// Messages from feeding workers and the timer to the owner.
#[derive(Debug)]
pub(crate) enum Internal {
    Narrate(String),
    Tick { generation: u64 },
}

type Job = Box<dyn FnOnce(&mut Owner) + Send>;

enum Command {
    Call(Job),
    Shutdown(oneshot::Sender<()>),
}

/// Resolves once `rx` reads `true` or its sender is gone.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop || rx.changed().await.is_err() {
            return;
        }
    }
}

pub struct ZooRuntime;

impl ZooRuntime {
    /// Spawn the owner task on the current tokio runtime with an empty zoo.
    pub fn spawn(sink: Box<dyn LogSink>, config: RuntimeConfig) -> ZooHandle {
        Self::spawn_with_zoo(Zoo::new(), sink, config)
    }

    pub fn spawn_with_zoo(zoo: Zoo, sink: Box<dyn LogSink>, config: RuntimeConfig) -> ZooHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let narrations = Arc::new(InMemoryEventBus::new());

        let mut registry = ZooRegistry::new();
        register_builtin(&mut registry);

        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let owner = Owner {
            zoo,
            cycle: DayNightCycle::new(),
            driver: DayNightDriver::new(config.night_interval, inbox_tx.clone()),
            feeding: FeedingCoordinator::new(inbox_tx),
            sink,
            registry,
            narrations: Arc::clone(&narrations),
            rng,
        };
        tokio::spawn(owner.run(commands_rx, inbox_rx));

        ZooHandle {
            commands: commands_tx,
            narrations,
        }
    }
}

/// Cloneable access to a running zoo.
///
/// Every call is executed by the owner task, one at a time, in the order the
/// owner receives them.
#[derive(Clone)]
pub struct ZooHandle {
    commands: mpsc::Sender<Command>,
    narrations: Arc<InMemoryEventBus<Narration>>,
}

impl std::fmt::Debug for ZooHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZooHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

impl ZooHandle {
    async fn call<T, F>(&self, f: F) -> RuntimeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Owner) -> RuntimeResult<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |owner| {
            let _ = reply_tx.send(f(owner));
        });
        self.commands
            .send(Command::Call(job))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        reply_rx.await.map_err(|_| RuntimeError::Closed)?
    }

    /// Live feed of every narrated line from now on.
    pub fn narrations(&self) -> Subscription<Narration> {
        self.narrations.subscribe()
    }

    /// Log an arbitrary line.
    pub async fn narrate(&self, line: impl Into<String>) -> RuntimeResult<()> {
        let line = line.into();
        self.call(move |owner| {
            owner.narrate(line);
            Ok(())
        })
        .await
    }

    /// Attach a subscriber for one event type. Delivery order is registration
    /// order, after the built-in narrators.
    pub async fn subscribe<H>(&self, event_type: &'static str, handler: H) -> RuntimeResult<usize>
    where
        H: EventHandler<ZooEvent, EventContext> + 'static,
    {
        self.call(move |owner| Ok(owner.registry.subscribe(event_type, handler)))
            .await
    }

    pub async fn add_enclosure(&self, name: impl Into<String>, capacity: usize) -> RuntimeResult<()> {
        let name = name.into();
        self.call(move |owner| owner.add_enclosure(name, capacity)).await
    }

    pub async fn remove_enclosure(&self, name: impl Into<String>) -> RuntimeResult<()> {
        let name = name.into();
        self.call(move |owner| owner.remove_enclosure(&name)).await
    }

    /// Add an animal to the catalog, unhoused.
    pub async fn register_animal(&self, animal: Animal) -> RuntimeResult<AnimalId> {
        self.call(move |owner| owner.register_animal(animal)).await
    }

    /// Delete an animal, taking it out of its enclosure first.
    pub async fn retire_animal(&self, id: AnimalId) -> RuntimeResult<Animal> {
        self.call(move |owner| owner.retire_animal(id)).await
    }

    /// Put an unhoused animal into an enclosure. `false` when the enclosure is full.
    pub async fn admit(&self, id: AnimalId, enclosure: impl Into<String>) -> RuntimeResult<bool> {
        let enclosure = enclosure.into();
        self.call(move |owner| owner.admit(id, &enclosure)).await
    }

    /// Take an animal out of an enclosure. `false` when it was not a member.
    pub async fn remove_from_enclosure(&self, enclosure: impl Into<String>, id: AnimalId) -> RuntimeResult<bool> {
        let enclosure = enclosure.into();
        self.call(move |owner| owner.remove_from_enclosure(&enclosure, id))
            .await
    }

    /// Drop food into an enclosure and start (or queue) its feeding sequence.
    pub async fn drop_food(&self, enclosure: impl Into<String>, food: impl Into<String>) -> RuntimeResult<()> {
        let (enclosure, food) = (enclosure.into(), food.into());
        self.call(move |owner| owner.drop_food(&enclosure, &food)).await
    }

    pub async fn make_sound(&self, id: AnimalId) -> RuntimeResult<String> {
        self.call(move |owner| owner.make_sound(id)).await
    }

    /// Hand-feed one animal; returns its reaction.
    pub async fn feed(&self, id: AnimalId, food: impl Into<String>) -> RuntimeResult<String> {
        let food = food.into();
        self.call(move |owner| owner.feed(id, &food)).await
    }

    /// `None` when the animal has no erratic action.
    pub async fn act_erratically(&self, id: AnimalId) -> RuntimeResult<Option<String>> {
        self.call(move |owner| owner.act_erratically(id)).await
    }

    /// New flying state, `None` when the animal cannot fly.
    pub async fn toggle_flight(&self, id: AnimalId) -> RuntimeResult<Option<bool>> {
        self.call(move |owner| owner.toggle_flight(id)).await
    }

    pub async fn describe(&self, id: AnimalId) -> RuntimeResult<String> {
        self.call(move |owner| owner.describe(id)).await
    }

    pub async fn statistics(&self) -> RuntimeResult<ZooStatistics> {
        self.call(|owner| owner.statistics()).await
    }

    /// Copy of the whole catalog.
    pub async fn snapshot(&self) -> RuntimeResult<Zoo> {
        self.call(|owner| Ok(owner.zoo.clone())).await
    }

    /// Replace the catalog. Pending feeding runs are abandoned; no `Joined`
    /// events fire for the restored animals.
    pub async fn restore(&self, zoo: Zoo) -> RuntimeResult<()> {
        self.call(move |owner| {
            owner.restore(zoo);
            Ok(())
        })
        .await
    }

    /// Write the current catalog to the store.
    pub async fn save_to<R>(&self, repo: &R) -> RuntimeResult<()>
    where
        R: AnimalRepository + ?Sized,
    {
        let zoo = self.snapshot().await?;
        save_zoo(repo, &zoo).await?;
        self.narrate("💾 Data saved to database").await
    }

    /// Replace the catalog with the store's content.
    pub async fn load_from<R>(&self, repo: &R) -> RuntimeResult<()>
    where
        R: AnimalRepository + ?Sized,
    {
        let zoo = load_zoo(repo).await?;
        self.restore(zoo).await
    }

    /// Start the day/night timer. `false` if it was already running.
    pub async fn start_cycle(&self) -> RuntimeResult<bool> {
        self.call(|owner| Ok(owner.start_cycle())).await
    }

    /// Stop the day/night timer. `false` if it was already stopped.
    pub async fn stop_cycle(&self) -> RuntimeResult<bool> {
        self.call(|owner| Ok(owner.stop_cycle())).await
    }

    /// Change the tick period; the tick already scheduled keeps its time.
    pub async fn change_interval(&self, interval: Duration) -> RuntimeResult<()> {
        self.call(move |owner| owner.change_interval(interval)).await
    }

    pub async fn cycle_state(&self) -> RuntimeResult<CycleState> {
        self.call(|owner| Ok(owner.cycle_state())).await
    }

    /// Rendered log lines.
    pub async fn logs(&self) -> RuntimeResult<Vec<String>> {
        self.call(|owner| Ok(owner.sink.logs())).await
    }

    pub async fn clear_logs(&self) -> RuntimeResult<()> {
        self.call(|owner| {
            owner.sink.clear();
            owner.narrate("🗑️ Log cleared".to_string());
            Ok(())
        })
        .await
    }

    pub async fn save_logs(&self, path: impl Into<PathBuf>) -> RuntimeResult<()> {
        let path = path.into();
        self.call(move |owner| owner.save_logs(&path)).await
    }

    /// Replace the log with the file's entries.
    pub async fn load_logs(&self, path: impl Into<PathBuf>) -> RuntimeResult<()> {
        let path = path.into();
        self.call(move |owner| owner.load_logs(&path)).await
    }

    /// Stop the timer, abandon in-flight feeding and end the owner task.
    pub async fn shutdown(&self) -> RuntimeResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown(reply_tx))
            .await
            .map_err(|_| RuntimeError::Closed)?;
        reply_rx.await.map_err(|_| RuntimeError::Closed)
    }
}

struct Owner {
    zoo: Zoo,
    cycle: DayNightCycle,
    driver: DayNightDriver,
    feeding: FeedingCoordinator,
    sink: Box<dyn LogSink>,
    registry: ZooRegistry,
    narrations: Arc<InMemoryEventBus<Narration>>,
    rng: SmallRng,
}

impl Owner {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut inbox: mpsc::UnboundedReceiver<Internal>) {
        info!("zoo runtime started");
        loop {
            tokio::select! {
                biased;
                Some(message) = inbox.recv() => self.on_internal(message),
                command = commands.recv() => match command {
                    Some(Command::Call(job)) => job(&mut self),
                    Some(Command::Shutdown(reply)) => {
                        self.shutdown().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
            }
        }
        info!("zoo runtime stopped");
    }

    async fn shutdown(&mut self) {
        self.driver.stop();
        self.feeding.shutdown().await;
    }

    fn on_internal(&mut self, message: Internal) {
        match message {
            Internal::Narrate(line) => self.narrate(line),
            Internal::Tick { generation } => {
                if !self.driver.is_current(generation) {
                    debug!(generation, "stale day/night tick dropped");
                    return;
                }
                let event = self.cycle.tick(&mut self.rng);
                self.emit(event);
            }
        }
    }

    fn narrate(&mut self, line: String) {
        debug!(target: "crazyzoo::narration", "{line}");
        self.sink.log(&line);
        let narration = Narration {
            line,
            at: Instant::now(),
        };
        if let Err(e) = self.narrations.publish(narration) {
            warn!(error = ?e, "narration feed unavailable");
        }
    }

    /// Dispatch to subscribers, log their lines, then hand food drops to the
    /// feeding coordinator.
    fn emit(&mut self, event: ZooEvent) {
        let roster: Vec<Animal> = match &event {
            ZooEvent::Joined { animal, enclosure } => self
                .zoo
                .enclosure(enclosure)
                .map(|e| {
                    e.animals()
                        .iter()
                        .filter(|a| a.id() != animal.id())
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            ZooEvent::FoodDropped { enclosure, .. } => self
                .zoo
                .enclosure(enclosure)
                .map(Enclosure::snapshot)
                .unwrap_or_default(),
            ZooEvent::NightFallen { .. } | ZooEvent::MorningArrived { .. } => Vec::new(),
        };

        // Subscribers get their own copy; feeding walks the snapshot as taken.
        let mut ctx = EventContext::new(roster.clone());
        self.registry.dispatch(&event, &mut ctx);
        for line in ctx.into_lines() {
            self.narrate(line);
        }

        if let ZooEvent::FoodDropped { food, enclosure } = event {
            self.feeding.schedule(FeedingRun::new(enclosure, food, roster));
        }
    }

    fn animal(&self, id: AnimalId) -> RuntimeResult<&Animal> {
        self.zoo
            .animal(id)
            .ok_or_else(|| DomainError::not_found(format!("animal {id}")).into())
    }

    fn animal_mut(&mut self, id: AnimalId) -> RuntimeResult<&mut Animal> {
        self.zoo
            .animal_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("animal {id}")).into())
    }

    fn add_enclosure(&mut self, name: String, capacity: usize) -> RuntimeResult<()> {
        let enclosure = Enclosure::new(name, capacity)?;
        let line = format!("🏗️ Enclosure created: {} (capacity {})", enclosure.name(), capacity);
        self.zoo.add_enclosure(enclosure)?;
        self.narrate(line);
        Ok(())
    }

    fn remove_enclosure(&mut self, name: &str) -> RuntimeResult<()> {
        self.zoo.remove_enclosure(name)?;
        self.feeding.cancel(name);
        self.narrate(format!("🧹 Enclosure removed: {name}"));
        Ok(())
    }

    fn register_animal(&mut self, animal: Animal) -> RuntimeResult<AnimalId> {
        let name = animal.name().to_string();
        let id = self.zoo.register(animal)?;
        info!(animal_id = %id, %name, "animal registered");
        self.narrate(format!("✅ Animal added: {name}"));
        Ok(id)
    }

    fn retire_animal(&mut self, id: AnimalId) -> RuntimeResult<Animal> {
        let retired = self.zoo.retire(id)?;
        if let Some(enclosure) = &retired.enclosure {
            self.narrate(format!("🏠 {} removed from enclosure {enclosure}", retired.animal.name()));
        }
        self.narrate(format!("🗑️ Animal removed: {}", retired.animal.name()));
        Ok(retired.animal)
    }

    fn admit(&mut self, id: AnimalId, enclosure: &str) -> RuntimeResult<bool> {
        match self.zoo.admit(id, enclosure)? {
            Some(event) => {
                self.emit(event);
                Ok(true)
            }
            None => {
                info!(animal_id = %id, enclosure, "enclosure is full");
                Ok(false)
            }
        }
    }

    fn remove_from_enclosure(&mut self, enclosure: &str, id: AnimalId) -> RuntimeResult<bool> {
        if !self.zoo.release(enclosure, id)? {
            return Ok(false);
        }
        let name = self.animal(id)?.name().to_string();
        self.narrate(format!("🏠 {name} removed from enclosure {enclosure}"));
        Ok(true)
    }

    fn drop_food(&mut self, enclosure: &str, food: &str) -> RuntimeResult<()> {
        let event = self.zoo.drop_food(enclosure, food)?;
        self.emit(event);
        Ok(())
    }

    fn make_sound(&mut self, id: AnimalId) -> RuntimeResult<String> {
        let animal = self.animal(id)?;
        let (name, sound) = (animal.name().to_string(), animal.sound().to_string());
        self.narrate(format!("🔊 {name} said: {sound}"));
        Ok(sound)
    }

    fn feed(&mut self, id: AnimalId, food: &str) -> RuntimeResult<String> {
        let animal = self.animal(id)?;
        let (name, reaction) = (animal.name().to_string(), animal.react_to_food(food));
        self.narrate(format!("🍴 {name} got {food}"));
        self.narrate(format!("  🍽️ {reaction}"));
        Ok(reaction)
    }

    fn act_erratically(&mut self, id: AnimalId) -> RuntimeResult<Option<String>> {
        let animal = self
            .zoo
            .animal_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("animal {id}")))?;
        let name = animal.name().to_string();
        let outcome = animal.act_erratically(&mut self.rng);

        let line = match &outcome {
            Some(line) => format!("🎪 CRAZY! {line}"),
            None => format!("❌ {name} can't act crazy!"),
        };
        self.narrate(line);
        Ok(outcome)
    }

    fn toggle_flight(&mut self, id: AnimalId) -> RuntimeResult<Option<bool>> {
        let animal = self.animal_mut(id)?;
        let name = animal.name().to_string();
        let flying = animal.toggle_flight();
        let line = match flying {
            Some(true) => format!("✈️ {name} is now flying!"),
            Some(false) => format!("✈️ {name} landed!"),
            None => format!("❌ {name} can't fly!"),
        };
        self.narrate(line);
        Ok(flying)
    }

    fn describe(&mut self, id: AnimalId) -> RuntimeResult<String> {
        let description = self.animal(id)?.describe();
        self.narrate(format!("ℹ️ {description}"));
        Ok(description)
    }

    fn statistics(&mut self) -> RuntimeResult<ZooStatistics> {
        let stats = ZooStatistics::collect(&self.zoo);
        for line in stats.lines() {
            self.narrate(line);
        }
        Ok(stats)
    }

    fn restore(&mut self, zoo: Zoo) {
        self.feeding.cancel_all();
        self.zoo = zoo;
        self.narrate("📂 Data loaded from database".to_string());
        self.narrate(format!(
            "✅ Loaded {} animals and {} enclosures",
            self.zoo.animal_count(),
            self.zoo.enclosures().len()
        ));
    }

    fn start_cycle(&mut self) -> bool {
        let started = self.driver.start();
        if started {
            self.narrate("🌙 Night event timer started!".to_string());
        }
        started
    }

    fn stop_cycle(&mut self) -> bool {
        let stopped = self.driver.stop();
        if stopped {
            self.narrate("☀️ Timer stopped.".to_string());
        }
        stopped
    }

    fn change_interval(&mut self, interval: Duration) -> RuntimeResult<()> {
        if interval.is_zero() {
            return Err(DomainError::validation("interval must be positive").into());
        }
        self.driver.change_interval(interval);
        self.narrate(format!("⏱️ Interval changed: {} seconds", interval.as_secs_f64()));
        Ok(())
    }

    fn cycle_state(&self) -> CycleState {
        CycleState {
            phase: self.cycle.phase(),
            day_count: self.cycle.day_count(),
            running: self.driver.is_running(),
            interval: self.driver.interval(),
        }
    }

    fn save_logs(&mut self, path: &Path) -> RuntimeResult<()> {
        self.sink.save_to_file(path)?;
        self.narrate(format!("💾 Logs saved: {}", path.display()));
        Ok(())
    }

    fn load_logs(&mut self, path: &Path) -> RuntimeResult<()> {
        self.sink.load_from_file(path)?;
        self.narrate(format!("📂 Logs loaded: {}", path.display()));
        Ok(())
    }
}
