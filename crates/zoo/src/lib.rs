//! Zoo domain module.
//!
//! Animals, enclosures, the day/night state machine and the events they emit,
//! implemented purely as deterministic domain logic (no IO, no timers, no storage).
//! Randomness is always injected by the caller.

pub mod animal;
pub mod cycle;
pub mod enclosure;
pub mod event;
pub mod stats;
pub mod zoo;

pub use animal::{Animal, AnimalKind, AnimalRecord, Capabilities, MAX_EATING_SPEED, Traits};
pub use cycle::{DayNightCycle, MORNING_MESSAGE, NIGHT_EVENTS, Phase};
pub use enclosure::Enclosure;
pub use event::ZooEvent;
pub use stats::{KindSummary, ZooStatistics};
pub use zoo::{Retired, Zoo};
