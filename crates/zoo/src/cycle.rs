use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::event::ZooEvent;

/// Flavour lines picked at nightfall.
pub const NIGHT_EVENTS: [&str; 7] = [
    "🦉 The owl started hunting mice",
    "🌙 All animals sleep under the starry sky",
    "🐺 The wolves howl at the moon",
    "🦝 The raccoon pulled off a midnight kitchen raid",
    "🦇 The bats went hunting",
    "🌃 The night guard patrols the grounds",
    "🦎 The reptiles warm themselves under the heat lamps",
];

pub const MORNING_MESSAGE: &str = "☀️ Morning has come. The animals are waking up!";

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Day,
    Night,
}

/// Day/night state machine. Starts in `Day`; the day counter only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayNightCycle {
    phase: Phase,
    day_count: u32,
}

impl DayNightCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_night(&self) -> bool {
        self.phase == Phase::Night
    }

    pub fn day_count(&self) -> u32 {
        self.day_count
    }

    /// Toggle the phase and return the event describing the transition.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ZooEvent {
        match self.phase {
            Phase::Day => {
                self.phase = Phase::Night;
                self.day_count += 1;
                let message = NIGHT_EVENTS.choose(rng).copied().unwrap_or(NIGHT_EVENTS[0]);
                ZooEvent::NightFallen {
                    day: self.day_count,
                    message: message.to_string(),
                }
            }
            Phase::Night => {
                self.phase = Phase::Day;
                ZooEvent::MorningArrived {
                    message: MORNING_MESSAGE.to_string(),
                }
            }
        }
    }
}
