use serde::{Deserialize, Serialize};

use crazyzoo_events::Event;

use crate::animal::Animal;

/// Events emitted by enclosures and the day/night cycle.
///
/// Ephemeral: only their narrated text reaches the log sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZooEvent {
    Joined { animal: Animal, enclosure: String },
    FoodDropped { food: String, enclosure: String },
    NightFallen { day: u32, message: String },
    MorningArrived { message: String },
}

impl ZooEvent {
    pub const JOINED: &'static str = "zoo.enclosure.animal_joined";
    pub const FOOD_DROPPED: &'static str = "zoo.enclosure.food_dropped";
    pub const NIGHT_FALLEN: &'static str = "zoo.cycle.night_fallen";
    pub const MORNING_ARRIVED: &'static str = "zoo.cycle.morning_arrived";

    /// Every event type, in declaration order.
    pub const TYPES: [&'static str; 4] = [
        Self::JOINED,
        Self::FOOD_DROPPED,
        Self::NIGHT_FALLEN,
        Self::MORNING_ARRIVED,
    ];

    /// Enclosure the event happened in, for enclosure-scoped events.
    pub fn enclosure(&self) -> Option<&str> {
        match self {
            ZooEvent::Joined { enclosure, .. } | ZooEvent::FoodDropped { enclosure, .. } => {
                Some(enclosure)
            }
            ZooEvent::NightFallen { .. } | ZooEvent::MorningArrived { .. } => None,
        }
    }
}

impl Event for ZooEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ZooEvent::Joined { .. } => Self::JOINED,
            ZooEvent::FoodDropped { .. } => Self::FOOD_DROPPED,
            ZooEvent::NightFallen { .. } => Self::NIGHT_FALLEN,
            ZooEvent::MorningArrived { .. } => Self::MORNING_ARRIVED,
        }
    }
}
