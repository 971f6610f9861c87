//! Narrated lines and the built-in event subscribers that produce them.

use tokio::time::Instant;

use crazyzoo_events::HandlerRegistry;
use crazyzoo_zoo::{Animal, ZooEvent};

/// One line as it reached the log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub line: String,
    pub at: Instant,
}

/// What subscribers see while an event is dispatched.
///
/// The roster is a read-only copy taken by the owner when the event fired:
/// the other members for `Joined`, every member in arrival order for
/// `FoodDropped`, empty otherwise. Lines pushed here are logged after
/// dispatch, in order.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    roster: Vec<Animal>,
    lines: Vec<String>,
}

impl EventContext {
    pub fn new(roster: Vec<Animal>) -> Self {
        Self {
            roster,
            lines: Vec::new(),
        }
    }

    pub fn roster(&self) -> &[Animal] {
        &self.roster
    }

    pub fn narrate(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

pub type ZooRegistry = HandlerRegistry<ZooEvent, EventContext>;

/// Subscribe the handlers that narrate every event kind. Registered before any
/// external subscriber, so their lines come first.
pub fn register_builtin(registry: &mut ZooRegistry) {
    registry.subscribe(ZooEvent::JOINED, |event: &ZooEvent, ctx: &mut EventContext| {
        if let ZooEvent::Joined { animal, enclosure } = event {
            ctx.narrate(format!("🐾 {} joined enclosure '{enclosure}'", animal.name()));
            let reactions: Vec<String> = ctx
                .roster
                .iter()
                .map(|neighbor| format!("  💬 {}", neighbor.react_to_neighbor(animal)))
                .collect();
            ctx.lines.extend(reactions);
        }
    });

    registry.subscribe(ZooEvent::FOOD_DROPPED, |event: &ZooEvent, ctx: &mut EventContext| {
        if let ZooEvent::FoodDropped { food, enclosure } = event {
            ctx.narrate(format!("🍖 {food} dropped to enclosure '{enclosure}'"));
        }
    });

    registry.subscribe(ZooEvent::NIGHT_FALLEN, |event: &ZooEvent, ctx: &mut EventContext| {
        if let ZooEvent::NightFallen { day, message } = event {
            ctx.narrate(format!("🌙 Day {day}: {message}"));
        }
    });

    registry.subscribe(ZooEvent::MORNING_ARRIVED, |event: &ZooEvent, ctx: &mut EventContext| {
        if let ZooEvent::MorningArrived { message } = event {
            ctx.narrate(message.clone());
        }
    });
}

pub(crate) fn food_reaction(animal: &Animal, food: &str) -> String {
    format!("  🍽️ {}", animal.react_to_food(food))
}

pub(crate) fn finished_eating(animal: &Animal) -> String {
    format!("  ✅ {} finished eating", animal.name())
}

pub(crate) fn all_fed(enclosure: &str) -> String {
    format!("🎉 All animals in enclosure '{enclosure}' are fed!")
}

#[cfg(test)]
mod tests {
    use crazyzoo_core::AnimalId;
    use crazyzoo_zoo::Enclosure;

    use super::*;

    fn registry() -> ZooRegistry {
        let mut registry = ZooRegistry::new();
        register_builtin(&mut registry);
        registry
    }

    #[test]
    fn joined_narrates_arrival_then_neighbour_reactions() {
        let mut muri = Animal::cat("Muri", 3, "cheese").unwrap();
        muri.assign_id(AnimalId::new(1));
        let mut rex = Animal::dog("Rex", 5, "Shepherd").unwrap();
        rex.assign_id(AnimalId::new(2));

        let mut pen = Enclosure::new("Enclosure A", 5).unwrap();
        pen.add_animal(muri.clone()).unwrap();
        let event = pen.add_animal(rex).unwrap();

        let mut ctx = EventContext::new(vec![muri]);
        registry().dispatch(&event, &mut ctx);

        assert_eq!(
            ctx.lines(),
            [
                "🐾 Rex joined enclosure 'Enclosure A'".to_string(),
                "  💬 Muri: Pah, a dog! *whispers*".to_string(),
            ]
        );
    }

    #[test]
    fn cycle_events_are_narrated() {
        let mut ctx = EventContext::default();
        let mut registry = registry();
        registry.dispatch(
            &ZooEvent::NightFallen {
                day: 3,
                message: "🦇 The bats went hunting".into(),
            },
            &mut ctx,
        );
        registry.dispatch(
            &ZooEvent::MorningArrived {
                message: crazyzoo_zoo::MORNING_MESSAGE.into(),
            },
            &mut ctx,
        );

        assert_eq!(ctx.lines()[0], "🌙 Day 3: 🦇 The bats went hunting");
        assert_eq!(ctx.lines()[1], crazyzoo_zoo::MORNING_MESSAGE);
    }

    #[test]
    fn feeding_lines() {
        let bird = Animal::bird("Piip", 2, "yellow").unwrap();
        assert_eq!(food_reaction(&bird, "seeds"), "  🍽️ Piip quickly pecks at the seeds!");
        assert_eq!(finished_eating(&bird), "  ✅ Piip finished eating");
        assert_eq!(all_fed("B"), "🎉 All animals in enclosure 'B' are fed!");
    }
}
