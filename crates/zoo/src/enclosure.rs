use crazyzoo_core::{AnimalId, DomainError, DomainResult, Entity};

use crate::animal::Animal;
use crate::event::ZooEvent;

/// Named, capacity-bounded group of animals.
///
/// The enclosure owns its members; insertion order is arrival order and drives
/// the feeding sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Enclosure {
    name: String,
    capacity: usize,
    animals: Vec<Animal>,
}

impl Enclosure {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new(name: impl Into<String>, capacity: usize) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("enclosure name must not be empty"));
        }
        if capacity == 0 {
            return Err(DomainError::validation("enclosure capacity must be positive"));
        }

        Ok(Self {
            name,
            capacity,
            animals: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.animals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.animals.len() >= self.capacity
    }

    /// Members in arrival order.
    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    /// Owned copy of the roster; later membership changes do not affect it.
    pub fn snapshot(&self) -> Vec<Animal> {
        self.animals.clone()
    }

    pub fn contains(&self, id: AnimalId) -> bool {
        self.animals.iter().any(|a| a.id() == id)
    }

    pub fn animal(&self, id: AnimalId) -> Option<&Animal> {
        self.animals.iter().find(|a| a.id() == id)
    }

    pub fn animal_mut(&mut self, id: AnimalId) -> Option<&mut Animal> {
        self.animals.iter_mut().find(|a| a.id() == id)
    }

    /// Append an animal and return the `Joined` event.
    ///
    /// Members are keyed by id, so the animal must be saved. A full enclosure,
    /// an unsaved animal or an id that is already a member is handed back
    /// untouched.
    pub fn add_animal(&mut self, mut animal: Animal) -> Result<ZooEvent, Animal> {
        if self.is_full() || !animal.id().is_saved() || self.contains(animal.id()) {
            return Err(animal);
        }

        animal.set_enclosure(Some(self.name.clone()));
        self.animals.push(animal.clone());
        Ok(ZooEvent::Joined {
            animal,
            enclosure: self.name.clone(),
        })
    }

    /// Remove a member, clearing its back-reference. `None` if it was not a member.
    pub fn remove_animal(&mut self, id: AnimalId) -> Option<Animal> {
        let idx = self.animals.iter().position(|a| a.id() == id)?;
        let mut animal = self.animals.remove(idx);
        animal.set_enclosure(None);
        Some(animal)
    }

    /// Always emits, even into an empty enclosure.
    pub fn drop_food(&self, food: impl Into<String>) -> ZooEvent {
        ZooEvent::FoodDropped {
            food: food.into(),
            enclosure: self.name.clone(),
        }
    }

    pub(crate) fn into_animals(self) -> Vec<Animal> {
        self.animals
    }
}

impl Entity for Enclosure {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.name
    }
}

impl core::fmt::Display for Enclosure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({}/{})", self.name, self.animals.len(), self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn raccoon(id: i64) -> Animal {
        let mut animal = Animal::raccoon(format!("Riku{id}"), 4).unwrap();
        animal.assign_id(AnimalId::new(id));
        animal
    }

    #[test]
    fn rejects_zero_capacity() {
        assert!(Enclosure::new("A", 0).is_err());
        assert!(Enclosure::new("  ", 3).is_err());
    }

    #[test]
    fn add_sets_back_reference_and_emits_joined() {
        let mut enclosure = Enclosure::new("Enclosure A", 2).unwrap();
        let event = enclosure.add_animal(raccoon(1)).unwrap();

        match event {
            ZooEvent::Joined { animal, enclosure: name } => {
                assert_eq!(animal.id(), AnimalId::new(1));
                assert_eq!(animal.enclosure(), Some("Enclosure A"));
                assert_eq!(name, "Enclosure A");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(enclosure.animals()[0].enclosure(), Some("Enclosure A"));
    }

    #[test]
    fn full_enclosure_returns_the_animal_unchanged() {
        let mut enclosure = Enclosure::new("C", 1).unwrap();
        enclosure.add_animal(raccoon(1)).unwrap();

        let rejected = enclosure.add_animal(raccoon(2)).unwrap_err();
        assert_eq!(rejected.enclosure(), None);
        assert_eq!(enclosure.len(), 1);
        assert!(enclosure.is_full());
    }

    #[test]
    fn unsaved_or_duplicate_ids_are_handed_back() {
        let mut enclosure = Enclosure::new("B", 3).unwrap();
        let unsaved = Animal::raccoon("Riku", 4).unwrap();
        assert!(enclosure.add_animal(unsaved).is_err());

        enclosure.add_animal(raccoon(1)).unwrap();
        let twin = enclosure.add_animal(raccoon(1)).unwrap_err();
        assert_eq!(twin.enclosure(), None);
        assert_eq!(enclosure.len(), 1);
    }

    #[test]
    fn remove_then_add_restores_membership_and_refires_joined() {
        let mut enclosure = Enclosure::new("B", 3).unwrap();
        enclosure.add_animal(raccoon(1)).unwrap();
        enclosure.add_animal(raccoon(2)).unwrap();
        let before: Vec<_> = enclosure.animals().iter().map(Animal::id).collect();

        let removed = enclosure.remove_animal(AnimalId::new(2)).unwrap();
        assert_eq!(removed.enclosure(), None);
        assert!(enclosure.remove_animal(AnimalId::new(2)).is_none());

        let event = enclosure.add_animal(removed).unwrap();
        assert!(matches!(event, ZooEvent::Joined { .. }));
        let after: Vec<_> = enclosure.animals().iter().map(Animal::id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn drop_food_emits_even_when_empty() {
        let enclosure = Enclosure::new("Empty", 3).unwrap();
        assert_eq!(
            enclosure.drop_food("fish"),
            ZooEvent::FoodDropped {
                food: "fish".into(),
                enclosure: "Empty".into()
            }
        );
    }

    #[test]
    fn snapshot_is_detached_from_later_changes() {
        let mut enclosure = Enclosure::new("A", 3).unwrap();
        enclosure.add_animal(raccoon(1)).unwrap();
        let snapshot = enclosure.snapshot();

        enclosure.add_animal(raccoon(2)).unwrap();
        enclosure.remove_animal(AnimalId::new(1));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), AnimalId::new(1));
    }

    proptest! {
        #[test]
        fn count_never_exceeds_capacity(capacity in 1usize..8, adds in 0usize..20) {
            let mut enclosure = Enclosure::new("P", capacity).unwrap();
            for i in 0..adds {
                let was_full = enclosure.len() == capacity;
                let before = enclosure.len();
                let accepted = enclosure.add_animal(raccoon(i as i64 + 1)).is_ok();

                prop_assert_eq!(accepted, !was_full);
                if !accepted {
                    prop_assert_eq!(enclosure.len(), before);
                }
                prop_assert!(enclosure.len() <= capacity);
            }
        }
    }
}
