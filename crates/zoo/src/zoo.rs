use crazyzoo_core::{AnimalId, DomainError, DomainResult};

use crate::animal::Animal;
use crate::enclosure::Enclosure;
use crate::event::ZooEvent;

/// The whole catalog: enclosures in creation order plus animals without a home.
///
/// Every animal lives in exactly one place, so an animal's enclosure
/// back-reference always matches the enclosure holding it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Zoo {
    enclosures: Vec<Enclosure>,
    unhoused: Vec<Animal>,
    max_id: AnimalId,
}

/// An animal removed from the catalog, with the enclosure it was taken out of.
#[derive(Debug, Clone, PartialEq)]
pub struct Retired {
    pub animal: Animal,
    pub enclosure: Option<String>,
}

impl Zoo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a catalog from stored enclosures and animals.
    ///
    /// Animals are placed by back-reference in id order. No `Joined` events are
    /// produced. Overflow, duplicates or a dangling enclosure name are integrity errors.
    pub fn rebuild(enclosures: Vec<Enclosure>, mut animals: Vec<Animal>) -> DomainResult<Self> {
        let mut zoo = Self::new();
        for enclosure in enclosures {
            if !enclosure.is_empty() {
                return Err(DomainError::invariant(format!(
                    "enclosure '{}' must be rebuilt empty",
                    enclosure.name()
                )));
            }
            zoo.add_enclosure(enclosure)?;
        }

        animals.sort_by_key(Animal::id);
        for animal in animals {
            if !animal.id().is_saved() {
                return Err(DomainError::invariant(format!("{animal} has no stored id")));
            }
            if zoo.animal(animal.id()).is_some() {
                return Err(DomainError::invariant(format!("duplicate animal id {}", animal.id())));
            }
            zoo.max_id = zoo.max_id.max(animal.id());

            let Some(home) = animal.enclosure().map(str::to_string) else {
                zoo.unhoused.push(animal);
                continue;
            };
            let enclosure = zoo.enclosure_mut(&home).ok_or_else(|| {
                DomainError::invariant(format!("{animal} refers to unknown enclosure '{home}'"))
            })?;
            if let Err(animal) = enclosure.add_animal(animal) {
                return Err(DomainError::invariant(format!(
                    "enclosure '{home}' cannot hold {animal}"
                )));
            }
        }

        Ok(zoo)
    }

    pub fn enclosures(&self) -> &[Enclosure] {
        &self.enclosures
    }

    pub fn enclosure(&self, name: &str) -> Option<&Enclosure> {
        self.enclosures.iter().find(|e| e.name() == name)
    }

    fn enclosure_mut(&mut self, name: &str) -> Option<&mut Enclosure> {
        self.enclosures.iter_mut().find(|e| e.name() == name)
    }

    fn require_enclosure_mut(&mut self, name: &str) -> DomainResult<&mut Enclosure> {
        self.enclosure_mut(name)
            .ok_or_else(|| DomainError::not_found(format!("enclosure '{name}'")))
    }

    pub fn add_enclosure(&mut self, enclosure: Enclosure) -> DomainResult<()> {
        if self.enclosure(enclosure.name()).is_some() {
            return Err(DomainError::conflict(format!(
                "enclosure '{}' already exists",
                enclosure.name()
            )));
        }
        self.enclosures.push(enclosure);
        Ok(())
    }

    /// Destroy an empty enclosure.
    pub fn remove_enclosure(&mut self, name: &str) -> DomainResult<Enclosure> {
        let idx = self
            .enclosures
            .iter()
            .position(|e| e.name() == name)
            .ok_or_else(|| DomainError::not_found(format!("enclosure '{name}'")))?;
        if !self.enclosures[idx].is_empty() {
            return Err(DomainError::conflict(format!(
                "enclosure '{name}' still has animals"
            )));
        }
        Ok(self.enclosures.remove(idx))
    }

    /// Identifier the next registered animal will receive.
    pub fn next_id(&self) -> AnimalId {
        self.max_id.next()
    }

    /// Make sure fresh ids start at `next` or later.
    pub fn seed_next_id(&mut self, next: AnimalId) {
        if next.get() > 1 {
            self.max_id = self.max_id.max(AnimalId::new(next.get() - 1));
        }
    }

    /// Add an animal to the catalog, unhoused. Unsaved animals get the next id.
    pub fn register(&mut self, mut animal: Animal) -> DomainResult<AnimalId> {
        if animal.id().is_saved() {
            if self.animal(animal.id()).is_some() {
                return Err(DomainError::conflict(format!(
                    "animal id {} is already taken",
                    animal.id()
                )));
            }
        } else {
            animal.assign_id(self.next_id());
        }

        let id = animal.id();
        self.max_id = self.max_id.max(id);
        animal.set_enclosure(None);
        self.unhoused.push(animal);
        Ok(id)
    }

    pub fn animal(&self, id: AnimalId) -> Option<&Animal> {
        self.unhoused
            .iter()
            .find(|a| a.id() == id)
            .or_else(|| self.enclosures.iter().find_map(|e| e.animal(id)))
    }

    pub fn animal_mut(&mut self, id: AnimalId) -> Option<&mut Animal> {
        if let Some(idx) = self.unhoused.iter().position(|a| a.id() == id) {
            return self.unhoused.get_mut(idx);
        }
        self.enclosures.iter_mut().find_map(|e| e.animal_mut(id))
    }

    /// Animals that live in no enclosure.
    pub fn unhoused(&self) -> &[Animal] {
        &self.unhoused
    }

    /// Every animal, ordered by id.
    pub fn animals(&self) -> Vec<&Animal> {
        let mut all: Vec<&Animal> = self
            .enclosures
            .iter()
            .flat_map(|e| e.animals().iter())
            .chain(self.unhoused.iter())
            .collect();
        all.sort_by_key(|a| a.id());
        all
    }

    pub fn animal_count(&self) -> usize {
        self.unhoused.len() + self.enclosures.iter().map(Enclosure::len).sum::<usize>()
    }

    /// Move an unhoused animal into an enclosure.
    ///
    /// `Ok(None)` when the enclosure is full; the animal then stays unhoused.
    pub fn admit(&mut self, id: AnimalId, enclosure: &str) -> DomainResult<Option<ZooEvent>> {
        let Some(idx) = self.unhoused.iter().position(|a| a.id() == id) else {
            return Err(match self.animal(id).and_then(Animal::enclosure) {
                Some(home) => DomainError::conflict(format!(
                    "animal {id} already lives in enclosure '{home}'"
                )),
                None => DomainError::not_found(format!("animal {id}")),
            });
        };
        let target = self.require_enclosure_mut(enclosure)?;
        if target.is_full() {
            return Ok(None);
        }

        let animal = self.unhoused.remove(idx);
        let target = self.require_enclosure_mut(enclosure)?;
        match target.add_animal(animal) {
            Ok(event) => Ok(Some(event)),
            Err(animal) => {
                self.unhoused.insert(idx, animal);
                Ok(None)
            }
        }
    }

    /// Take an animal out of an enclosure. `Ok(false)` if it was not a member.
    pub fn release(&mut self, enclosure: &str, id: AnimalId) -> DomainResult<bool> {
        let removed = self.require_enclosure_mut(enclosure)?.remove_animal(id);
        match removed {
            Some(animal) => {
                self.unhoused.push(animal);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete an animal from the catalog, taking it out of its enclosure first.
    pub fn retire(&mut self, id: AnimalId) -> DomainResult<Retired> {
        if let Some(idx) = self.unhoused.iter().position(|a| a.id() == id) {
            return Ok(Retired {
                animal: self.unhoused.remove(idx),
                enclosure: None,
            });
        }

        for enclosure in &mut self.enclosures {
            if let Some(animal) = enclosure.remove_animal(id) {
                return Ok(Retired {
                    animal,
                    enclosure: Some(enclosure.name().to_string()),
                });
            }
        }
        Err(DomainError::not_found(format!("animal {id}")))
    }

    pub fn drop_food(&self, enclosure: &str, food: &str) -> DomainResult<ZooEvent> {
        self.enclosure(enclosure)
            .map(|e| e.drop_food(food))
            .ok_or_else(|| DomainError::not_found(format!("enclosure '{enclosure}'")))
    }

    /// Split into empty enclosures and every animal (back-references intact).
    pub fn into_parts(self) -> (Vec<Enclosure>, Vec<Animal>) {
        let mut animals = self.unhoused;
        let mut enclosures = Vec::with_capacity(self.enclosures.len());
        for enclosure in self.enclosures {
            let (name, capacity) = (enclosure.name().to_string(), enclosure.capacity());
            animals.extend(enclosure.into_animals());
            if let Ok(empty) = Enclosure::new(name, capacity) {
                enclosures.push(empty);
            }
        }
        animals.sort_by_key(Animal::id);
        (enclosures, animals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Zoo {
        let mut zoo = Zoo::new();
        zoo.add_enclosure(Enclosure::new("A", 2).unwrap()).unwrap();
        zoo.add_enclosure(Enclosure::new("B", 1).unwrap()).unwrap();
        zoo
    }

    #[test]
    fn register_assigns_sequential_ids_after_seed() {
        let mut zoo = demo();
        zoo.seed_next_id(AnimalId::new(5));

        let a = zoo.register(Animal::monkey("Mango", 6).unwrap()).unwrap();
        let b = zoo.register(Animal::raccoon("Riku", 4).unwrap()).unwrap();
        assert_eq!((a.get(), b.get()), (5, 6));
        assert_eq!(zoo.unhoused().len(), 2);
    }

    #[test]
    fn register_rejects_taken_ids() {
        let mut zoo = demo();
        let mut cat = Animal::cat("Muri", 3, "cheese").unwrap();
        cat.assign_id(AnimalId::new(3));
        zoo.register(cat.clone()).unwrap();

        assert!(matches!(zoo.register(cat), Err(DomainError::Conflict(_))));
        assert_eq!(zoo.next_id(), AnimalId::new(4));
    }

    #[test]
    fn admit_moves_animal_and_reports_full() {
        let mut zoo = demo();
        let rex = zoo.register(Animal::dog("Rex", 5, "Shepherd").unwrap()).unwrap();
        let riku = zoo.register(Animal::raccoon("Riku", 4).unwrap()).unwrap();

        assert!(zoo.admit(rex, "B").unwrap().is_some());
        assert_eq!(zoo.animal(rex).unwrap().enclosure(), Some("B"));

        assert_eq!(zoo.admit(riku, "B").unwrap(), None);
        assert_eq!(zoo.animal(riku).unwrap().enclosure(), None);

        assert!(matches!(zoo.admit(rex, "A"), Err(DomainError::Conflict(_))));
        assert!(matches!(zoo.admit(riku, "Z"), Err(DomainError::NotFound(_))));
    }

    #[test]
    fn release_and_retire_keep_back_references_consistent() {
        let mut zoo = demo();
        let rex = zoo.register(Animal::dog("Rex", 5, "Shepherd").unwrap()).unwrap();
        zoo.admit(rex, "A").unwrap();

        assert!(!zoo.release("B", rex).unwrap());
        assert!(zoo.release("A", rex).unwrap());
        assert_eq!(zoo.animal(rex).unwrap().enclosure(), None);

        zoo.admit(rex, "A").unwrap();
        let retired = zoo.retire(rex).unwrap();
        assert_eq!(retired.enclosure.as_deref(), Some("A"));
        assert_eq!(retired.animal.enclosure(), None);
        assert!(zoo.enclosure("A").unwrap().is_empty());
        assert!(zoo.retire(rex).is_err());
    }

    #[test]
    fn occupied_enclosure_cannot_be_removed() {
        let mut zoo = demo();
        let rex = zoo.register(Animal::dog("Rex", 5, "Shepherd").unwrap()).unwrap();
        zoo.admit(rex, "A").unwrap();

        assert!(matches!(zoo.remove_enclosure("A"), Err(DomainError::Conflict(_))));
        assert!(zoo.remove_enclosure("B").is_ok());
        assert!(matches!(zoo.remove_enclosure("B"), Err(DomainError::NotFound(_))));
        assert!(matches!(
            zoo.add_enclosure(Enclosure::new("A", 3).unwrap()),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn rebuild_places_animals_in_id_order() {
        let mut zoo = demo();
        let first = zoo.register(Animal::dog("Rex", 5, "Shepherd").unwrap()).unwrap();
        let second = zoo.register(Animal::cat("Muri", 3, "cheese").unwrap()).unwrap();
        let third = zoo.register(Animal::bird("Piip", 2, "yellow").unwrap()).unwrap();
        zoo.admit(second, "A").unwrap();
        zoo.admit(first, "A").unwrap();

        let (enclosures, animals) = zoo.into_parts();
        let rebuilt = Zoo::rebuild(enclosures, animals).unwrap();

        let order: Vec<_> = rebuilt.enclosure("A").unwrap().animals().iter().map(Animal::id).collect();
        assert_eq!(order, vec![first, second]);
        assert_eq!(rebuilt.unhoused()[0].id(), third);
        assert_eq!(rebuilt.next_id(), third.next());
    }

    #[test]
    fn rebuild_rejects_dangling_and_overflowing_homes() {
        let mut lost = Animal::monkey("Mango", 6).unwrap();
        lost.assign_id(AnimalId::new(1));
        let mut record = lost.to_record();
        record.enclosure = Some("Nowhere".into());
        let lost = Animal::from_record(record).unwrap();
        assert!(matches!(
            Zoo::rebuild(vec![], vec![lost]),
            Err(DomainError::InvariantViolation(_))
        ));

        let crowd: Vec<Animal> = (1..=2)
            .map(|i| {
                let mut record = Animal::raccoon("Riku", 4).unwrap().to_record();
                record.id = AnimalId::new(i);
                record.enclosure = Some("Tiny".into());
                Animal::from_record(record).unwrap()
            })
            .collect();
        assert!(matches!(
            Zoo::rebuild(vec![Enclosure::new("Tiny", 1).unwrap()], crowd),
            Err(DomainError::InvariantViolation(_))
        ));
    }
}
