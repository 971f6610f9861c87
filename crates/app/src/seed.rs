//! The demo zoo a fresh database starts with.

use anyhow::Result;
use tracing::warn;

use crazyzoo_runtime::ZooHandle;
use crazyzoo_zoo::Animal;

pub const ENCLOSURES: [(&str, usize); 3] = [("Enclosure A", 5), ("Enclosure B", 5), ("Enclosure C", 3)];

fn animals() -> Result<Vec<(Animal, Option<&'static str>)>> {
    Ok(vec![
        (Animal::cat("Muri", 3, "cheese")?, Some("Enclosure A")),
        (Animal::dog("Rex", 5, "German Shepherd")?, Some("Enclosure A")),
        (Animal::bird("Piip", 2, "yellow")?, Some("Enclosure B")),
        (Animal::raccoon("Riku", 4)?, Some("Enclosure B")),
        (Animal::monkey("Mango", 6)?, Some("Enclosure C")),
        (Animal::cat("Miisu", 4, "fish")?, None),
        (Animal::dog("Bobik", 3, "Puppy")?, None),
    ])
}

pub async fn populate(zoo: &ZooHandle) -> Result<()> {
    for (name, capacity) in ENCLOSURES {
        zoo.add_enclosure(name, capacity).await?;
    }
    for (animal, home) in animals()? {
        let id = zoo.register_animal(animal).await?;
        if let Some(enclosure) = home {
            if !zoo.admit(id, enclosure).await? {
                warn!(animal_id = %id, enclosure, "demo enclosure already full");
            }
        }
    }
    Ok(())
}
