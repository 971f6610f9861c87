//! Whole-zoo save and load on top of an `AnimalRepository`.

use tracing::info;

use crazyzoo_zoo::{Animal, Enclosure, Zoo};

use crate::store::{AnimalRepository, StoreResult};

/// Replace the stored state with `zoo`, animals keeping their ids. A failed
/// save leaves the previously stored zoo in place.
pub async fn save_zoo<R>(repo: &R, zoo: &Zoo) -> StoreResult<()>
where
    R: AnimalRepository + ?Sized,
{
    let animals: Vec<Animal> = zoo.animals().into_iter().cloned().collect();
    repo.replace_all(zoo.enclosures(), &animals).await?;

    info!(
        enclosures = zoo.enclosures().len(),
        animals = animals.len(),
        "zoo saved"
    );
    Ok(())
}

/// Rebuild a zoo from storage. Fresh ids continue after the highest stored one.
pub async fn load_zoo<R>(repo: &R) -> StoreResult<Zoo>
where
    R: AnimalRepository + ?Sized,
{
    let mut enclosures = Vec::new();
    for record in repo.get_all_enclosures().await? {
        let capacity = usize::try_from(record.capacity).unwrap_or(0);
        enclosures.push(Enclosure::new(record.name, capacity)?);
    }
    let animals = repo.get_all_animals().await?;

    let mut zoo = Zoo::rebuild(enclosures, animals)?;
    zoo.seed_next_id(repo.get_next_animal_id().await?);

    info!(
        enclosures = zoo.enclosures().len(),
        animals = zoo.animal_count(),
        "zoo loaded"
    );
    Ok(zoo)
}
