//! Persistence collaborator for animals and enclosures.
//!
//! The store owns the row layout; the domain only sees `Animal` values and
//! `EnclosureRecord`s. Every failure is surfaced to the caller, reads included.
//!
//! ## Error Mapping
//!
//! | Condition | StoreError |
//! |-----------|------------|
//! | unique violation on `enclosures.name` | `DuplicateEnclosure` |
//! | UPDATE/DELETE touching no animal row | `AnimalNotFound` |
//! | enclosure id or name without a row | `UnknownEnclosure` |
//! | deleting an enclosure that still has animals | `EnclosureOccupied` |
//! | `replace_all` animal naming an enclosure not in the batch | `UnknownEnclosure` |
//! | stored kind tag outside the closed set | `Domain(UnknownKind)` |
//! | anything else from sqlx | `Database` |

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crazyzoo_core::{AnimalId, DomainError, EnclosureId};
use crazyzoo_zoo::{Animal, Enclosure};

pub mod sqlite;

pub use sqlite::SqliteAnimalRepository;

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored enclosure row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosureRecord {
    pub id: EnclosureId,
    pub name: String,
    pub capacity: i64,
}

/// Storage operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error during {context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("animal not found: {0}")]
    AnimalNotFound(AnimalId),

    #[error("enclosure {0} still has animals")]
    EnclosureOccupied(EnclosureId),

    #[error("enclosure '{0}' already exists")]
    DuplicateEnclosure(String),

    #[error("unknown enclosure: {0}")]
    UnknownEnclosure(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

pub(crate) fn map_sqlx_error(context: &'static str, source: sqlx::Error) -> StoreError {
    StoreError::Database { context, source }
}

/// Animal and enclosure storage.
#[async_trait]
pub trait AnimalRepository: Send + Sync {
    /// Insert an animal and return its id.
    ///
    /// A saved id is kept as is; an unsaved one is assigned by the store. The
    /// enclosure back-reference is resolved by name.
    async fn add_animal(&self, animal: &Animal) -> StoreResult<AnimalId>;

    async fn remove_animal(&self, id: AnimalId) -> StoreResult<()>;

    /// Overwrite the stored row with the animal's current state.
    async fn update_animal(&self, animal: &Animal) -> StoreResult<()>;

    async fn get_animal_by_id(&self, id: AnimalId) -> StoreResult<Option<Animal>>;

    /// All animals in id order.
    async fn get_all_animals(&self) -> StoreResult<Vec<Animal>>;

    async fn add_enclosure(&self, name: &str, capacity: usize) -> StoreResult<EnclosureId>;

    /// Fails with `EnclosureOccupied` while any animal still references it.
    async fn remove_enclosure(&self, id: EnclosureId) -> StoreResult<()>;

    async fn get_all_enclosures(&self) -> StoreResult<Vec<EnclosureRecord>>;

    async fn assign_animal_to_enclosure(&self, animal: AnimalId, enclosure: EnclosureId) -> StoreResult<()>;

    async fn remove_animal_from_enclosure(&self, animal: AnimalId) -> StoreResult<()>;

    async fn get_animals_by_enclosure(&self, enclosure: EnclosureId) -> StoreResult<Vec<Animal>>;

    async fn clear_all(&self) -> StoreResult<()>;

    /// Swap the whole stored state for `enclosures` and `animals` in one step.
    ///
    /// Animal ids are kept and homes are resolved by enclosure name. On any
    /// failure the previous state is left untouched.
    async fn replace_all(&self, enclosures: &[Enclosure], animals: &[Animal]) -> StoreResult<()>;

    /// One past the highest stored animal id.
    async fn get_next_animal_id(&self) -> StoreResult<AnimalId>;
}

#[async_trait]
impl<T> AnimalRepository for Arc<T>
where
    T: AnimalRepository + ?Sized,
{
    async fn add_animal(&self, animal: &Animal) -> StoreResult<AnimalId> {
        (**self).add_animal(animal).await
    }

    async fn remove_animal(&self, id: AnimalId) -> StoreResult<()> {
        (**self).remove_animal(id).await
    }

    async fn update_animal(&self, animal: &Animal) -> StoreResult<()> {
        (**self).update_animal(animal).await
    }

    async fn get_animal_by_id(&self, id: AnimalId) -> StoreResult<Option<Animal>> {
        (**self).get_animal_by_id(id).await
    }

    async fn get_all_animals(&self) -> StoreResult<Vec<Animal>> {
        (**self).get_all_animals().await
    }

    async fn add_enclosure(&self, name: &str, capacity: usize) -> StoreResult<EnclosureId> {
        (**self).add_enclosure(name, capacity).await
    }

    async fn remove_enclosure(&self, id: EnclosureId) -> StoreResult<()> {
        (**self).remove_enclosure(id).await
    }

    async fn get_all_enclosures(&self) -> StoreResult<Vec<EnclosureRecord>> {
        (**self).get_all_enclosures().await
    }

    async fn assign_animal_to_enclosure(&self, animal: AnimalId, enclosure: EnclosureId) -> StoreResult<()> {
        (**self).assign_animal_to_enclosure(animal, enclosure).await
    }

    async fn remove_animal_from_enclosure(&self, animal: AnimalId) -> StoreResult<()> {
        (**self).remove_animal_from_enclosure(animal).await
    }

    async fn get_animals_by_enclosure(&self, enclosure: EnclosureId) -> StoreResult<Vec<Animal>> {
        (**self).get_animals_by_enclosure(enclosure).await
    }

    async fn clear_all(&self) -> StoreResult<()> {
        (**self).clear_all().await
    }

    async fn replace_all(&self, enclosures: &[Enclosure], animals: &[Animal]) -> StoreResult<()> {
        (**self).replace_all(enclosures, animals).await
    }

    async fn get_next_animal_id(&self) -> StoreResult<AnimalId> {
        (**self).get_next_animal_id().await
    }
}
