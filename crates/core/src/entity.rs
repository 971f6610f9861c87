//! Identity shared by zoo objects.

/// Something the zoo keeps track of by a stable key: animals by `AnimalId`,
/// enclosures by their unique name.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Key that stays the same while the entity's state changes.
    fn id(&self) -> &Self::Id;
}
