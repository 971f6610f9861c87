//! `crazyzoo-core`: primitives shared by every zoo crate.
//!
//! Errors, identifiers and the `Entity` trait. No IO, no async.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AnimalId, EnclosureId};
