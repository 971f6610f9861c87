//! Single-owner simulation runtime.
//!
//! One tokio task owns the zoo, the day/night state and the log sink. Callers
//! talk to it through a cloneable `ZooHandle`; feeding workers and the
//! day/night timer run as separate tasks and only send messages back to the
//! owner, which is the single writer of every piece of mutable state.

pub mod day_night;
pub mod feeding;
pub mod narration;
pub mod runtime;

pub use day_night::CycleState;
pub use narration::{EventContext, Narration};
pub use runtime::{RuntimeConfig, RuntimeError, ZooHandle, ZooRuntime};

#[cfg(test)]
mod integration_tests;
