//! Event mechanics shared by the simulation: the `Event` trait, an ordered
//! synchronous handler registry, and a pub/sub bus for live observers.

pub mod bus;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use handler::{EventHandler, HandlerRegistry};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
