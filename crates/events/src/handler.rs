//! Synchronous publish/subscribe registry.
//!
//! A `HandlerRegistry` maps an event type name to the ordered list of handlers
//! subscribed to it. Dispatch runs on the caller's thread/task, one handler at a
//! time, in registration order. Nothing is queued: the owner of the registry is
//! the single writer, and handlers observe state through the context `C` the
//! owner passes in.

use std::collections::HashMap;

use crate::Event;

/// Reacts to one event, given an owner-provided context.
pub trait EventHandler<E, C: ?Sized>: Send {
    fn handle(&mut self, event: &E, ctx: &mut C);
}

impl<E, C, F> EventHandler<E, C> for F
where
    C: ?Sized,
    F: FnMut(&E, &mut C) + Send,
{
    fn handle(&mut self, event: &E, ctx: &mut C) {
        self(event, ctx)
    }
}

/// Event type name -> ordered subscribers.
pub struct HandlerRegistry<E, C: ?Sized> {
    routes: HashMap<&'static str, Vec<Box<dyn EventHandler<E, C>>>>,
}

impl<E, C: ?Sized> HandlerRegistry<E, C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `event_type`. Returns its position in the delivery order.
    pub fn subscribe<H>(&mut self, event_type: &'static str, handler: H) -> usize
    where
        H: EventHandler<E, C> + 'static,
    {
        self.subscribe_boxed(event_type, Box::new(handler))
    }

    pub fn subscribe_boxed(
        &mut self,
        event_type: &'static str,
        handler: Box<dyn EventHandler<E, C>>,
    ) -> usize {
        let handlers = self.routes.entry(event_type).or_default();
        handlers.push(handler);
        handlers.len() - 1
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.routes.get(event_type).map_or(0, Vec::len)
    }
}

impl<E: Event, C: ?Sized> HandlerRegistry<E, C> {
    /// Deliver `event` to its subscribers in registration order.
    ///
    /// Returns how many handlers ran.
    pub fn dispatch(&mut self, event: &E, ctx: &mut C) -> usize {
        let Some(handlers) = self.routes.get_mut(event.event_type()) else {
            tracing::trace!(event_type = event.event_type(), "no subscribers");
            return 0;
        };

        for handler in handlers.iter_mut() {
            handler.handle(event, ctx);
        }
        handlers.len()
    }
}

impl<E, C: ?Sized> Default for HandlerRegistry<E, C> {
    fn default() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }
}

impl<E, C: ?Sized> core::fmt::Debug for HandlerRegistry<E, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (event_type, handlers) in &self.routes {
            map.entry(event_type, &handlers.len());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum Ping {
        Left(u32),
        Right,
    }

    impl Event for Ping {
        fn event_type(&self) -> &'static str {
            match self {
                Ping::Left(_) => "ping.left",
                Ping::Right => "ping.right",
            }
        }
    }

    #[test]
    fn delivers_in_registration_order() {
        let mut registry: HandlerRegistry<Ping, Vec<String>> = HandlerRegistry::new();
        registry.subscribe("ping.left", |ev: &Ping, seen: &mut Vec<String>| {
            if let Ping::Left(n) = ev {
                seen.push(format!("first {n}"));
            }
        });
        registry.subscribe("ping.left", |_: &Ping, seen: &mut Vec<String>| {
            seen.push("second".to_string());
        });

        let mut seen = Vec::new();
        let ran = registry.dispatch(&Ping::Left(3), &mut seen);

        assert_eq!(ran, 2);
        assert_eq!(seen, vec!["first 3".to_string(), "second".to_string()]);
    }

    #[test]
    fn other_event_types_are_not_delivered() {
        let mut registry: HandlerRegistry<Ping, u32> = HandlerRegistry::new();
        registry.subscribe("ping.left", |_: &Ping, hits: &mut u32| *hits += 1);

        let mut hits = 0;
        assert_eq!(registry.dispatch(&Ping::Right, &mut hits), 0);
        assert_eq!(hits, 0);
        assert_eq!(registry.subscriber_count("ping.left"), 1);
        assert_eq!(registry.subscriber_count("ping.right"), 0);
    }

    #[test]
    fn stateful_handlers_keep_state_between_events() {
        struct Counter(u32);
        impl EventHandler<Ping, Vec<u32>> for Counter {
            fn handle(&mut self, _event: &Ping, ctx: &mut Vec<u32>) {
                self.0 += 1;
                ctx.push(self.0);
            }
        }

        let mut registry: HandlerRegistry<Ping, Vec<u32>> = HandlerRegistry::new();
        registry.subscribe("ping.right", Counter(0));

        let mut seen = Vec::new();
        registry.dispatch(&Ping::Right, &mut seen);
        registry.dispatch(&Ping::Right, &mut seen);
        assert_eq!(seen, vec![1, 2]);
    }
}
