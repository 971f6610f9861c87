/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **ephemeral** (only their rendered narration is persisted)
/// - routed by a stable type name
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "zoo.enclosure.food_dropped").
    fn event_type(&self) -> &'static str;
}
