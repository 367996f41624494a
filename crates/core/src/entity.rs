//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Line items, fulfillment groups and allocations are entities: two allocations
/// with the same quantity are still distinct if their ids differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
