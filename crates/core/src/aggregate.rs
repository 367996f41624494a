//! Aggregate root trait.

/// Aggregate root marker + minimal interface.
///
/// The aggregate owns every entity reachable from it. Children refer to each
/// other by identifier only, never by reference, so the whole graph can be
/// mutated in place through a single `&mut` borrow of the root.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    ///
    /// Bumped once per structural mutation. Callers can compare versions to
    /// detect whether an operation touched the graph at all.
    fn version(&self) -> u64;
}
