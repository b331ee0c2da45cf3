//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Labs and their service offerings are entities the core only reads; orders
/// are aggregates (see [`crate::AggregateRoot`]).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
