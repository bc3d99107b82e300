//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// An entity keeps the same identity while its attributes change (a numbering
/// sequence keeps its id as the cursor advances; an invoice keeps its id
/// across status transitions).
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
