//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and defined entirely by their attribute
/// values: two `InvoiceTotals` with the same figures are the same totals, and
/// an issued fiscal number never changes after creation. To "modify" a value
/// object, construct a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
