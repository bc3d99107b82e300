//! NCF numbering: sequences, issued numbers, and the allocator service.
//!
//! Fiscal receipt numbers (NCF) come from finite, typed, expiring ranges
//! authorized by the tax administration. This crate owns the one piece of
//! shared mutable state in the whole core: the cursor of each
//! [`NumberSequence`]. Everything else is immutable once created.

pub mod allocator;
pub mod ncf;
pub mod sequence;
pub mod store;

pub use allocator::SequenceAllocator;
pub use ncf::NcfNumber;
pub use sequence::NumberSequence;
pub use store::{InMemorySequenceStore, SequenceStore};
