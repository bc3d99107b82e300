//! `fiscalerp-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the fiscal error taxonomy, strongly-typed identifiers, and monetary
//! rounding rules shared by the numbering and invoicing crates.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{FiscalError, FiscalResult};
pub use id::{CustomerId, InvoiceId, ProductId, SequenceId};
pub use money::{CurrencyCode, MONEY_SCALE, QUANTITY_SCALE, round_money};
pub use value_object::ValueObject;
