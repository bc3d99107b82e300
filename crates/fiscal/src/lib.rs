//! Fiscal reference data: tax classes and NCF document types.
//!
//! Everything in this crate is immutable reference data, loaded once at
//! process start and validated at load time. Unknown or malformed codes fail
//! fast; nothing falls back to a default legal document type.

pub mod document_type;
pub mod store;
pub mod tax;
pub mod taxpayer;

pub use document_type::{DocumentTypeCode, DocumentTypeRegistry, DocumentTypeRule};
pub use store::{ReferenceDataStore, load_reference_data};
pub use tax::{TaxClass, TaxClassCode, TaxRuleTable};
pub use taxpayer::{Rnc, StaticTaxpayerRegistry, TaxpayerRegistry, UnavailableTaxpayerRegistry};
