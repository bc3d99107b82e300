//! Invoicing: line aggregation, the invoice state machine, and the
//! compositor that ties eligibility checks, totals, and NCF allocation into
//! one atomic issue step.

pub mod compositor;
pub mod invoice;
pub mod totals;

pub use compositor::InvoiceCompositor;
pub use invoice::{Invoice, InvoiceStatus, PaymentTerms};
pub use totals::{InvoiceLine, InvoiceTotals, compute_totals};
