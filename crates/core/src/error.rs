//! Fiscal domain error model.
//!
//! Keep this focused on deterministic, business/domain failures. Variants are
//! grouped by how the caller is expected to react: configuration errors go to
//! an operator, eligibility errors go back to whoever is editing the invoice
//! draft, exhaustion requires registering a new range with the tax authority,
//! and contention is the only variant that is safe to retry.

use thiserror::Error;

/// Result type used across the fiscal domain layer.
pub type FiscalResult<T> = Result<T, FiscalError>;

/// Domain-level error for fiscal numbering and invoice composition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FiscalError {
    // -- configuration (bad administrative setup, fatal) --
    /// A numbering range is malformed (end not past start, zero start, ...).
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A new numbering range intersects an existing active range.
    #[error("overlapping range: {0}")]
    OverlappingRange(String),

    /// A tax class code is not present in the tax rule table.
    #[error("unknown tax class: {0}")]
    UnknownTaxClass(String),

    /// A fiscal document type code is not present in the type registry.
    ///
    /// Unknown codes are rejected outright, never reinterpreted as some
    /// default legal document type.
    #[error("unknown document type: {0}")]
    UnknownDocumentType(String),

    // -- eligibility (correct the draft and retry composition) --
    /// The customer does not satisfy the chosen document type's requirements
    /// (e.g. no registered taxpayer id for a crédito fiscal invoice).
    #[error("customer is not eligible for document type {0}")]
    CustomerIneligibleForDocumentType(String),

    /// A line carries a tax class the document type may not legally carry.
    #[error("tax class {tax_class} is not allowed for document type {document_type}")]
    TaxClassNotAllowedForDocumentType {
        document_type: String,
        tax_class: String,
    },

    /// Line quantity must be positive (at most 3 decimal places).
    #[error("invalid line quantity: {0}")]
    InvalidLineQuantity(String),

    /// Discount percentage must lie in [0, 100].
    #[error("invalid discount: {0}")]
    InvalidDiscount(String),

    /// An invoice must have at least one line.
    #[error("invoice has no lines")]
    EmptyLineSet,

    // -- exhaustion/expiration (fatal until administrative action) --
    /// Every sequence for the document type is exhausted, expired or
    /// inactive. Not retryable: a new range must be registered.
    #[error("no eligible numbering sequence for document type {0}")]
    NoEligibleSequence(String),

    // -- contention (transient, retryable with backoff) --
    /// Lock acquisition on a sequence timed out.
    #[error("numbering sequence contended: {0}")]
    SequenceContended(String),

    // -- lifecycle --
    /// `compose` was called on an invoice that already carries a number.
    #[error("invoice is already issued")]
    AlreadyIssued,

    /// A status transition not permitted by the invoice state machine.
    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    // -- collaborators --
    /// The external taxpayer registry could not be reached; eligibility
    /// fails closed rather than assuming the customer qualifies.
    #[error("eligibility check unavailable: {0}")]
    EligibilityCheckUnavailable(String),

    /// The persistence collaborator failed; any in-memory cursor advance
    /// must have been rolled back before this surfaces.
    #[error("sequence store failure: {0}")]
    Store(String),

    // -- programmer errors --
    /// A domain invariant was violated (e.g. an issue past range end).
    /// Indicates a concurrency bug; issuance on the affected sequence halts.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A value failed validation (malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,
}

impl FiscalError {
    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    pub fn overlapping_range(msg: impl Into<String>) -> Self {
        Self::OverlappingRange(msg.into())
    }

    pub fn contended(msg: impl Into<String>) -> Self {
        Self::SequenceContended(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    /// Whether retrying the same call may succeed without any correction.
    ///
    /// Only lock contention qualifies; exhaustion in particular must never
    /// be retried in a loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SequenceContended(_))
    }

    /// Whether this error indicates bad administrative setup and should be
    /// surfaced to an operator rather than an end customer.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRange(_)
                | Self::OverlappingRange(_)
                | Self::UnknownTaxClass(_)
                | Self::UnknownDocumentType(_)
        )
    }

    /// Whether the caller can recover by correcting the invoice draft.
    pub fn is_eligibility(&self) -> bool {
        matches!(
            self,
            Self::CustomerIneligibleForDocumentType(_)
                | Self::TaxClassNotAllowedForDocumentType { .. }
                | Self::InvalidLineQuantity(_)
                | Self::InvalidDiscount(_)
                | Self::EmptyLineSet
        )
    }
}
