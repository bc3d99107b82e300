//! The invoice compositor: eligibility checks, totals, and number issuance
//! as one atomic step.

use chrono::NaiveDate;
use tracing::debug;

use fiscalerp_core::{Entity, FiscalError, FiscalResult};
use fiscalerp_fiscal::{DocumentTypeRegistry, TaxRuleTable, TaxpayerRegistry};
use fiscalerp_numbering::{NcfNumber, SequenceAllocator, SequenceStore};

use crate::invoice::{Invoice, InvoiceStatus};

/// Orchestrates `draft → issued`.
///
/// Ordering is the whole point: every check that can fail runs *before* the
/// allocator is touched, so a failed composition never consumes a number and
/// the draft is left exactly as it was. The allocator call itself is
/// all-or-nothing (see `SequenceAllocator::issue_next`), so there is no
/// partial state in either direction.
pub struct InvoiceCompositor<'a, S: SequenceStore> {
    taxes: &'a TaxRuleTable,
    document_types: &'a DocumentTypeRegistry,
    allocator: &'a SequenceAllocator<S>,
    taxpayers: &'a dyn TaxpayerRegistry,
}

impl<'a, S: SequenceStore> InvoiceCompositor<'a, S> {
    pub fn new(
        taxes: &'a TaxRuleTable,
        document_types: &'a DocumentTypeRegistry,
        allocator: &'a SequenceAllocator<S>,
        taxpayers: &'a dyn TaxpayerRegistry,
    ) -> Self {
        Self {
            taxes,
            document_types,
            allocator,
            taxpayers,
        }
    }

    /// Compose the draft: validate, total, number, freeze.
    ///
    /// On any failure the invoice remains a draft with no number consumed.
    pub fn compose(&self, invoice: &mut Invoice, as_of: NaiveDate) -> FiscalResult<NcfNumber> {
        if invoice.status() != InvoiceStatus::Draft {
            return Err(FiscalError::AlreadyIssued);
        }

        let rule = self.document_types.get(invoice.document_type())?;

        if rule.requires_taxpayer_id {
            let rnc = invoice.customer().rnc().ok_or_else(|| {
                FiscalError::CustomerIneligibleForDocumentType(
                    invoice.document_type().to_string(),
                )
            })?;
            // An unreachable registry propagates EligibilityCheckUnavailable:
            // composition fails closed rather than assuming eligibility.
            if !self.taxpayers.verify(rnc)? {
                return Err(FiscalError::CustomerIneligibleForDocumentType(
                    invoice.document_type().to_string(),
                ));
            }
        }

        for line in invoice.lines() {
            if !rule.allowed_tax_classes.contains(&line.tax_class) {
                return Err(FiscalError::TaxClassNotAllowedForDocumentType {
                    document_type: invoice.document_type().to_string(),
                    tax_class: line.tax_class.to_string(),
                });
            }
        }

        // Totals must be computable before a number is consumed.
        let totals = invoice.preview_totals(self.taxes)?;

        let ncf = self.allocator.issue_next(invoice.document_type(), as_of)?;
        invoice.seal_issued(ncf.clone(), totals, as_of)?;

        debug!(
            invoice = %invoice.id(),
            ncf = %ncf,
            grand_total = %invoice.totals().map(|t| t.grand_total).unwrap_or_default(),
            "invoice composed"
        );
        Ok(ncf)
    }
}
