//! The invoice state machine.
//!
//! `draft → issued → partially-paid/paid`, with `overdue` as a reversible
//! overlay past the due date and `cancelled` reachable from `issued` only.
//! A draft owns mutable lines and nothing else; everything becomes immutable
//! at composition.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fiscalerp_core::{CurrencyCode, Entity, FiscalError, FiscalResult, InvoiceId};
use fiscalerp_fiscal::{DocumentTypeCode, TaxRuleTable};
use fiscalerp_numbering::NcfNumber;
use fiscalerp_parties::Customer;

use crate::totals::{InvoiceLine, InvoiceTotals, compute_totals};

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

/// Payment terms; determine the due date at composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentTerms {
    /// Due on the issue date.
    Cash,
    /// Due N days after the issue date.
    NetDays(u16),
}

impl PaymentTerms {
    pub fn due_date(&self, issued_on: NaiveDate) -> NaiveDate {
        match self {
            PaymentTerms::Cash => issued_on,
            PaymentTerms::NetDays(days) => issued_on
                .checked_add_days(Days::new(u64::from(*days)))
                .unwrap_or(issued_on),
        }
    }
}

/// An invoice through its whole lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    document_type: DocumentTypeCode,
    customer: Customer,
    currency: CurrencyCode,
    exchange_rate: Decimal,
    payment_terms: PaymentTerms,
    lines: Vec<InvoiceLine>,
    status: InvoiceStatus,
    ncf: Option<NcfNumber>,
    totals: Option<InvoiceTotals>,
    issued_on: Option<NaiveDate>,
    due_on: Option<NaiveDate>,
    amount_paid: Decimal,
}

impl Invoice {
    /// Start a draft. Exchange rate is to the base currency (1 for DOP).
    pub fn draft(
        id: InvoiceId,
        document_type: DocumentTypeCode,
        customer: Customer,
        currency: CurrencyCode,
        exchange_rate: Decimal,
        payment_terms: PaymentTerms,
    ) -> FiscalResult<Self> {
        if exchange_rate <= Decimal::ZERO {
            return Err(FiscalError::validation(format!(
                "exchange rate must be positive, got {exchange_rate}"
            )));
        }
        Ok(Self {
            id,
            document_type,
            customer,
            currency,
            exchange_rate,
            payment_terms,
            lines: Vec::new(),
            status: InvoiceStatus::Draft,
            ncf: None,
            totals: None,
            issued_on: None,
            due_on: None,
            amount_paid: Decimal::ZERO,
        })
    }

    pub fn document_type(&self) -> &DocumentTypeCode {
        &self.document_type
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    /// The assigned fiscal number, once issued. Survives cancellation.
    pub fn ncf(&self) -> Option<&NcfNumber> {
        self.ncf.as_ref()
    }

    /// Frozen totals, once issued.
    pub fn totals(&self) -> Option<&InvoiceTotals> {
        self.totals.as_ref()
    }

    pub fn due_on(&self) -> Option<NaiveDate> {
        self.due_on
    }

    pub fn amount_paid(&self) -> Decimal {
        self.amount_paid
    }

    pub fn is_modifiable(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    /// Append a line to the draft. Line values are validated at
    /// composition, not here, so a work-in-progress draft can hold anything.
    pub fn add_line(&mut self, line: InvoiceLine) -> FiscalResult<()> {
        self.ensure_draft()?;
        self.lines.push(line);
        Ok(())
    }

    /// Remove a draft line by position.
    pub fn remove_line(&mut self, index: usize) -> FiscalResult<InvoiceLine> {
        self.ensure_draft()?;
        if index >= self.lines.len() {
            return Err(FiscalError::NotFound);
        }
        Ok(self.lines.remove(index))
    }

    /// Current totals of the draft, recomputed from the lines (never cached
    /// stale). After composition the frozen totals are authoritative.
    pub fn preview_totals(&self, taxes: &TaxRuleTable) -> FiscalResult<InvoiceTotals> {
        compute_totals(
            &self.lines,
            taxes,
            self.currency.clone(),
            self.exchange_rate,
        )
    }

    /// Transition `draft → issued`, freezing lines, totals, and number.
    /// Only the compositor calls this, after all checks have passed.
    pub(crate) fn seal_issued(
        &mut self,
        ncf: NcfNumber,
        totals: InvoiceTotals,
        issued_on: NaiveDate,
    ) -> FiscalResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(FiscalError::AlreadyIssued);
        }
        self.due_on = Some(self.payment_terms.due_date(issued_on));
        self.issued_on = Some(issued_on);
        self.ncf = Some(ncf);
        self.totals = Some(totals);
        self.status = InvoiceStatus::Issued;
        Ok(())
    }

    fn grand_total(&self) -> FiscalResult<Decimal> {
        self.totals
            .as_ref()
            .map(|t| t.grand_total)
            .ok_or_else(|| FiscalError::transition("invoice has no frozen totals"))
    }

    /// Record a payment against an issued invoice.
    ///
    /// Cumulative payments below the grand total leave the invoice
    /// partially paid; reaching it marks the invoice paid. Overpaying is
    /// rejected. Paying also clears an overdue marker (the payment is what
    /// the marker was nagging about).
    pub fn record_payment(&mut self, amount: Decimal, _on: NaiveDate) -> FiscalResult<()> {
        match self.status {
            InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue => {}
            InvoiceStatus::Draft => {
                return Err(FiscalError::transition("cannot pay an unissued draft"));
            }
            InvoiceStatus::Paid => {
                return Err(FiscalError::transition("invoice is already paid in full"));
            }
            InvoiceStatus::Cancelled => {
                return Err(FiscalError::transition("cannot pay a cancelled invoice"));
            }
        }
        if amount <= Decimal::ZERO {
            return Err(FiscalError::validation("payment amount must be positive"));
        }

        let total = self.grand_total()?;
        let new_paid = self.amount_paid + amount;
        if new_paid > total {
            return Err(FiscalError::invariant(format!(
                "cannot overpay invoice: {new_paid} > {total}"
            )));
        }

        self.amount_paid = new_paid;
        self.status = if new_paid >= total {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        };
        Ok(())
    }

    /// Flip an unpaid invoice past its due date to overdue. Returns whether
    /// the status changed. Reversible: the next payment moves the invoice
    /// back into the paid track.
    pub fn refresh_overdue(&mut self, as_of: NaiveDate) -> bool {
        let past_due = matches!(
            (self.status, self.due_on),
            (
                InvoiceStatus::Issued | InvoiceStatus::PartiallyPaid,
                Some(due)
            ) if as_of > due
        );
        if past_due {
            self.status = InvoiceStatus::Overdue;
        }
        past_due
    }

    /// Cancel an issued invoice. The fiscal number stays with it for the
    /// audit trail; a corrective document gets a fresh number.
    pub fn cancel(&mut self) -> FiscalResult<()> {
        if self.status != InvoiceStatus::Issued {
            return Err(FiscalError::transition(format!(
                "only an issued invoice can be cancelled, status is {:?}",
                self.status
            )));
        }
        self.status = InvoiceStatus::Cancelled;
        Ok(())
    }

    fn ensure_draft(&self) -> FiscalResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(FiscalError::transition(
                "lines are frozen once the invoice is issued",
            ));
        }
        Ok(())
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
