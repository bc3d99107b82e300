//! Issued fiscal number (NCF) value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fiscalerp_core::{SequenceId, ValueObject};
use fiscalerp_fiscal::DocumentTypeCode;

/// A formatted, issued fiscal identifier.
///
/// Created exactly once per successful allocation and never reused: voiding
/// the owning invoice does not release the number (the audit trail keeps it;
/// only a new corrective document gets a new number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NcfNumber {
    formatted: String,
    sequence_id: SequenceId,
    number: u64,
    issued_at: DateTime<Utc>,
}

impl NcfNumber {
    /// Format is `{type}{series:03}{number:08}`, e.g. `B0100100000042`.
    pub(crate) fn new(
        document_type: &DocumentTypeCode,
        series: u16,
        number: u64,
        sequence_id: SequenceId,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            formatted: format!("{document_type}{series:03}{number:08}"),
            sequence_id,
            number,
            issued_at,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.formatted
    }

    pub fn sequence_id(&self) -> SequenceId {
        self.sequence_id
    }

    /// The raw numeric part (the cursor value the number was minted from).
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl ValueObject for NcfNumber {}

impl core::fmt::Display for NcfNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_type_series_and_zero_padded_number() {
        let doc = DocumentTypeCode::new("B01").unwrap();
        let ncf = NcfNumber::new(&doc, 1, 42, SequenceId::new(), Utc::now());
        assert_eq!(ncf.as_str(), "B0100100000042");
        assert_eq!(ncf.number(), 42);
    }

    #[test]
    fn wide_series_and_number_keep_fixed_width() {
        let doc = DocumentTypeCode::new("B02").unwrap();
        let ncf = NcfNumber::new(&doc, 999, 99_999_999, SequenceId::new(), Utc::now());
        assert_eq!(ncf.as_str(), "B0299999999999");
        assert_eq!(ncf.as_str().len(), 14);
    }
}
