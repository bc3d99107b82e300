//! One allocatable NCF range and its cursor invariants.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fiscalerp_core::{Entity, FiscalError, FiscalResult, SequenceId};
use fiscalerp_fiscal::DocumentTypeCode;

use crate::ncf::NcfNumber;

/// Largest numeric part representable in the 8-digit NCF suffix.
const MAX_NUMBER: u64 = 99_999_999;

/// Largest series label representable in the 3-digit NCF segment.
const MAX_SERIES: u16 = 999;

/// One authorized numbering range for one document type.
///
/// Invariants (enforced here, never by callers):
/// - the cursor never decreases and never exceeds `range_end + 1`;
/// - once `cursor == range_end + 1` the sequence is exhausted and never
///   issues again;
/// - a sequence past its expiration date never issues, even with numbers
///   remaining.
///
/// Sequences referenced by issued numbers are never deleted, only
/// deactivated. The persisted field set below is the minimum needed for
/// crash recovery: the cursor must be durable before an issued number is
/// handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberSequence {
    id: SequenceId,
    document_type: DocumentTypeCode,
    series: u16,
    range_start: u64,
    range_end: u64,
    cursor: u64,
    expires_on: NaiveDate,
    active: bool,
}

impl NumberSequence {
    /// Create a fresh range with `cursor = range_start` (batch setup by an
    /// administrator).
    pub fn new(
        id: SequenceId,
        document_type: DocumentTypeCode,
        series: u16,
        range_start: u64,
        range_end: u64,
        expires_on: NaiveDate,
    ) -> FiscalResult<Self> {
        if range_start == 0 {
            return Err(FiscalError::invalid_range("range_start must be positive"));
        }
        if range_end <= range_start {
            return Err(FiscalError::invalid_range(format!(
                "range_end {range_end} must exceed range_start {range_start}"
            )));
        }
        if range_end > MAX_NUMBER {
            return Err(FiscalError::invalid_range(format!(
                "range_end {range_end} exceeds the 8-digit NCF number space"
            )));
        }
        if series > MAX_SERIES {
            return Err(FiscalError::invalid_range(format!(
                "series {series} exceeds the 3-digit NCF series space"
            )));
        }
        Ok(Self {
            id,
            document_type,
            series,
            range_start,
            range_end,
            cursor: range_start,
            expires_on,
            active: true,
        })
    }

    pub fn document_type(&self) -> &DocumentTypeCode {
        &self.document_type
    }

    pub fn series(&self) -> u16 {
        self.series
    }

    pub fn range_start(&self) -> u64 {
        self.range_start
    }

    pub fn range_end(&self) -> u64 {
        self.range_end
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn expires_on(&self) -> NaiveDate {
        self.expires_on
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Numbers still available; zero means exhausted.
    pub fn remaining_capacity(&self) -> u64 {
        if self.cursor > self.range_end {
            0
        } else {
            self.range_end - self.cursor + 1
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_capacity() == 0
    }

    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expires_on < as_of
    }

    /// Whether this sequence may issue as of the given date.
    pub fn is_eligible(&self, as_of: NaiveDate) -> bool {
        self.active && !self.is_expired(as_of) && !self.is_exhausted()
    }

    /// Whether the expiration date falls within `horizon_days` of `as_of`.
    /// Callers use this to warn administrators before a range dies.
    pub fn is_expiring_soon(&self, as_of: NaiveDate, horizon_days: u32) -> bool {
        match as_of.checked_add_days(Days::new(u64::from(horizon_days))) {
            Some(horizon) => self.expires_on <= horizon,
            None => false,
        }
    }

    /// Whether `[other_start, other_end]` intersects this range.
    pub fn overlaps(&self, other_start: u64, other_end: u64) -> bool {
        self.range_start <= other_end && other_start <= self.range_end
    }

    /// Retire the sequence. Issued numbers keep referencing it.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Take the next number from the range.
    ///
    /// The caller must hold this sequence's lock and must have checked
    /// eligibility; the checks here are a last line of defense. If one
    /// trips, a concurrency bug has corrupted the cursor and the sequence
    /// halts (deactivates) rather than continue issuing.
    pub(crate) fn take_next(
        &mut self,
        as_of: NaiveDate,
        issued_at: DateTime<Utc>,
    ) -> FiscalResult<NcfNumber> {
        if !self.active {
            return Err(FiscalError::NoEligibleSequence(
                self.document_type.to_string(),
            ));
        }
        if self.cursor > self.range_end {
            self.deactivate();
            return Err(FiscalError::invariant(format!(
                "sequence {} cursor {} past range end {}; issuance halted",
                self.id, self.cursor, self.range_end
            )));
        }
        if self.is_expired(as_of) {
            self.deactivate();
            return Err(FiscalError::invariant(format!(
                "sequence {} selected past expiration {}; issuance halted",
                self.id, self.expires_on
            )));
        }

        let number = self.cursor;
        self.cursor += 1;
        Ok(NcfNumber::new(
            &self.document_type,
            self.series,
            number,
            self.id,
            issued_at,
        ))
    }
}

impl Entity for NumberSequence {
    type Id = SequenceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(s: &str) -> DocumentTypeCode {
        DocumentTypeCode::new(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sequence(start: u64, end: u64, expires: &str) -> NumberSequence {
        NumberSequence::new(SequenceId::new(), doc("B01"), 1, start, end, date(expires)).unwrap()
    }

    #[test]
    fn new_rejects_degenerate_ranges() {
        let d = doc("B01");
        let exp = date("2027-12-31");
        assert!(matches!(
            NumberSequence::new(SequenceId::new(), d.clone(), 1, 10, 10, exp),
            Err(FiscalError::InvalidRange(_))
        ));
        assert!(matches!(
            NumberSequence::new(SequenceId::new(), d.clone(), 1, 10, 5, exp),
            Err(FiscalError::InvalidRange(_))
        ));
        assert!(matches!(
            NumberSequence::new(SequenceId::new(), d.clone(), 1, 0, 5, exp),
            Err(FiscalError::InvalidRange(_))
        ));
        assert!(matches!(
            NumberSequence::new(SequenceId::new(), d, 1000, 1, 5, exp),
            Err(FiscalError::InvalidRange(_))
        ));
    }

    #[test]
    fn capacity_counts_down_to_exhaustion() {
        let mut seq = sequence(1, 3, "2027-12-31");
        let as_of = date("2026-01-01");
        assert_eq!(seq.remaining_capacity(), 3);

        for expected in 1..=3u64 {
            let ncf = seq.take_next(as_of, Utc::now()).unwrap();
            assert_eq!(ncf.number(), expected);
        }
        assert_eq!(seq.remaining_capacity(), 0);
        assert!(seq.is_exhausted());
        assert!(!seq.is_eligible(as_of));
    }

    #[test]
    fn expired_sequence_is_ineligible_even_with_capacity() {
        let seq = sequence(1, 100, "2026-06-30");
        assert!(seq.is_eligible(date("2026-06-30")));
        assert!(!seq.is_eligible(date("2026-07-01")));
        assert_eq!(seq.remaining_capacity(), 100);
    }

    #[test]
    fn issue_past_expiration_halts_the_sequence() {
        let mut seq = sequence(1, 100, "2026-06-30");
        let err = seq.take_next(date("2026-07-01"), Utc::now()).unwrap_err();
        assert!(matches!(err, FiscalError::InvariantViolation(_)));
        assert!(!seq.is_active());
    }

    #[test]
    fn expiring_soon_horizon() {
        let seq = sequence(1, 100, "2026-06-30");
        assert!(seq.is_expiring_soon(date("2026-06-01"), 30));
        assert!(!seq.is_expiring_soon(date("2026-05-01"), 30));
        // Already past expiration still counts as expiring.
        assert!(seq.is_expiring_soon(date("2026-07-15"), 30));
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let seq = sequence(100, 200, "2027-12-31");
        assert!(seq.overlaps(200, 300));
        assert!(seq.overlaps(50, 100));
        assert!(seq.overlaps(150, 160));
        assert!(!seq.overlaps(201, 300));
        assert!(!seq.overlaps(1, 99));
    }
}
