//! Persistence collaborator for numbering sequences.

use std::collections::HashMap;
use std::sync::RwLock;

use fiscalerp_core::{Entity, FiscalError, FiscalResult, SequenceId};
use fiscalerp_fiscal::DocumentTypeCode;

use crate::sequence::NumberSequence;

/// Black-box persistence for sequences.
///
/// `save_sequence` is expected to be atomic per sequence: the allocator
/// persists an advanced cursor through it *before* handing the issued number
/// to the caller, so a crash in between never double-issues.
pub trait SequenceStore: Send + Sync {
    fn load_sequences(
        &self,
        document_type: &DocumentTypeCode,
    ) -> FiscalResult<Vec<NumberSequence>>;

    fn save_sequence(&self, sequence: &NumberSequence) -> FiscalResult<()>;
}

/// In-memory sequence store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    rows: RwLock<HashMap<SequenceId, NumberSequence>>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current persisted snapshot of one sequence (test observation point).
    pub fn get(&self, id: SequenceId) -> FiscalResult<Option<NumberSequence>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| FiscalError::store("lock poisoned"))?;
        Ok(rows.get(&id).cloned())
    }
}

impl SequenceStore for InMemorySequenceStore {
    fn load_sequences(
        &self,
        document_type: &DocumentTypeCode,
    ) -> FiscalResult<Vec<NumberSequence>> {
        let rows = self
            .rows
            .read()
            .map_err(|_| FiscalError::store("lock poisoned"))?;
        Ok(rows
            .values()
            .filter(|s| s.document_type() == document_type)
            .cloned()
            .collect())
    }

    fn save_sequence(&self, sequence: &NumberSequence) -> FiscalResult<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| FiscalError::store("lock poisoned"))?;
        rows.insert(*sequence.id(), sequence.clone());
        Ok(())
    }
}
