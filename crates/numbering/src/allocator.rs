//! The sequence allocator service.
//!
//! Owns a process-wide read-through cache of sequences (hydrated from the
//! [`SequenceStore`], explicitly reloadable after administrative mutation)
//! and serializes every cursor read-increment-write behind a per-sequence
//! mutex. Lock acquisition is bounded: a timeout surfaces as the retryable
//! `SequenceContended` instead of deadlocking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, warn};

use fiscalerp_core::{Entity, FiscalError, FiscalResult, SequenceId};
use fiscalerp_fiscal::DocumentTypeCode;

use crate::ncf::NcfNumber;
use crate::sequence::NumberSequence;
use crate::store::SequenceStore;

/// How long `issue_next` may wait on a sequence lock before reporting
/// contention.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Horizon for the proactive "range is about to expire" warning.
const EXPIRY_WARN_HORIZON_DAYS: u32 = 30;

type Slot = Arc<Mutex<NumberSequence>>;

/// Cache entry; `id` and `range_start` are duplicated out of the mutex
/// because they are immutable and must be readable without the slot lock
/// (`range_start` drives the deterministic selection order).
struct SlotEntry {
    id: SequenceId,
    range_start: u64,
    slot: Slot,
}

#[derive(Default)]
struct Cache {
    by_type: HashMap<DocumentTypeCode, Vec<SlotEntry>>,
    by_id: HashMap<SequenceId, Slot>,
}

/// Issues NCF numbers from the eligible sequence of each document type.
pub struct SequenceAllocator<S: SequenceStore> {
    store: S,
    cache: RwLock<Cache>,
    lock_timeout: Duration,
}

impl<S: SequenceStore> SequenceAllocator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: RwLock::new(Cache::default()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override the bounded lock wait (tests use a short timeout).
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Issue the next number for `document_type` as of `as_of`.
    ///
    /// Candidates are {active, unexpired, cursor ≤ range_end}; the one with
    /// the lowest `range_start` wins. The cursor advance is persisted before
    /// the number is returned: if the store rejects the save, the in-memory
    /// cursor stays untouched and no number is considered issued.
    pub fn issue_next(
        &self,
        document_type: &DocumentTypeCode,
        as_of: NaiveDate,
    ) -> FiscalResult<NcfNumber> {
        self.ensure_loaded(document_type)?;

        let slots = {
            let cache = self.read_cache()?;
            cache
                .by_type
                .get(document_type)
                .map(|entries| entries.iter().map(|e| Arc::clone(&e.slot)).collect())
                .unwrap_or_else(Vec::new)
        };

        for slot in slots {
            let mut guard = self.lock_slot(&slot)?;
            if !guard.is_eligible(as_of) {
                continue;
            }

            // Work on a copy so a failed save leaves the shared cursor as it
            // was: the increment either fully completes or never happened.
            let mut updated = guard.clone();
            let ncf = match updated.take_next(as_of, Utc::now()) {
                Ok(ncf) => ncf,
                Err(err) => {
                    // A tripped defensive check means the cursor is corrupt;
                    // the sequence has halted itself. Persist the halt.
                    error!(sequence = %updated.id(), %err, "sequence issuance halted");
                    if let Err(save_err) = self.store.save_sequence(&updated) {
                        error!(sequence = %updated.id(), %save_err, "failed to persist halted sequence");
                    }
                    *guard = updated;
                    return Err(err);
                }
            };

            self.store.save_sequence(&updated)?;
            *guard = updated;

            if guard.is_exhausted() {
                warn!(
                    sequence = %guard.id(),
                    document_type = %document_type,
                    "sequence issued its last number; register a new range"
                );
            } else if guard.is_expiring_soon(as_of, EXPIRY_WARN_HORIZON_DAYS) {
                warn!(
                    sequence = %guard.id(),
                    expires_on = %guard.expires_on(),
                    remaining = guard.remaining_capacity(),
                    "sequence expires soon"
                );
            }
            debug!(ncf = %ncf, document_type = %document_type, "issued fiscal number");
            return Ok(ncf);
        }

        warn!(
            document_type = %document_type,
            "no eligible sequence; administrative action required"
        );
        Err(FiscalError::NoEligibleSequence(document_type.to_string()))
    }

    /// Register a new authorized range.
    ///
    /// Rejects degenerate ranges (`InvalidRange`) and ranges intersecting an
    /// existing active range for the same document type and series
    /// (`OverlappingRange`). The sequence is persisted before it becomes
    /// visible to issuance.
    pub fn register_sequence(
        &self,
        document_type: DocumentTypeCode,
        series: u16,
        range_start: u64,
        range_end: u64,
        expires_on: NaiveDate,
    ) -> FiscalResult<NumberSequence> {
        self.ensure_loaded(&document_type)?;

        let sequence = NumberSequence::new(
            SequenceId::new(),
            document_type.clone(),
            series,
            range_start,
            range_end,
            expires_on,
        )?;

        // Overlap check and insertion happen under one cache write lock:
        // two racing registrations of intersecting ranges must serialize,
        // or both would pass the check.
        let mut cache = self.write_cache()?;
        if let Some(entries) = cache.by_type.get(&document_type) {
            for entry in entries {
                let existing = self.lock_slot(&entry.slot)?;
                if existing.is_active()
                    && existing.series() == series
                    && existing.overlaps(range_start, range_end)
                {
                    return Err(FiscalError::overlapping_range(format!(
                        "[{range_start}, {range_end}] intersects active range [{}, {}] \
                         of sequence {}",
                        existing.range_start(),
                        existing.range_end(),
                        existing.id()
                    )));
                }
            }
        }

        self.store.save_sequence(&sequence)?;
        Self::insert_slot(&mut cache, sequence.clone());
        debug!(
            sequence = %sequence.id(),
            document_type = %document_type,
            range_start,
            range_end,
            "registered numbering sequence"
        );
        Ok(sequence)
    }

    /// Numbers left in a sequence; zero means exhausted.
    pub fn remaining_capacity(&self, sequence_id: SequenceId) -> FiscalResult<u64> {
        let slot = self.slot_by_id(sequence_id)?;
        Ok(self.lock_slot(&slot)?.remaining_capacity())
    }

    /// Whether the sequence expires within `horizon_days` of `as_of`.
    pub fn is_expiring_soon(
        &self,
        sequence_id: SequenceId,
        as_of: NaiveDate,
        horizon_days: u32,
    ) -> FiscalResult<bool> {
        let slot = self.slot_by_id(sequence_id)?;
        Ok(self.lock_slot(&slot)?.is_expiring_soon(as_of, horizon_days))
    }

    /// Retire a sequence. It keeps existing issued numbers but never issues
    /// again; sequences are never deleted once referenced.
    pub fn deactivate(&self, sequence_id: SequenceId) -> FiscalResult<()> {
        let slot = self.slot_by_id(sequence_id)?;
        let mut guard = self.lock_slot(&slot)?;
        let mut updated = guard.clone();
        updated.deactivate();
        self.store.save_sequence(&updated)?;
        *guard = updated;
        debug!(sequence = %sequence_id, "sequence deactivated");
        Ok(())
    }

    /// Point-in-time copy of a sequence (admin screens, tests).
    pub fn snapshot(&self, sequence_id: SequenceId) -> FiscalResult<NumberSequence> {
        let slot = self.slot_by_id(sequence_id)?;
        Ok(self.lock_slot(&slot)?.clone())
    }

    /// Rehydrate the cached sequences for a document type from the store.
    /// Called after administrative mutation outside this process; the cache
    /// is never allowed to go silently stale during issuance.
    ///
    /// A sequence already cached keeps its mutex and is refreshed in place:
    /// replacing a live slot with a fresh one would hand an in-flight
    /// issuance and the next caller independent cursors for the same range.
    /// Every live lock is acquired before the maps are touched, so on any
    /// failure (a busy sequence, a store error) the cache stays exactly as
    /// it was and the caller retries.
    pub fn reload(&self, document_type: &DocumentTypeCode) -> FiscalResult<()> {
        let mut sequences = self.store.load_sequences(document_type)?;
        sequences.sort_by_key(NumberSequence::range_start);

        let mut cache = self.write_cache()?;

        let slots: Vec<Option<Slot>> = sequences
            .iter()
            .map(|s| cache.by_id.get(s.id()).map(Arc::clone))
            .collect();

        let mut guards = Vec::with_capacity(slots.len());
        for slot in &slots {
            guards.push(match slot {
                Some(slot) => Some(self.lock_slot(slot)?),
                None => None,
            });
        }

        let mut entries = Vec::with_capacity(sequences.len());
        for ((sequence, slot), guard) in sequences.iter().zip(&slots).zip(guards.iter_mut()) {
            let slot = match (slot, guard) {
                (Some(slot), Some(guard)) => {
                    **guard = sequence.clone();
                    Arc::clone(slot)
                }
                _ => {
                    let fresh: Slot = Arc::new(Mutex::new(sequence.clone()));
                    cache.by_id.insert(*sequence.id(), Arc::clone(&fresh));
                    fresh
                }
            };
            entries.push(SlotEntry {
                id: *sequence.id(),
                range_start: sequence.range_start(),
                slot,
            });
        }

        if let Some(old) = cache.by_type.remove(document_type) {
            for stale in old {
                if !entries.iter().any(|e| e.id == stale.id) {
                    cache.by_id.remove(&stale.id);
                }
            }
        }
        cache.by_type.insert(document_type.clone(), entries);
        Ok(())
    }

    fn ensure_loaded(&self, document_type: &DocumentTypeCode) -> FiscalResult<()> {
        if self.read_cache()?.by_type.contains_key(document_type) {
            return Ok(());
        }
        // Racing loaders are harmless: reload replaces atomically.
        self.reload(document_type)
    }

    fn insert_slot(cache: &mut Cache, sequence: NumberSequence) {
        let slot: Slot = Arc::new(Mutex::new(sequence.clone()));
        cache.by_id.insert(*sequence.id(), Arc::clone(&slot));
        let entries = cache
            .by_type
            .entry(sequence.document_type().clone())
            .or_default();
        let at = entries
            .binary_search_by_key(&sequence.range_start(), |e| e.range_start)
            .unwrap_or_else(|i| i);
        entries.insert(
            at,
            SlotEntry {
                id: *sequence.id(),
                range_start: sequence.range_start(),
                slot,
            },
        );
    }

    fn slot_by_id(&self, sequence_id: SequenceId) -> FiscalResult<Slot> {
        self.read_cache()?
            .by_id
            .get(&sequence_id)
            .map(Arc::clone)
            .ok_or(FiscalError::NotFound)
    }

    /// Bounded lock acquisition: spin on `try_lock` until the deadline, then
    /// report contention so the caller can retry with backoff.
    fn lock_slot<'a>(&self, slot: &'a Slot) -> FiscalResult<MutexGuard<'a, NumberSequence>> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match slot.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => {
                    return Err(FiscalError::invariant("sequence lock poisoned"));
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(FiscalError::contended(format!(
                            "sequence lock not acquired within {:?}",
                            self.lock_timeout
                        )));
                    }
                    std::thread::yield_now();
                }
            }
        }
    }

    fn read_cache(&self) -> FiscalResult<std::sync::RwLockReadGuard<'_, Cache>> {
        self.cache
            .read()
            .map_err(|_| FiscalError::invariant("allocator cache lock poisoned"))
    }

    fn write_cache(&self) -> FiscalResult<std::sync::RwLockWriteGuard<'_, Cache>> {
        self.cache
            .write()
            .map_err(|_| FiscalError::invariant("allocator cache lock poisoned"))
    }
}
