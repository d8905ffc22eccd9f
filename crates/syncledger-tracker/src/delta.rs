//! Per-checkpoint delta accounting.
//!
//! Records emitted by the source are buffered per stream until the source
//! emits a checkpoint. The buffered deltas are then frozen into a snapshot
//! keyed by the checkpoint's index. When the destination acknowledges a
//! checkpoint, every pending snapshot up to and including it is folded into
//! the committed totals in ascending order.
//!
//! Any inconsistency (memory ceiling hit, acknowledgement of an unknown
//! checkpoint) moves the tracker to [`TrackerHealth::Failed`] for good.
//! From then on committed totals are unavailable rather than possibly wrong.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, TrackerError};
use crate::memory::{snapshot_cost, MemoryGuard};
use crate::registry::StreamIndex;

/// SHA-256 digest of a checkpoint payload.
pub type Fingerprint = [u8; 32];

/// Locally assigned sequence number of a source checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckpointIndex(u64);

impl CheckpointIndex {
    #[must_use]
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for CheckpointIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record and byte counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsCounters {
    pub records: u64,
    pub bytes: u64,
}

impl StatsCounters {
    #[must_use]
    pub fn new(records: u64, bytes: u64) -> Self {
        Self { records, bytes }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.records == 0 && self.bytes == 0
    }

    /// Count one record of `bytes` size.
    pub fn add_record(&mut self, bytes: u64) {
        self.records = self.records.saturating_add(1);
        self.bytes = self.bytes.saturating_add(bytes);
    }

    pub fn merge(&mut self, other: StatsCounters) {
        self.records = self.records.saturating_add(other.records);
        self.bytes = self.bytes.saturating_add(other.bytes);
    }
}

/// Whether committed totals can still be trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackerHealth {
    #[default]
    Healthy,
    Failed,
}

#[derive(Debug)]
struct Snapshot {
    deltas: BTreeMap<StreamIndex, StatsCounters>,
    fingerprint: Option<Fingerprint>,
    cost: u64,
}

/// Buffers deltas, stores snapshots, and folds acknowledged ones.
#[derive(Debug)]
pub struct DeltaTracker {
    guard: MemoryGuard,
    buckets: Vec<StatsCounters>,
    pending: BTreeMap<CheckpointIndex, Snapshot>,
    committed: Vec<StatsCounters>,
    last_added: Option<CheckpointIndex>,
    committed_through: Option<CheckpointIndex>,
    health: TrackerHealth,
}

impl DeltaTracker {
    #[must_use]
    pub fn new(max_pending_state_bytes: u64) -> Self {
        Self {
            guard: MemoryGuard::new(max_pending_state_bytes),
            buckets: Vec::new(),
            pending: BTreeMap::new(),
            committed: Vec::new(),
            last_added: None,
            committed_through: None,
            health: TrackerHealth::Healthy,
        }
    }

    #[must_use]
    pub fn health(&self) -> TrackerHealth {
        self.health
    }

    /// Add one emitted record to the stream's current bucket.
    pub fn record(&mut self, stream: StreamIndex, bytes: u64) {
        if self.health == TrackerHealth::Failed {
            return;
        }
        let slot = stream.as_usize();
        if self.buckets.len() <= slot {
            self.buckets.resize(slot + 1, StatsCounters::default());
        }
        self.buckets[slot].add_record(bytes);
    }

    /// Freeze the current buckets as the snapshot for `index` and zero them.
    ///
    /// Buckets are zeroed whether or not the snapshot is accepted.
    ///
    /// # Errors
    ///
    /// Propagates [`add_state`](Self::add_state) failures; the tracker is
    /// failed by then.
    pub fn checkpoint(
        &mut self,
        index: CheckpointIndex,
        fingerprint: Option<Fingerprint>,
    ) -> Result<()> {
        if self.health == TrackerHealth::Failed {
            return Ok(());
        }
        let deltas = self.take_buckets();
        self.insert(index, deltas, fingerprint)
    }

    /// Store a snapshot of per-stream deltas under `index`.
    ///
    /// No-op once failed.
    ///
    /// # Errors
    ///
    /// [`TrackerError::CapacityExceeded`] if the snapshot does not fit in
    /// the memory budget, [`TrackerError::OutOfOrderCheckpoint`] if `index`
    /// is not above the last added index. Both fail the tracker.
    pub fn add_state(
        &mut self,
        index: CheckpointIndex,
        deltas: BTreeMap<StreamIndex, StatsCounters>,
    ) -> Result<()> {
        if self.health == TrackerHealth::Failed {
            return Ok(());
        }
        self.insert(index, deltas, None)
    }

    fn insert(
        &mut self,
        index: CheckpointIndex,
        deltas: BTreeMap<StreamIndex, StatsCounters>,
        fingerprint: Option<Fingerprint>,
    ) -> Result<()> {
        if let Some(last) = self.last_added {
            if index <= last {
                return Err(self.fail(TrackerError::OutOfOrderCheckpoint { index, last }));
            }
        }
        let cost = snapshot_cost(deltas.len());
        if let Err(err) = self.guard.reserve(index, cost) {
            return Err(self.fail(err));
        }
        self.pending.insert(
            index,
            Snapshot {
                deltas,
                fingerprint,
                cost,
            },
        );
        self.last_added = Some(index);
        Ok(())
    }

    /// Acknowledge checkpoint `index`, warning if its payload differs from
    /// what the source emitted under that index.
    ///
    /// # Errors
    ///
    /// Same as [`commit_up_to`](Self::commit_up_to).
    pub fn acknowledge(&mut self, index: CheckpointIndex, fingerprint: &Fingerprint) -> Result<()> {
        if self.health == TrackerHealth::Failed {
            return Ok(());
        }
        if let Some(expected) = self.pending.get(&index).and_then(|s| s.fingerprint.as_ref()) {
            if expected != fingerprint {
                tracing::warn!(
                    checkpoint = index.get(),
                    "Destination checkpoint payload differs from the source checkpoint at the same position"
                );
            }
        }
        self.commit_up_to(index)
    }

    /// Fold every pending snapshot with index `<= index` into the committed
    /// totals, lowest index first.
    ///
    /// Acknowledging an index at or below one already folded is a no-op.
    /// No-op once failed.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownCheckpoint`] if `index` is neither pending nor
    /// covered by an earlier fold; this fails the tracker.
    pub fn commit_up_to(&mut self, index: CheckpointIndex) -> Result<()> {
        if self.health == TrackerHealth::Failed {
            return Ok(());
        }
        if !self.pending.contains_key(&index) {
            if self.committed_through.is_some_and(|done| index <= done) {
                return Ok(());
            }
            return Err(self.fail(TrackerError::UnknownCheckpoint(index)));
        }

        let still_pending = self.pending.split_off(&index.next());
        let ready = std::mem::replace(&mut self.pending, still_pending);
        for (_, snapshot) in ready {
            for (stream, delta) in snapshot.deltas {
                let slot = stream.as_usize();
                if self.committed.len() <= slot {
                    self.committed.resize(slot + 1, StatsCounters::default());
                }
                self.committed[slot].merge(delta);
            }
            self.guard.release(snapshot.cost);
        }
        self.committed_through = Some(index);
        Ok(())
    }

    /// Committed totals indexed by [`StreamIndex`], or `None` once failed.
    ///
    /// Streams beyond the end of the slice have nothing committed.
    #[must_use]
    pub fn committed(&self) -> Option<&[StatsCounters]> {
        match self.health {
            TrackerHealth::Healthy => Some(&self.committed),
            TrackerHealth::Failed => None,
        }
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryGuard {
        &self.guard
    }

    /// Fail the tracker from outside, e.g. after a panic interrupted a fold.
    pub fn mark_failed(&mut self) {
        self.health = TrackerHealth::Failed;
        self.drop_accounting();
    }

    fn take_buckets(&mut self) -> BTreeMap<StreamIndex, StatsCounters> {
        let mut deltas = BTreeMap::new();
        for (slot, bucket) in self.buckets.iter_mut().enumerate() {
            if !bucket.is_zero() {
                deltas.insert(StreamIndex::from_usize(slot), std::mem::take(bucket));
            }
        }
        deltas
    }

    fn fail(&mut self, err: TrackerError) -> TrackerError {
        self.mark_failed();
        err
    }

    fn drop_accounting(&mut self) {
        self.buckets = Vec::new();
        self.pending.clear();
        self.committed = Vec::new();
        self.guard.clear();
    }
}
