//! Byte budget for checkpoint snapshots awaiting acknowledgement.
//!
//! When the destination acknowledges far slower than the source emits,
//! pending snapshots pile up. [`MemoryGuard`] keeps an approximate tally
//! of what they retain and refuses new snapshots past a fixed ceiling.

use std::mem::size_of;

use crate::delta::{CheckpointIndex, Fingerprint, StatsCounters};
use crate::error::{Result, TrackerError};
use crate::registry::StreamIndex;

/// Default ceiling for pending snapshot bytes (10 MiB).
pub const DEFAULT_MAX_PENDING_STATE_BYTES: u64 = 10 * 1024 * 1024;

/// Fixed cost of one snapshot: its index key plus payload fingerprint.
pub const SNAPSHOT_HEADER_BYTES: u64 =
    (size_of::<CheckpointIndex>() + size_of::<Fingerprint>()) as u64;

/// Cost of one per-stream entry inside a snapshot.
pub const SNAPSHOT_ENTRY_BYTES: u64 =
    (size_of::<StreamIndex>() + size_of::<StatsCounters>()) as u64;

/// Approximate retained size of a snapshot with `entries` stream deltas.
#[must_use]
pub fn snapshot_cost(entries: usize) -> u64 {
    SNAPSHOT_HEADER_BYTES.saturating_add((entries as u64).saturating_mul(SNAPSHOT_ENTRY_BYTES))
}

/// Tracks bytes held by pending snapshots against a ceiling.
#[derive(Debug, Clone)]
pub struct MemoryGuard {
    limit: u64,
    used: u64,
    max_snapshot: u64,
}

impl MemoryGuard {
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: 0,
            max_snapshot: 0,
        }
    }

    /// Claim `bytes` for the snapshot of checkpoint `index`.
    ///
    /// The snapshot size counts toward [`max_snapshot_bytes`](Self::max_snapshot_bytes)
    /// even when the claim is refused.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::CapacityExceeded`] when the claim would push
    /// usage past the ceiling. Usage is left unchanged.
    pub fn reserve(&mut self, index: CheckpointIndex, bytes: u64) -> Result<()> {
        self.max_snapshot = self.max_snapshot.max(bytes);
        let remaining = self.remaining();
        if bytes > remaining {
            return Err(TrackerError::CapacityExceeded {
                index,
                requested: bytes,
                remaining,
                limit: self.limit,
            });
        }
        self.used += bytes;
        Ok(())
    }

    /// Return bytes claimed by a snapshot that has been folded or dropped.
    pub fn release(&mut self, bytes: u64) {
        self.used = self.used.saturating_sub(bytes);
    }

    /// Forget all claims; the high-water mark survives.
    pub fn clear(&mut self) {
        self.used = 0;
    }

    #[must_use]
    pub fn used(&self) -> u64 {
        self.used
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Largest single snapshot seen so far.
    #[must_use]
    pub fn max_snapshot_bytes(&self) -> u64 {
        self.max_snapshot
    }
}

impl Default for MemoryGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING_STATE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_and_release_track_usage() {
        let mut guard = MemoryGuard::new(100);
        guard.reserve(CheckpointIndex::new(0), 60).unwrap();
        assert_eq!(guard.used(), 60);
        assert_eq!(guard.remaining(), 40);

        guard.release(60);
        assert_eq!(guard.used(), 0);
        assert_eq!(guard.max_snapshot_bytes(), 60);
    }

    #[test]
    fn refuses_claim_past_ceiling_without_side_effects() {
        let mut guard = MemoryGuard::new(100);
        guard.reserve(CheckpointIndex::new(0), 70).unwrap();

        let err = guard.reserve(CheckpointIndex::new(1), 31).unwrap_err();
        assert_eq!(
            err,
            TrackerError::CapacityExceeded {
                index: CheckpointIndex::new(1),
                requested: 31,
                remaining: 30,
                limit: 100,
            }
        );
        assert_eq!(guard.used(), 70);
        assert_eq!(guard.max_snapshot_bytes(), 70);
    }

    #[test]
    fn high_water_mark_counts_refused_snapshots() {
        let mut guard = MemoryGuard::new(10);
        assert!(guard.reserve(CheckpointIndex::new(0), 50).is_err());
        assert_eq!(guard.max_snapshot_bytes(), 50);
        assert_eq!(guard.used(), 0);
    }

    #[test]
    fn exact_fit_is_accepted() {
        let mut guard = MemoryGuard::new(snapshot_cost(2));
        guard
            .reserve(CheckpointIndex::new(0), snapshot_cost(2))
            .unwrap();
        assert_eq!(guard.remaining(), 0);
    }

    #[test]
    fn snapshot_cost_grows_per_entry() {
        assert_eq!(snapshot_cost(0), SNAPSHOT_HEADER_BYTES);
        assert_eq!(snapshot_cost(3) - snapshot_cost(2), SNAPSHOT_ENTRY_BYTES);
    }
}
