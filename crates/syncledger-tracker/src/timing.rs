//! Checkpoint latency metrics.
//!
//! Two latencies are tracked: the gap between consecutive source checkpoints
//! (the first gap starts at the first record), and the delay between a source
//! checkpoint and the destination's acknowledgement of it.
//!
//! Emission times of unacknowledged checkpoints are kept under the same kind
//! of byte budget as snapshots. Past the budget, commit latency stops being
//! tracked for the rest of the attempt and reads as unavailable.

use std::collections::BTreeMap;
use std::mem::size_of;
use std::time::{Duration, Instant};

use syncledger_types::summary::CheckpointTiming;

use crate::delta::CheckpointIndex;

const TIMESTAMP_ENTRY_BYTES: u64 = (size_of::<CheckpointIndex>() + size_of::<Instant>()) as u64;

#[derive(Debug, Default, Clone, Copy)]
struct DurationStats {
    max: Duration,
    total: Duration,
    count: u32,
}

impl DurationStats {
    fn observe(&mut self, d: Duration) {
        self.max = self.max.max(d);
        self.total = self.total.saturating_add(d);
        self.count = self.count.saturating_add(1);
    }

    fn max_secs(&self) -> Option<u64> {
        (self.count > 0).then(|| self.max.as_secs())
    }

    fn mean_secs(&self) -> Option<u64> {
        (self.count > 0).then(|| (self.total / self.count).as_secs())
    }
}

#[derive(Debug)]
pub struct CheckpointTimer {
    capacity_bytes: u64,
    first_record_at: Option<Instant>,
    last_checkpoint_at: Option<Instant>,
    emitted_at: BTreeMap<CheckpointIndex, Instant>,
    between_checkpoints: DurationStats,
    to_commit: DurationStats,
    commit_latency_reliable: bool,
}

impl CheckpointTimer {
    #[must_use]
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            first_record_at: None,
            last_checkpoint_at: None,
            emitted_at: BTreeMap::new(),
            between_checkpoints: DurationStats::default(),
            to_commit: DurationStats::default(),
            commit_latency_reliable: true,
        }
    }

    pub fn record_observed(&mut self, now: Instant) {
        self.first_record_at.get_or_insert(now);
    }

    pub fn checkpoint_emitted(&mut self, index: CheckpointIndex, now: Instant) {
        if let Some(since) = self.last_checkpoint_at.or(self.first_record_at) {
            self.between_checkpoints
                .observe(now.saturating_duration_since(since));
        }
        self.last_checkpoint_at = Some(now);

        if !self.commit_latency_reliable {
            return;
        }
        let needed = (self.emitted_at.len() as u64 + 1).saturating_mul(TIMESTAMP_ENTRY_BYTES);
        if needed > self.capacity_bytes {
            tracing::warn!(
                checkpoint = index.get(),
                pending = self.emitted_at.len(),
                "Too many unacknowledged checkpoints; commit latency no longer tracked"
            );
            self.commit_latency_reliable = false;
            self.emitted_at = BTreeMap::new();
            return;
        }
        self.emitted_at.insert(index, now);
    }

    pub fn checkpoint_committed(&mut self, index: CheckpointIndex, now: Instant) {
        if !self.commit_latency_reliable {
            return;
        }
        let still_pending = self.emitted_at.split_off(&index.next());
        let ready = std::mem::replace(&mut self.emitted_at, still_pending);
        for emitted in ready.into_values() {
            self.to_commit.observe(now.saturating_duration_since(emitted));
        }
    }

    #[must_use]
    pub fn timing(&self) -> CheckpointTiming {
        let (max_commit, mean_commit) = if self.commit_latency_reliable {
            (self.to_commit.max_secs(), self.to_commit.mean_secs())
        } else {
            (None, None)
        };
        CheckpointTiming {
            max_seconds_between_source_checkpoints: self.between_checkpoints.max_secs(),
            mean_seconds_between_source_checkpoints: self.between_checkpoints.mean_secs(),
            max_seconds_to_commit: max_commit,
            mean_seconds_to_commit: mean_commit,
        }
    }
}
