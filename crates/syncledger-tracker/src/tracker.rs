//! Entry point: routes source and destination messages into the accounting
//! components.
//!
//! The source path and the destination path call in from different threads.
//! Everything they touch sits behind one mutex, so readers always see the
//! state either wholly before or wholly after a commit fold.

use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use syncledger_types::checkpoint::CheckpointMessage;
use syncledger_types::failure::FailureReason;
use syncledger_types::message::{ProtocolMessage, RecordMessage};
use syncledger_types::summary::SyncSummary;
use syncledger_types::trace::TraceMessage;

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::delta::{CheckpointIndex, DeltaTracker, Fingerprint, TrackerHealth};
use crate::error::Result;
use crate::failure::{CapturedError, ErrorCapture};
use crate::registry::StreamRegistry;
use crate::state_aggregator::{MergedCheckpoint, StateAggregator};
use crate::stats::{CheckpointCounts, EmittedCounters, EstimateState, SyncStatsTracker};
use crate::timing::CheckpointTimer;

#[derive(Debug)]
enum CommitTracking {
    Disabled,
    Enabled(DeltaTracker),
}

#[derive(Debug)]
struct TrackerState {
    registry: StreamRegistry,
    emitted: EmittedCounters,
    estimates: EstimateState,
    commits: CommitTracking,
    timer: CheckpointTimer,
    source_state: StateAggregator,
    committed_state: StateAggregator,
    errors: ErrorCapture,
    checkpoints: CheckpointCounts,
    next_checkpoint: CheckpointIndex,
    next_ack: CheckpointIndex,
}

/// Accounts for every message of one sync attempt.
///
/// Share it between the source and destination paths with an [`Arc`].
pub struct MessageTracker {
    config: TrackerConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<TrackerState>,
}

impl MessageTracker {
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(config: TrackerConfig, clock: Arc<dyn Clock>) -> Self {
        let commits = if config.commit_tracking_enabled {
            CommitTracking::Enabled(DeltaTracker::new(config.max_pending_state_bytes))
        } else {
            CommitTracking::Disabled
        };
        let state = TrackerState {
            registry: StreamRegistry::new(),
            emitted: EmittedCounters::default(),
            estimates: EstimateState::default(),
            commits,
            timer: CheckpointTimer::new(config.max_pending_state_bytes),
            source_state: StateAggregator::new(),
            committed_state: StateAggregator::new(),
            errors: ErrorCapture::new(),
            checkpoints: CheckpointCounts::default(),
            next_checkpoint: CheckpointIndex::new(0),
            next_ack: CheckpointIndex::new(0),
        };
        Self {
            config,
            clock,
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Account for a message emitted by the source.
    ///
    /// # Errors
    ///
    /// [`TrackerError::InputContractViolation`](crate::TrackerError::InputContractViolation)
    /// when an estimate contradicts the estimate shape already in use. Nothing
    /// is recorded for the rejected message.
    pub fn from_source(&self, msg: &ProtocolMessage) -> Result<()> {
        let mut state = self.lock();
        match msg {
            ProtocolMessage::Record(record) => self.source_record(&mut state, record),
            ProtocolMessage::Checkpoint(checkpoint) => {
                self.source_checkpoint(&mut state, checkpoint);
            }
            ProtocolMessage::Estimate(estimate) => {
                if let Err(err) = state.estimates.apply(estimate) {
                    tracing::warn!(error = %err, "Rejected source estimate");
                    return Err(err);
                }
            }
            ProtocolMessage::Trace(trace) => Self::trace(&mut state, trace, Side::Source),
        }
        Ok(())
    }

    /// Account for a message emitted by the destination.
    ///
    /// Destination records and estimates carry no accounting meaning and are
    /// ignored.
    pub fn from_destination(&self, msg: &ProtocolMessage) {
        let mut state = self.lock();
        match msg {
            ProtocolMessage::Checkpoint(checkpoint) => {
                self.destination_checkpoint(&mut state, checkpoint);
            }
            ProtocolMessage::Trace(trace) => Self::trace(&mut state, trace, Side::Destination),
            ProtocolMessage::Record(_) | ProtocolMessage::Estimate(_) => {
                tracing::warn!("Ignoring record or estimate emitted by the destination");
            }
        }
    }

    fn source_record(&self, state: &mut TrackerState, record: &RecordMessage) {
        let (index, is_new) = state.registry.index_or_insert(&record.stream);
        if is_new {
            tracing::debug!(stream = %record.stream, index = %index, "New stream observed");
        }
        state.emitted.record(index, record.byte_size);
        if let CommitTracking::Enabled(delta) = &mut state.commits {
            delta.record(index, record.byte_size);
        }
        state.timer.record_observed(self.clock.now());
    }

    fn source_checkpoint(&self, state: &mut TrackerState, checkpoint: &CheckpointMessage) {
        if let Some(stream) = checkpoint.stream() {
            state.registry.index_or_insert(stream);
        }
        let index = state.next_checkpoint;
        state.next_checkpoint = index.next();
        state.checkpoints.source_emitted += 1;

        if let CommitTracking::Enabled(delta) = &mut state.commits {
            // Failed trackers return Ok, so this logs once per attempt.
            if let Err(err) = delta.checkpoint(index, Some(fingerprint(checkpoint))) {
                tracing::error!(
                    checkpoint = index.get(),
                    error = %err,
                    "Committed counts are no longer reliable for this attempt"
                );
            }
        }
        state.timer.checkpoint_emitted(index, self.clock.now());
        state.source_state.ingest(checkpoint);

        if self.config.log_checkpoints {
            tracing::debug!(
                checkpoint = index.get(),
                kind = ?checkpoint.kind(),
                "Source checkpoint"
            );
        }
    }

    fn destination_checkpoint(&self, state: &mut TrackerState, checkpoint: &CheckpointMessage) {
        // Acknowledgements pair up with source checkpoints in emission order.
        let index = state.next_ack;
        state.next_ack = index.next();
        state.checkpoints.destination_received += 1;

        if let CommitTracking::Enabled(delta) = &mut state.commits {
            if let Err(err) = delta.acknowledge(index, &fingerprint(checkpoint)) {
                tracing::error!(
                    checkpoint = index.get(),
                    error = %err,
                    "Committed counts are no longer reliable for this attempt"
                );
            }
        }
        state.timer.checkpoint_committed(index, self.clock.now());
        state.committed_state.ingest(checkpoint);

        if self.config.log_checkpoints {
            tracing::debug!(
                checkpoint = index.get(),
                kind = ?checkpoint.kind(),
                "Destination acknowledged checkpoint"
            );
        }
    }

    fn trace(state: &mut TrackerState, trace: &TraceMessage, side: Side) {
        let Some(error) = trace.as_error() else {
            return;
        };
        let kept = match side {
            Side::Source => state.errors.accept_source(error, trace.emitted_at),
            Side::Destination => state.errors.accept_destination(error, trace.emitted_at),
        };
        if kept {
            tracing::warn!(
                side = side.as_str(),
                message = %error.message,
                "Connector reported an error"
            );
        } else {
            tracing::debug!(
                side = side.as_str(),
                message = %error.message,
                "Ignoring connector error after the first"
            );
        }
    }

    /// Run `f` against a consistent view of every counter.
    pub fn with_stats<R>(&self, f: impl FnOnce(&SyncStatsTracker<'_>) -> R) -> R {
        let state = self.lock();
        let (committed, memory) = match &state.commits {
            CommitTracking::Enabled(delta) => (delta.committed(), Some(delta.memory())),
            CommitTracking::Disabled => (None, None),
        };
        let view = SyncStatsTracker {
            registry: &state.registry,
            emitted: &state.emitted,
            estimates: &state.estimates,
            committed,
            memory,
            checkpoints: state.checkpoints,
            timing: state.timer.timing(),
        };
        f(&view)
    }

    #[must_use]
    pub fn summary(&self) -> SyncSummary {
        self.with_stats(|stats| stats.summary())
    }

    #[must_use]
    pub fn total_records_emitted(&self) -> u64 {
        self.with_stats(|stats| stats.total_records_emitted())
    }

    #[must_use]
    pub fn total_records_committed(&self) -> Option<u64> {
        self.with_stats(|stats| stats.total_records_committed())
    }

    /// `Healthy` also when commit tracking is disabled; check the config to
    /// tell the two apart.
    #[must_use]
    pub fn health(&self) -> TrackerHealth {
        match &self.lock().commits {
            CommitTracking::Enabled(delta) => delta.health(),
            CommitTracking::Disabled => TrackerHealth::Healthy,
        }
    }

    /// Latest merged checkpoint emitted by the source.
    #[must_use]
    pub fn source_state(&self) -> Option<MergedCheckpoint> {
        self.lock().source_state.value()
    }

    /// Latest merged checkpoint acknowledged by the destination.
    #[must_use]
    pub fn committed_state(&self) -> Option<MergedCheckpoint> {
        self.lock().committed_state.value()
    }

    #[must_use]
    pub fn first_source_error(&self) -> Option<CapturedError> {
        self.lock().errors.first_source_error().cloned()
    }

    #[must_use]
    pub fn first_destination_error(&self) -> Option<CapturedError> {
        self.lock().errors.first_destination_error().cloned()
    }

    /// Terminal failure for the attempt, if either side reported an error.
    #[must_use]
    pub fn derive_failure_reason(
        &self,
        timestamp: i64,
        attempt_number: u32,
    ) -> Option<FailureReason> {
        self.lock()
            .errors
            .derive_failure_reason(timestamp, attempt_number)
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            // A panic may have interrupted a fold halfway.
            let mut state = poisoned.into_inner();
            if let CommitTracking::Enabled(delta) = &mut state.commits {
                if delta.health() == TrackerHealth::Healthy {
                    tracing::error!(
                        "Tracker lock poisoned; committed counts are no longer reliable"
                    );
                    delta.mark_failed();
                }
            }
            self.state.clear_poison();
            state
        })
    }
}

impl std::fmt::Debug for MessageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageTracker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Source,
    Destination,
}

impl Side {
    fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
        }
    }
}

fn fingerprint(checkpoint: &CheckpointMessage) -> Fingerprint {
    let mut hasher = Sha256::new();
    // Serializing a `Value`-backed enum cannot fail.
    if let Ok(bytes) = serde_json::to_vec(checkpoint) {
        hasher.update(&bytes);
    }
    hasher.finalize().into()
}
