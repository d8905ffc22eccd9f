//! Tracker configuration types.

use serde::{Deserialize, Serialize};

use crate::memory::DEFAULT_MAX_PENDING_STATE_BYTES;

/// Knobs for one [`MessageTracker`](crate::MessageTracker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Ceiling on bytes retained by unacknowledged checkpoint snapshots.
    pub max_pending_state_bytes: u64,
    /// When false, committed counts are never tracked and always read as
    /// unavailable.
    pub commit_tracking_enabled: bool,
    /// Log every checkpoint and acknowledgement at debug level.
    pub log_checkpoints: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_pending_state_bytes: DEFAULT_MAX_PENDING_STATE_BYTES,
            commit_tracking_enabled: true,
            log_checkpoints: false,
        }
    }
}
