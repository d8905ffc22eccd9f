//! Source-side size estimates.

use crate::stream::StreamKey;
use serde::{Deserialize, Serialize};

/// Estimate of how much data the source expects to emit.
///
/// A source reports either per-stream estimates or a single sync-wide
/// estimate, never both within one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimateMessage {
    /// Estimate for a single stream.
    Stream {
        stream: StreamKey,
        byte_estimate: u64,
        row_estimate: u64,
    },
    /// Estimate for the whole sync.
    Sync { byte_estimate: u64, row_estimate: u64 },
}

impl EstimateMessage {
    /// `(bytes, records)` carried by the estimate.
    #[must_use]
    pub fn counts(&self) -> (u64, u64) {
        match self {
            Self::Stream {
                byte_estimate,
                row_estimate,
                ..
            }
            | Self::Sync {
                byte_estimate,
                row_estimate,
            } => (*byte_estimate, *row_estimate),
        }
    }
}
