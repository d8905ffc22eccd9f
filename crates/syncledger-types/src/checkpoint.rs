//! Checkpoint (state) messages.
//!
//! A [`CheckpointMessage`] delimits a batch of records. The source emits
//! one after the records it covers; the destination echoes it back once
//! everything before it is durably written.

use crate::stream::StreamKey;
use serde::{Deserialize, Serialize};

/// Shape of a checkpoint payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// One payload covering every stream.
    Global,
    /// Payload scoped to a single stream.
    Stream,
    /// Untyped payload from connectors predating typed checkpoints.
    Legacy,
}

/// Checkpoint emitted by a connector, carrying an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointMessage {
    /// Sync-wide checkpoint.
    Global { data: serde_json::Value },
    /// Checkpoint for one stream.
    Stream {
        stream: StreamKey,
        data: serde_json::Value,
    },
    /// Legacy untyped checkpoint.
    Legacy { data: serde_json::Value },
}

impl CheckpointMessage {
    /// Shape of this checkpoint.
    #[must_use]
    pub fn kind(&self) -> CheckpointKind {
        match self {
            Self::Global { .. } => CheckpointKind::Global,
            Self::Stream { .. } => CheckpointKind::Stream,
            Self::Legacy { .. } => CheckpointKind::Legacy,
        }
    }

    /// Opaque payload.
    #[must_use]
    pub fn data(&self) -> &serde_json::Value {
        match self {
            Self::Global { data } | Self::Stream { data, .. } | Self::Legacy { data } => data,
        }
    }

    /// Stream this checkpoint is scoped to, if any.
    #[must_use]
    pub fn stream(&self) -> Option<&StreamKey> {
        match self {
            Self::Stream { stream, .. } => Some(stream),
            Self::Global { .. } | Self::Legacy { .. } => None,
        }
    }
}
