//! Parsed protocol messages as seen by the tracker.

use crate::checkpoint::CheckpointMessage;
use crate::estimate::EstimateMessage;
use crate::stream::StreamKey;
use crate::trace::TraceMessage;
use serde::{Deserialize, Serialize};

/// A single data record.
///
/// `byte_size` is the caller's estimate of the serialized payload size;
/// the tracker counts it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    pub stream: StreamKey,
    pub data: serde_json::Value,
    pub byte_size: u64,
}

impl RecordMessage {
    /// Build a record, estimating its size as the JSON-serialized length of `data`.
    #[must_use]
    pub fn new(stream: StreamKey, data: serde_json::Value) -> Self {
        let byte_size = estimated_byte_size(&data);
        Self {
            stream,
            data,
            byte_size,
        }
    }
}

/// JSON-serialized length of a value, in bytes.
#[must_use]
pub fn estimated_byte_size(value: &serde_json::Value) -> u64 {
    // Serializing a `Value` cannot fail: keys are always strings.
    serde_json::to_vec(value).map_or(0, |bytes| bytes.len() as u64)
}

/// Discriminated protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum ProtocolMessage {
    Record(RecordMessage),
    Checkpoint(CheckpointMessage),
    Estimate(EstimateMessage),
    Trace(TraceMessage),
}

impl From<RecordMessage> for ProtocolMessage {
    fn from(value: RecordMessage) -> Self {
        Self::Record(value)
    }
}

impl From<CheckpointMessage> for ProtocolMessage {
    fn from(value: CheckpointMessage) -> Self {
        Self::Checkpoint(value)
    }
}

impl From<EstimateMessage> for ProtocolMessage {
    fn from(value: EstimateMessage) -> Self {
        Self::Estimate(value)
    }
}

impl From<TraceMessage> for ProtocolMessage {
    fn from(value: TraceMessage) -> Self {
        Self::Trace(value)
    }
}
