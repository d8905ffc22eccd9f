//! Merges successive checkpoint payloads into one latest value.
//!
//! Global and legacy checkpoints describe the whole sync, so each one
//! replaces whatever came before. Per-stream checkpoints only replace the
//! entry for their own stream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use syncledger_types::checkpoint::{CheckpointKind, CheckpointMessage};
use syncledger_types::stream::StreamKey;

/// Last known payload for one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamCheckpoint {
    pub stream: StreamKey,
    pub data: serde_json::Value,
}

/// Latest checkpoint value, ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MergedCheckpoint {
    /// A single global or legacy payload.
    Single {
        kind: CheckpointKind,
        data: serde_json::Value,
    },
    /// One payload per stream, ordered by stream key.
    PerStream { streams: Vec<StreamCheckpoint> },
}

#[derive(Debug, Default)]
enum Merged {
    #[default]
    Empty,
    Single {
        kind: CheckpointKind,
        data: serde_json::Value,
    },
    PerStream(BTreeMap<StreamKey, serde_json::Value>),
}

#[derive(Debug, Default)]
pub struct StateAggregator {
    merged: Merged,
}

impl StateAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, checkpoint: &CheckpointMessage) {
        match checkpoint {
            CheckpointMessage::Global { data } | CheckpointMessage::Legacy { data } => {
                self.merged = Merged::Single {
                    kind: checkpoint.kind(),
                    data: data.clone(),
                };
            }
            CheckpointMessage::Stream { stream, data } => {
                if let Merged::PerStream(streams) = &mut self.merged {
                    streams.insert(stream.clone(), data.clone());
                } else {
                    self.merged =
                        Merged::PerStream(BTreeMap::from([(stream.clone(), data.clone())]));
                }
            }
        }
    }

    /// Merged value, or `None` before the first checkpoint.
    #[must_use]
    pub fn value(&self) -> Option<MergedCheckpoint> {
        match &self.merged {
            Merged::Empty => None,
            Merged::Single { kind, data } => Some(MergedCheckpoint::Single {
                kind: *kind,
                data: data.clone(),
            }),
            Merged::PerStream(streams) => Some(MergedCheckpoint::PerStream {
                streams: streams
                    .iter()
                    .map(|(stream, data)| StreamCheckpoint {
                        stream: stream.clone(),
                        data: data.clone(),
                    })
                    .collect(),
            }),
        }
    }
}
