//! Trace messages: errors and stream status reports.

use crate::stream::StreamKey;
use serde::{Deserialize, Serialize};

/// Connector-reported classification of an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceFailureType {
    /// The user's configuration is wrong.
    ConfigError,
    /// Anything else.
    #[default]
    SystemError,
}

/// Error reported by a connector through a trace message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceError {
    /// User-facing description.
    pub message: String,
    /// Developer-facing description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default)]
    pub failure_type: TraceFailureType,
}

impl TraceError {
    /// System error with only a user-facing message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            internal_message: None,
            stack_trace: None,
            failure_type: TraceFailureType::SystemError,
        }
    }
}

/// Lifecycle status of a stream, as reported by a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Started,
    Running,
    Complete,
    Incomplete,
}

/// Payload of a trace message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TracePayload {
    Error(TraceError),
    StreamStatus { stream: StreamKey, status: StreamStatus },
}

/// Trace message with its emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMessage {
    /// Milliseconds since the Unix epoch at which the connector emitted it.
    pub emitted_at: f64,
    pub payload: TracePayload,
}

impl TraceMessage {
    /// Error trace.
    #[must_use]
    pub fn error(error: TraceError, emitted_at: f64) -> Self {
        Self {
            emitted_at,
            payload: TracePayload::Error(error),
        }
    }

    /// The carried error, if this is an error trace.
    #[must_use]
    pub fn as_error(&self) -> Option<&TraceError> {
        match &self.payload {
            TracePayload::Error(err) => Some(err),
            TracePayload::StreamStatus { .. } => None,
        }
    }
}
