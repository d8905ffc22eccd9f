//! Terminal failure reasons built from captured trace errors.

use crate::trace::{TraceError, TraceFailureType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the sync reported the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOrigin {
    Source,
    Destination,
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Destination => "destination",
        })
    }
}

/// Failure classification for operator-facing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    ConfigError,
    SystemError,
}

impl From<TraceFailureType> for FailureType {
    fn from(value: TraceFailureType) -> Self {
        match value {
            TraceFailureType::ConfigError => Self::ConfigError,
            TraceFailureType::SystemError => Self::SystemError,
        }
    }
}

/// Terminal failure payload for one sync attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub origin: FailureOrigin,
    pub failure_type: FailureType,
    pub external_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// When the failure reason was derived (caller-supplied).
    pub timestamp: i64,
    /// When the connector emitted the underlying trace.
    pub emitted_at: f64,
    pub attempt_number: u32,
}

impl FailureReason {
    /// Build a failure reason from a connector trace error.
    #[must_use]
    pub fn from_trace(
        origin: FailureOrigin,
        error: &TraceError,
        emitted_at: f64,
        timestamp: i64,
        attempt_number: u32,
    ) -> Self {
        Self {
            origin,
            failure_type: error.failure_type.into(),
            external_message: error.message.clone(),
            internal_message: error.internal_message.clone(),
            stack_trace: error.stack_trace.clone(),
            timestamp,
            emitted_at,
            attempt_number,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failure (attempt {}): {}",
            self.origin, self.attempt_number, self.external_message
        )
    }
}
