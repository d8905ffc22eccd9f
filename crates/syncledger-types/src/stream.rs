//! Stream identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one data stream within a sync attempt.
///
/// Two keys are the same stream only when both the name and the namespace
/// match; `users` and `public.users` are distinct streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamKey {
    /// Stream name (e.g. `"users"`).
    pub name: String,
    /// Optional namespace (e.g. a database schema).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl StreamKey {
    /// Create a key without a namespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Create a namespaced key.
    #[must_use]
    pub fn namespaced(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
