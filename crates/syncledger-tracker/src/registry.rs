//! Stable small-integer ids for streams.

use std::collections::HashMap;
use std::fmt;

use syncledger_types::stream::StreamKey;

/// Index bound 1:1 to a [`StreamKey`] for the lifetime of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamIndex(usize);

impl StreamIndex {
    pub(crate) fn from_usize(index: usize) -> Self {
        Self(index)
    }

    /// Position in first-observation order.
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for StreamIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Assigns indices to streams in the order they are first seen.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    by_key: HashMap<StreamKey, StreamIndex>,
    keys: Vec<StreamKey>,
}

impl StreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `key`, allocating the next one if the key is new.
    ///
    /// Returns `(index, newly_allocated)`.
    pub fn index_or_insert(&mut self, key: &StreamKey) -> (StreamIndex, bool) {
        if let Some(index) = self.by_key.get(key) {
            return (*index, false);
        }
        let index = StreamIndex(self.keys.len());
        self.keys.push(key.clone());
        self.by_key.insert(key.clone(), index);
        (index, true)
    }

    #[must_use]
    pub fn get(&self, key: &StreamKey) -> Option<StreamIndex> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn key(&self, index: StreamIndex) -> Option<&StreamKey> {
        self.keys.get(index.0)
    }

    /// Keys in index order.
    pub fn keys(&self) -> impl Iterator<Item = (StreamIndex, &StreamKey)> {
        self.keys.iter().enumerate().map(|(i, k)| (StreamIndex(i), k))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_in_first_seen_order() {
        let mut reg = StreamRegistry::new();
        let hulk = StreamKey::new("hulk");
        let thor = StreamKey::namespaced("thor", "avengers");

        assert_eq!(reg.index_or_insert(&hulk), (StreamIndex(0), true));
        assert_eq!(reg.index_or_insert(&thor), (StreamIndex(1), true));
        assert_eq!(reg.index_or_insert(&hulk), (StreamIndex(0), false));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn lookups_are_bidirectional() {
        let mut reg = StreamRegistry::new();
        let (idx, _) = reg.index_or_insert(&StreamKey::new("users"));
        assert_eq!(reg.key(idx), Some(&StreamKey::new("users")));
        assert_eq!(reg.get(&StreamKey::new("users")), Some(idx));
        assert_eq!(reg.get(&StreamKey::new("orders")), None);
    }

    #[test]
    fn namespace_distinguishes_streams() {
        let mut reg = StreamRegistry::new();
        let (a, _) = reg.index_or_insert(&StreamKey::new("users"));
        let (b, _) = reg.index_or_insert(&StreamKey::namespaced("users", "public"));
        assert_ne!(a, b);
    }
}
