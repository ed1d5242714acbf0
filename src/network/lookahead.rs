//! Bounded per-node language-model lookahead caches.
//!
//! Each node that carries a reachable-word list may hold a small
//! direct-mapped cache from a bounded history identity to the best partial
//! language-model score over the words still reachable from that node. The
//! search loop uses the cached score to prune hypotheses before the true
//! model score is known.
//!
//! One global capacity applies to all node caches; a separate pruning pass
//! bounds total memory against graph fan-out (see
//! [`LexNetwork::prune_lookahead_buffers`](super::tree::LexNetwork::prune_lookahead_buffers)).

use serde::{Deserialize, Serialize};

/// Lookahead operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookaheadMode {
    /// No lookahead state is kept on any node.
    Disabled,
    /// Reachable-word lists only in each word's first chain of nodes.
    FirstSubtree,
    /// Reachable-word lists on every tree node.
    Full,
}

impl LookaheadMode {
    /// True unless the mode is [`LookaheadMode::Disabled`].
    pub fn is_enabled(self) -> bool {
        !matches!(self, LookaheadMode::Disabled)
    }
}

/// Fixed-capacity direct-mapped cache of partial LM scores.
///
/// A key hashes to exactly one slot; inserting over an occupied slot evicts
/// its previous entry. Single-probe lookup keeps the search-loop cost
/// constant regardless of capacity.
#[derive(Debug, Clone)]
pub struct LookaheadCache {
    slots: Vec<Option<(u64, f32)>>,
}

impl LookaheadCache {
    /// Create a cache with the given slot capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
        }
    }

    fn slot(&self, key: u64) -> usize {
        (key % self.slots.len() as u64) as usize
    }

    /// Look up the cached score for a history identity.
    pub fn find(&self, key: u64) -> Option<f32> {
        match self.slots[self.slot(key)] {
            Some((stored, value)) if stored == key => Some(value),
            _ => None,
        }
    }

    /// Store a score for a history identity, evicting any colliding entry.
    pub fn insert(&mut self, key: u64, value: f32) {
        let slot = self.slot(key);
        self.slots[slot] = Some((key, value));
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True if no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Slot capacity.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Resize to a new capacity, dropping all cached entries.
    pub fn resize(&mut self, capacity: usize) {
        self.slots.clear();
        self.slots.resize(capacity.max(1), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let mut cache = LookaheadCache::new(8);
        cache.insert(42, -1.5);
        assert_eq!(cache.find(42), Some(-1.5));
        assert_eq!(cache.find(43), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_colliding_key_evicts() {
        let mut cache = LookaheadCache::new(4);
        cache.insert(3, -1.0);
        cache.insert(7, -2.0); // same slot as 3 with capacity 4
        assert_eq!(cache.find(3), None);
        assert_eq!(cache.find(7), Some(-2.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resize_drops_entries() {
        let mut cache = LookaheadCache::new(4);
        cache.insert(1, -0.5);
        cache.resize(16);
        assert_eq!(cache.capacity(), 16);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = LookaheadCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }
}
