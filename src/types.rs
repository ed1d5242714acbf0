//! Strong typing with newtypes for domain identifiers.
//!
//! This module provides type-safe wrappers around the primitive indices used
//! throughout the network: word identifiers from the vocabulary, node indices
//! into the network arena, and acoustic model indices into the inventory.

use serde::{Deserialize, Serialize};

/// Vocabulary word identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WordId(pub u32);

impl WordId {
    /// Create a new word identifier.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the word identifier value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for WordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "word_{}", self.0)
    }
}

/// Index of a node in the network arena.
///
/// Arcs and all cross-references store `NodeId` values rather than references,
/// so relinking during cross-word network construction can never dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a new node identifier.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the node identifier value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// Get the arena index for this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Index of an acoustic model in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HmmId(pub u32);

impl HmmId {
    /// Create a new model identifier.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the model identifier value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// Get the inventory index for this model.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for HmmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hmm_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newtype_accessors() {
        assert_eq!(WordId::new(7).value(), 7);
        assert_eq!(NodeId::new(3).index(), 3);
        assert_eq!(HmmId::new(5).index(), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(WordId::new(2).to_string(), "word_2");
        assert_eq!(NodeId::new(9).to_string(), "node_9");
    }
}
