//! Graph vertices, arcs, and structural flags.
//!
//! Nodes live in an arena owned by the network; arcs store destination
//! indices rather than references, so a single node may be the target of many
//! arcs and relinking never dangles. The graph is a DAG, not strictly a tree,
//! once the cross-word network is linked in.

use crate::types::{HmmId, NodeId, WordId};

use super::lookahead::LookaheadCache;

/// Structural node flags. Independently settable; the `*_FIRST` flags refine
/// their parent category.
pub mod flags {
    /// Plain interior node.
    pub const NORMAL: u16 = 0x0000;
    /// Word-end-beam-eligible node.
    pub const USE_WORD_END_BEAM: u16 = 0x0001;
    /// Node immediately after a word identity was emitted.
    pub const AFTER_WORD_ID: u16 = 0x0002;
    /// Node belongs to the fan-out network.
    pub const FAN_OUT: u16 = 0x0004;
    /// First node of a fan-out chain.
    pub const FAN_OUT_FIRST: u16 = 0x0008;
    /// Node belongs to the fan-in network.
    pub const FAN_IN: u16 = 0x0010;
    /// First node of a fan-in chain.
    pub const FAN_IN_FIRST: u16 = 0x0020;
    /// The word-boundary marker must be inserted when passing this node.
    pub const INSERT_WORD_BOUNDARY: u16 = 0x0040;
    /// Connection point where fan-in chains re-enter the prefix tree.
    pub const FAN_IN_CONNECTION: u16 = 0x0080;
    /// Node has been linked to the fan network.
    pub const LINKED: u16 = 0x0100;
    /// Silence must be consumed before this node's word continues.
    pub const SILENCE_FIRST: u16 = 0x0200;
    /// First acoustic state of some word.
    pub const FIRST_STATE_OF_WORD: u16 = 0x0400;
    /// Decoding may terminate here.
    pub const FINAL: u16 = 0x0800;
}

/// Directed edge: transition log-probability plus the destination node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    /// Transition log-probability.
    pub log_prob: f32,
    /// Destination node.
    pub target: NodeId,
}

/// The acoustic state a node emits with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcousticState {
    /// Owning model in the inventory.
    pub hmm: HmmId,
    /// State index within the model chain.
    pub state_index: usize,
    /// Emission distribution identity; the basis of prefix sharing.
    pub model: i32,
}

/// A graph vertex: one acoustic state, or a virtual root/end/word marker.
#[derive(Debug)]
pub struct Node {
    /// Identity of this node in the arena.
    pub id: NodeId,
    /// Emitted word, absent on internal states.
    pub word_id: Option<WordId>,
    /// Acoustic state descriptor; `None` for virtual nodes, which pass
    /// tokens through without consuming a frame.
    pub state: Option<AcousticState>,
    /// Outgoing arcs, owned by this node.
    pub arcs: Vec<Arc>,
    /// Structural flag bitmask.
    pub flags: u16,
    /// Words reachable from this node without further disambiguation.
    pub possible_words: Vec<WordId>,
    /// Bounded language-model lookahead cache.
    pub lookahead: Option<LookaheadCache>,
    /// Head of the per-utterance token list; transient decoding state.
    pub token_list: Option<u32>,
}

impl Node {
    pub(crate) fn new(id: NodeId, word_id: Option<WordId>, state: Option<AcousticState>) -> Self {
        Self {
            id,
            word_id,
            state,
            arcs: Vec::new(),
            flags: flags::NORMAL,
            possible_words: Vec::new(),
            lookahead: None,
            token_list: None,
        }
    }

    /// True if any of the given flag bits are set.
    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    /// Set the given flag bits.
    pub fn set_flag(&mut self, flag: u16) {
        self.flags |= flag;
    }

    /// The emission model identity, if this node emits.
    pub fn emission_model(&self) -> Option<i32> {
        self.state.map(|s| s.model)
    }

    /// Find the outgoing arc to `target`, if any.
    pub fn arc_to(&self, target: NodeId) -> Option<&Arc> {
        self.arcs.iter().find(|a| a.target == target)
    }
}
