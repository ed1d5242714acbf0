//! Persistent, reference-counted backtrace histories.
//!
//! Search hypotheses record their word, language-model, and state backtraces
//! as immutable backward-linked chains. Distinct hypotheses routinely share
//! long common suffixes of these chains, so chain nodes are owned by a
//! reference count rather than by any single hypothesis: linking a new node
//! to a predecessor claims the predecessor, and releasing a reference frees
//! the node and transitively releases its predecessor once the count reaches
//! zero.
//!
//! Chain nodes live in a slot arena with an explicit free list. Reference
//! counts are atomic, so hypotheses processed in parallel may retain and
//! release concurrently; allocation itself takes `&mut self` and belongs in
//! the per-frame history-management step.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::types::{NodeId, WordId};

/// Handle to a history chain node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryRef(u32);

impl HistoryRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

struct Slot<T> {
    value: T,
    previous: Option<HistoryRef>,
    refs: AtomicU32,
}

/// Slot arena for one kind of history chain.
///
/// Payloads are plain data: a freed slot keeps its stale payload until the
/// slot is reused, which lets `release` run with a shared reference.
pub struct HistoryArena<T> {
    slots: Vec<Slot<T>>,
    free: Mutex<Vec<u32>>,
    live: AtomicUsize,
}

impl<T> Default for HistoryArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HistoryArena<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Mutex::new(Vec::new()),
            live: AtomicUsize::new(0),
        }
    }

    /// Allocate a chain node, linking it to `previous`.
    ///
    /// Linking increments the predecessor's reference count as part of
    /// construction. The returned handle itself holds one reference, which
    /// the caller must eventually [`release`](Self::release).
    pub fn alloc(&mut self, value: T, previous: Option<HistoryRef>) -> HistoryRef {
        if let Some(prev) = previous {
            self.retain(prev);
        }
        self.live.fetch_add(1, Ordering::Relaxed);
        if let Some(index) = self.free.get_mut().pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = value;
            slot.previous = previous;
            slot.refs.store(1, Ordering::Release);
            HistoryRef(index)
        } else {
            self.slots.push(Slot {
                value,
                previous,
                refs: AtomicU32::new(1),
            });
            HistoryRef((self.slots.len() - 1) as u32)
        }
    }

    /// Claim an additional reference to a chain node.
    pub fn retain(&self, node: HistoryRef) {
        let old = self.slots[node.index()].refs.fetch_add(1, Ordering::AcqRel);
        assert!(old > 0, "retain of a freed history node {:?}", node);
    }

    /// Drop one reference to a chain node, freeing it at zero and
    /// transitively releasing its predecessor.
    ///
    /// # Panics
    ///
    /// Panics on reference-count underflow: releasing an already-freed node
    /// is a double free of shared history and a contract violation in the
    /// caller.
    pub fn release(&self, node: HistoryRef) {
        let mut current = node;
        loop {
            let slot = &self.slots[current.index()];
            let old = slot.refs.fetch_sub(1, Ordering::AcqRel);
            assert!(
                old > 0,
                "history reference count underflow: double release of {:?}",
                current
            );
            if old != 1 {
                return;
            }
            self.live.fetch_sub(1, Ordering::Relaxed);
            let previous = slot.previous;
            self.free.lock().push(current.0);
            match previous {
                Some(prev) => current = prev,
                None => return,
            }
        }
    }

    /// Read a chain node's payload.
    pub fn get(&self, node: HistoryRef) -> &T {
        debug_assert!(
            self.slots[node.index()].refs.load(Ordering::Acquire) > 0,
            "read of a freed history node {:?}",
            node
        );
        &self.slots[node.index()].value
    }

    /// The predecessor link of a chain node.
    pub fn previous(&self, node: HistoryRef) -> Option<HistoryRef> {
        self.slots[node.index()].previous
    }

    /// Current reference count of a chain node.
    pub fn ref_count(&self, node: HistoryRef) -> u32 {
        self.slots[node.index()].refs.load(Ordering::Acquire)
    }

    /// Number of live (unfreed) chain nodes.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    /// Total slots ever allocated, free or live.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

/// Backtrace entry for the language-model word sequence.
#[derive(Debug, Clone, Copy)]
pub struct LmHistory {
    /// Emitted vocabulary word.
    pub word_id: WordId,
    /// The word's identifier inside the language model.
    pub lm_id: i32,
    /// Frame at which the word started.
    pub word_start_frame: i32,
}

/// Backtrace entry for the recognized word sequence with score bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct WordHistory {
    /// Emitted vocabulary word.
    pub word_id: WordId,
    /// Frame at which the word ended.
    pub end_frame: i32,
    /// Network node where this entry was created.
    pub lex_node_id: NodeId,
    /// Language-model log-probability of this word.
    pub lm_log_prob: f32,
    /// Acoustic log-probability of this word.
    pub am_log_prob: f32,
    /// Cumulative language-model log-probability up to this word.
    pub cum_lm_log_prob: f32,
    /// Cumulative acoustic log-probability up to this word.
    pub cum_am_log_prob: f32,
}

impl HistoryArena<WordHistory> {
    /// Append a word to a word-history chain, carrying the cumulative scores
    /// forward from the predecessor.
    pub fn push_word(
        &mut self,
        word_id: WordId,
        end_frame: i32,
        lex_node_id: NodeId,
        lm_log_prob: f32,
        am_log_prob: f32,
        previous: Option<HistoryRef>,
    ) -> HistoryRef {
        let (prev_lm, prev_am) = previous.map_or((0.0, 0.0), |p| {
            let prev = self.get(p);
            (prev.cum_lm_log_prob, prev.cum_am_log_prob)
        });
        self.alloc(
            WordHistory {
                word_id,
                end_frame,
                lex_node_id,
                lm_log_prob,
                am_log_prob,
                cum_lm_log_prob: prev_lm + lm_log_prob,
                cum_am_log_prob: prev_am + am_log_prob,
            },
            previous,
        )
    }
}

/// Backtrace entry for the acoustic state sequence.
#[derive(Debug, Clone, Copy)]
pub struct StateHistory {
    /// Acoustic model index of the entered state.
    pub model: i32,
    /// Frame at which the state was entered.
    pub start_time: i32,
    /// Accumulated log-probability at entry.
    pub log_prob: f32,
}

/// Per-hypothesis search record.
///
/// Tokens are owned by the external search loop and scoped to one decoding
/// pass; the core's contract toward them is the node/arc graph they traverse
/// and the history-chain discipline above. A token attached to a node is
/// threaded through that node's token list via `next_node_token`.
#[derive(Debug, Clone)]
pub struct Token {
    /// Node the token currently occupies.
    pub node: NodeId,
    /// Next token attached to the same node, if any.
    pub next_node_token: Option<u32>,
    /// Cumulative acoustic log-probability.
    pub am_log_prob: f32,
    /// Cumulative language-model log-probability.
    pub lm_log_prob: f32,
    /// Acoustic log-probability inside the current node.
    pub cur_am_log_prob: f32,
    /// Lookahead-adjusted language-model log-probability.
    pub cur_lm_log_prob: f32,
    /// Combined score used for pruning comparisons.
    pub total_log_prob: f32,
    /// Language-model backtrace.
    pub lm_history: Option<HistoryRef>,
    /// Hash code of the bounded word history, keys the lookahead caches.
    pub lm_hist_code: u64,
    /// Word backtrace.
    pub word_history: Option<HistoryRef>,
    /// State backtrace.
    pub state_history: Option<HistoryRef>,
    /// Frame at which the current word started.
    pub word_start_frame: i32,
    /// Number of words emitted so far.
    pub word_count: u32,
    /// Depth in the current chain.
    pub depth: u8,
    /// Duration in the current state.
    pub dur: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lm_entry(word: u32) -> LmHistory {
        LmHistory {
            word_id: WordId::new(word),
            lm_id: word as i32,
            word_start_frame: 0,
        }
    }

    #[test]
    fn test_alloc_links_predecessor() {
        let mut arena = HistoryArena::new();
        let a = arena.alloc(lm_entry(1), None);
        let b = arena.alloc(lm_entry(2), Some(a));
        // a holds: the caller's handle plus b's predecessor link.
        assert_eq!(arena.ref_count(a), 2);
        assert_eq!(arena.ref_count(b), 1);
        assert_eq!(arena.previous(b), Some(a));
        assert_eq!(arena.live(), 2);
    }

    #[test]
    fn test_release_is_transitive() {
        let mut arena = HistoryArena::new();
        let a = arena.alloc(lm_entry(1), None);
        let b = arena.alloc(lm_entry(2), Some(a));
        let c = arena.alloc(lm_entry(3), Some(b));
        arena.release(a);
        arena.release(b);
        // Only c's handle keeps the whole chain alive now.
        assert_eq!(arena.live(), 3);
        arena.release(c);
        assert_eq!(arena.live(), 0);
        assert_eq!(arena.capacity(), 3);
    }

    #[test]
    fn test_shared_suffix_survives_partial_release() {
        let mut arena = HistoryArena::new();
        let common = arena.alloc(lm_entry(1), None);
        let left = arena.alloc(lm_entry(2), Some(common));
        let right = arena.alloc(lm_entry(3), Some(common));
        arena.release(common);
        arena.release(left);
        // The shared suffix must survive as long as one branch references it.
        assert_eq!(arena.get(common).word_id, WordId::new(1));
        assert_eq!(arena.ref_count(common), 1);
        arena.release(right);
        assert_eq!(arena.live(), 0);
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let mut arena = HistoryArena::new();
        let a = arena.alloc(lm_entry(1), None);
        arena.release(a);
        let b = arena.alloc(lm_entry(2), None);
        assert_eq!(arena.capacity(), 1);
        assert_eq!(arena.get(b).word_id, WordId::new(2));
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn test_double_release_panics() {
        let mut arena = HistoryArena::new();
        let a = arena.alloc(lm_entry(1), None);
        arena.release(a);
        arena.release(a);
    }

    #[test]
    fn test_word_history_accumulates_scores() {
        let mut arena: HistoryArena<WordHistory> = HistoryArena::new();
        let first = arena.push_word(WordId::new(1), 10, NodeId::new(0), -2.0, -30.0, None);
        let second = arena.push_word(WordId::new(2), 25, NodeId::new(0), -1.5, -20.0, Some(first));
        let entry = arena.get(second);
        assert!((entry.cum_lm_log_prob - (-3.5)).abs() < 1e-6);
        assert!((entry.cum_am_log_prob - (-50.0)).abs() < 1e-6);
    }
}
