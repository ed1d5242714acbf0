//! The shared lexical prefix network.
//!
//! [`LexNetwork`] compiles word pronunciations, each an ordered sequence of
//! acoustic model chains, into a single shared search graph. Insertion
//! maximizes structural sharing: a state reuses an existing node when an
//! identical acoustic state is reachable from the same parent with the same
//! transition probability. After all words are inserted, [`LexNetwork::finish`]
//! resolves word boundaries, either directly in the tree or through the
//! cross-word fan network (see [`super::cross_word`]).
//!
//! Construction is single-threaded and run-to-completion; the finished graph
//! is read-only for the search loop except for per-utterance token-list
//! pointers, which are cleared between utterances.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::{NetworkError, Result};
use crate::hmm::{Hmm, HmmInventory, FIRST_EMITTING_STATE, SINK_STATE};
use crate::lm::LanguageModel;
use crate::types::{HmmId, NodeId, WordId};

use super::cross_word::{self, fan_key, FanKey};
use super::lookahead::{LookaheadCache, LookaheadMode};
use super::node::{flags, AcousticState, Arc, Node};

/// Tolerance for treating two transition log-probabilities as identical
/// when deciding whether a node can be shared.
const LOG_PROB_EPSILON: f32 = 1e-4;

fn same_log_prob(a: f32, b: f32) -> bool {
    (a - b).abs() <= LOG_PROB_EPSILON
}

/// A chain of freshly created nodes for one model, before entry linking.
pub(super) struct BuiltChain {
    /// One node per emitting state, in chain order.
    pub nodes: Vec<NodeId>,
    /// Source-state transitions as (emitting-state offset, log-prob) pairs.
    pub entries: Vec<(usize, f32)>,
    /// Sink transitions as (node, log-prob) pairs.
    pub exits: Vec<(NodeId, f32)>,
    /// Direct source-to-sink log-probability, if the model can be skipped
    /// entirely.
    pub tee_log_prob: Option<f32>,
}

/// The shared lexical prefix network.
pub struct LexNetwork {
    config: NetworkConfig,
    inventory: HmmInventory,
    nodes: Vec<Node>,
    root: NodeId,
    end: NodeId,
    start: NodeId,
    final_node: NodeId,
    silence_node: Option<NodeId>,
    last_silence_node: Option<NodeId>,
    words: u32,
    finished: bool,

    // Cross-word bookkeeping accumulated during insertion and drained by the
    // finishing pass.
    pub(super) interior_roots: HashMap<FanKey, NodeId>,
    pub(super) fan_in_targets: HashMap<FanKey, Vec<NodeId>>,
    pub(super) pending_fan_out: Vec<(NodeId, FanKey)>,
    pub(super) pending_single: Vec<(WordId, String)>,
    pub(super) word_end_nodes: Vec<NodeId>,
}

impl LexNetwork {
    /// Create an empty network over the given model inventory.
    pub fn new(config: NetworkConfig, mut inventory: HmmInventory) -> Result<Self> {
        config.validate()?;
        inventory.set_ignore_case(config.ignore_case);
        let mut net = Self {
            config,
            inventory,
            nodes: Vec::new(),
            root: NodeId::new(0),
            end: NodeId::new(1),
            start: NodeId::new(2),
            final_node: NodeId::new(3),
            silence_node: None,
            last_silence_node: None,
            words: 0,
            finished: false,
            interior_roots: HashMap::new(),
            fan_in_targets: HashMap::new(),
            pending_fan_out: Vec::new(),
            pending_single: Vec::new(),
            word_end_nodes: Vec::new(),
        };
        net.root = net.new_node(None, None);
        net.end = net.new_node(None, None);
        net.start = net.new_node(None, None);
        net.final_node = net.new_node(None, None);
        let final_node = net.final_node;
        net.node_mut(final_node).set_flag(flags::FINAL);
        Ok(net)
    }

    /// The tree root: re-entry point between words.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Where decoding begins (sentence-start silence enters here).
    pub fn start_node(&self) -> NodeId {
        self.start
    }

    /// Collector for utterance-final word ends.
    pub fn end_node(&self) -> NodeId {
        self.end
    }

    /// Where decoding must terminate.
    pub fn final_node(&self) -> NodeId {
        self.final_node
    }

    /// Head of the sentence-start silence chain, if a silence model is loaded.
    pub fn silence_node(&self) -> Option<NodeId> {
        self.silence_node
    }

    /// Head of the utterance-final silence chain, if a silence model is loaded.
    pub fn last_silence_node(&self) -> Option<NodeId> {
        self.last_silence_node
    }

    /// Largest inserted word identifier plus one.
    pub fn words(&self) -> u32 {
        self.words
    }

    /// True once the finishing pass has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read access to a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Number of nodes in the arena.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all nodes.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// The model inventory backing this network.
    pub fn inventory(&self) -> &HmmInventory {
        &self.inventory
    }

    /// The construction-time configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(super) fn new_node(
        &mut self,
        word_id: Option<WordId>,
        state: Option<AcousticState>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, word_id, state));
        id
    }

    /// Add an arc, skipping exact duplicates produced by re-walking a shared
    /// prefix.
    pub(super) fn add_arc(&mut self, from: NodeId, to: NodeId, log_prob: f32) {
        let node = &mut self.nodes[from.index()];
        if node
            .arcs
            .iter()
            .any(|a| a.target == to && same_log_prob(a.log_prob, log_prob))
        {
            return;
        }
        node.arcs.push(Arc {
            log_prob,
            target: to,
        });
    }

    /// Insert one word's pronunciation into the network.
    ///
    /// Words may be inserted in any order. Must be called for every word
    /// before [`finish`](Self::finish).
    pub fn add_word(&mut self, chain: &[HmmId], word_id: WordId) -> Result<()> {
        if self.finished {
            return Err(NetworkError::AlreadyFinished);
        }
        if chain.is_empty() {
            return Err(NetworkError::EmptyChain {
                word: word_id.value(),
            });
        }
        debug!(word = word_id.value(), units = chain.len(), "adding word");
        self.words = self.words.max(word_id.value() + 1);
        let cross_word = self.config.cross_word_triphones
            && chain.iter().all(|&h| self.inventory.hmm(h).is_triphone());
        if cross_word {
            self.add_word_cross(chain, word_id)
        } else {
            self.add_word_in_tree(chain, word_id)
        }
    }

    /// Insert a word by model labels, resolving them through the inventory.
    pub fn add_word_by_labels(&mut self, labels: &[&str], word_id: WordId) -> Result<()> {
        let chain = labels
            .iter()
            .map(|l| self.inventory.by_label(l))
            .collect::<Result<Vec<_>>>()?;
        self.add_word(&chain, word_id)
    }

    /// Word boundaries resolved directly within the prefix tree: the word's
    /// whole chain hangs off the root and its end node loops back there.
    fn add_word_in_tree(&mut self, chain: &[HmmId], word_id: WordId) -> Result<()> {
        let mut entries = vec![(self.root, 0.0f32)];
        for (i, &hmm_id) in chain.iter().enumerate() {
            let head_flags = if i == 0 { flags::FIRST_STATE_OF_WORD } else { 0 };
            let (nodes, exits) = self.insert_chain(&entries, hmm_id, head_flags)?;
            self.attach_reachable_word(&nodes, word_id, i == 0);
            entries = exits;
        }
        let word_end = self.new_node(Some(word_id), None);
        self.node_mut(word_end).set_flag(flags::USE_WORD_END_BEAM);
        if self.config.sentence_end_id == Some(word_id.value()) {
            self.node_mut(word_end).set_flag(flags::FINAL);
            self.add_arc(word_end, self.final_node, 0.0);
        }
        for (node, log_prob) in entries {
            self.add_arc(node, word_end, log_prob);
        }
        self.add_arc(word_end, self.root, 0.0);
        self.add_arc(word_end, self.end, 0.0);
        self.word_end_nodes.push(word_end);
        Ok(())
    }

    /// Cross-word insertion: the word-initial and word-final units are left
    /// to the fan network; only the fixed-context interior goes into the
    /// tree, rooted at a per-context connection node.
    fn add_word_cross(&mut self, chain: &[HmmId], word_id: WordId) -> Result<()> {
        let centers: Vec<String> = chain
            .iter()
            .map(|&h| self.inventory.hmm(h).center().to_string())
            .collect();
        let n = centers.len();
        if n == 1 {
            self.pending_single.push((word_id, centers[0].clone()));
            return Ok(());
        }
        let first_key = fan_key(&centers[0], &centers[1]);
        let last_key = fan_key(&centers[n - 2], &centers[n - 1]);

        let word_end;
        if n >= 3 {
            let conn = match self.interior_roots.get(&first_key) {
                Some(&c) => c,
                None => {
                    let c = self.new_node(None, None);
                    self.node_mut(c).set_flag(flags::FAN_IN_CONNECTION);
                    self.interior_roots.insert(first_key.clone(), c);
                    self.fan_in_targets
                        .entry(first_key.clone())
                        .or_default()
                        .push(c);
                    c
                }
            };
            let mut entries = vec![(conn, 0.0f32)];
            for (i, &hmm_id) in chain[1..n - 1].iter().enumerate() {
                let (nodes, exits) = self.insert_chain(&entries, hmm_id, 0)?;
                self.attach_reachable_word(&nodes, word_id, i == 0);
                entries = exits;
            }
            word_end = self.new_node(Some(word_id), None);
            self.node_mut(word_end).set_flag(flags::USE_WORD_END_BEAM);
            for (node, log_prob) in entries {
                self.add_arc(node, word_end, log_prob);
            }
        } else {
            // Two-unit word: no fixed-context interior exists, so the word
            // end itself is the connection point between the fan networks.
            word_end = self.new_node(Some(word_id), None);
            self.node_mut(word_end)
                .set_flag(flags::USE_WORD_END_BEAM | flags::FAN_IN_CONNECTION);
            self.fan_in_targets
                .entry(first_key.clone())
                .or_default()
                .push(word_end);
        }
        if self.config.sentence_end_id == Some(word_id.value()) {
            self.node_mut(word_end).set_flag(flags::FINAL);
            self.add_arc(word_end, self.final_node, 0.0);
        }
        self.pending_fan_out.push((word_end, last_key));
        self.word_end_nodes.push(word_end);
        Ok(())
    }

    fn attach_reachable_word(&mut self, nodes: &[NodeId], word_id: WordId, first_chain: bool) {
        let attach = match self.config.lookahead {
            LookaheadMode::Full => true,
            LookaheadMode::FirstSubtree => first_chain,
            LookaheadMode::Disabled => false,
        };
        if !attach {
            return;
        }
        for &id in nodes {
            let node = self.node_mut(id);
            if !node.possible_words.contains(&word_id) {
                node.possible_words.push(word_id);
            }
        }
    }

    /// Insert one model chain starting from the given entry arcs, reusing an
    /// existing node chain when the sharing criterion holds.
    ///
    /// Returns the node per emitting state and the pending exit arcs toward
    /// whatever follows the chain.
    fn insert_chain(
        &mut self,
        entries: &[(NodeId, f32)],
        hmm_id: HmmId,
        head_flags: u16,
    ) -> Result<(Vec<NodeId>, Vec<(NodeId, f32)>)> {
        let share_safe = self.inventory.hmm(hmm_id).source_is_share_safe();
        if share_safe {
            if let Some(mapping) = self.try_share_chain(entries, hmm_id) {
                let hmm = self.inventory.hmm(hmm_id);
                let entry_lp = source_entry_log_prob(hmm);
                let tee = source_tee_log_prob(hmm);
                let mut exits = Vec::new();
                for (offset, state) in hmm.emitting_states().iter().enumerate() {
                    for t in &state.transitions {
                        if t.target == SINK_STATE {
                            exits.push((mapping[offset], t.log_prob));
                        }
                    }
                }
                if let Some(tee_lp) = tee {
                    for &(node, log_prob) in entries {
                        exits.push((node, log_prob + tee_lp));
                    }
                }
                let head = mapping[0];
                for &(node, log_prob) in entries {
                    self.add_arc(node, head, log_prob + entry_lp);
                }
                self.node_mut(head).set_flag(head_flags);
                return Ok((mapping, exits));
            }
        }

        let built = self.build_chain_nodes(hmm_id, flags::NORMAL)?;
        self.node_mut(built.nodes[0]).set_flag(head_flags);
        let exits = self.connect_entries(entries, &built);
        Ok((built.nodes, exits))
    }

    /// Try to reuse an existing node chain for this model.
    ///
    /// Sharing requires that the last entry node already has a child with the
    /// chain's first emission model reachable via the same transition
    /// probability; the rest of the chain is then verified state by state.
    /// The criterion rests on the assumption that states with identical
    /// emission models have identical outgoing transition structure.
    fn try_share_chain(&self, entries: &[(NodeId, f32)], hmm_id: HmmId) -> Option<Vec<NodeId>> {
        let hmm = self.inventory.hmm(hmm_id);
        let models: Vec<i32> = hmm.emitting_states().iter().map(|s| s.model).collect();
        let entry_lp = source_entry_log_prob(hmm);
        let &(parent, parent_lp) = entries.last()?;

        let unshareable = flags::FAN_OUT | flags::FAN_IN | flags::USE_WORD_END_BEAM;
        let head = self.node(parent).arcs.iter().find_map(|arc| {
            if arc.target == parent {
                return None;
            }
            let candidate = self.node(arc.target);
            (candidate.emission_model() == Some(models[0])
                && same_log_prob(arc.log_prob, parent_lp + entry_lp)
                && !candidate.has_flag(unshareable))
            .then_some(arc.target)
        })?;

        let mut mapping = vec![head];
        for k in 1..models.len() {
            let mut found = None;
            'search: for j in 0..k {
                for t in &hmm.states[FIRST_EMITTING_STATE + j].transitions {
                    if t.target != FIRST_EMITTING_STATE + k {
                        continue;
                    }
                    for arc in &self.node(mapping[j]).arcs {
                        if arc.target == mapping[j] || mapping.contains(&arc.target) {
                            continue;
                        }
                        let candidate = self.node(arc.target);
                        if candidate.emission_model() == Some(models[k])
                            && same_log_prob(arc.log_prob, t.log_prob)
                            && !candidate.has_flag(unshareable)
                        {
                            found = Some(arc.target);
                            break 'search;
                        }
                    }
                }
            }
            mapping.push(found?);
        }
        Some(mapping)
    }

    /// Create fresh nodes and intra-chain arcs for one model, without linking
    /// any entry arcs yet.
    pub(super) fn build_chain_nodes(&mut self, hmm_id: HmmId, base_flags: u16) -> Result<BuiltChain> {
        let hmm = self.inventory.hmm(hmm_id);
        let label = hmm.label.clone();
        let states = hmm.states.clone();
        let num_emitting = states.len() - FIRST_EMITTING_STATE;
        if num_emitting == 0 {
            return Err(NetworkError::ChainTopology(format!(
                "model '{}' has no emitting states",
                label
            )));
        }

        let mut nodes = Vec::with_capacity(num_emitting);
        for (offset, state) in states[FIRST_EMITTING_STATE..].iter().enumerate() {
            let id = self.new_node(
                None,
                Some(AcousticState {
                    hmm: hmm_id,
                    state_index: FIRST_EMITTING_STATE + offset,
                    model: state.model,
                }),
            );
            self.node_mut(id).set_flag(base_flags);
            nodes.push(id);
        }

        let mut entries = Vec::new();
        let mut tee_log_prob = None;
        for t in &states[crate::hmm::SOURCE_STATE].transitions {
            if t.target == SINK_STATE {
                tee_log_prob = Some(t.log_prob);
            } else {
                entries.push((t.target - FIRST_EMITTING_STATE, t.log_prob));
            }
        }

        let mut exits = Vec::new();
        for (offset, state) in states[FIRST_EMITTING_STATE..].iter().enumerate() {
            for t in &state.transitions {
                if t.target == SINK_STATE {
                    exits.push((nodes[offset], t.log_prob));
                } else {
                    // Self-loops and forward transitions, including skips
                    // that bypass one or more states.
                    let target = nodes[t.target - FIRST_EMITTING_STATE];
                    self.add_arc(nodes[offset], target, t.log_prob);
                }
            }
        }

        Ok(BuiltChain {
            nodes,
            entries,
            exits,
            tee_log_prob,
        })
    }

    /// Link pending entry arcs into a freshly built chain and compute the
    /// pending exits, including pass-through for skippable models.
    pub(super) fn connect_entries(
        &mut self,
        entries: &[(NodeId, f32)],
        built: &BuiltChain,
    ) -> Vec<(NodeId, f32)> {
        for &(offset, source_lp) in &built.entries {
            for &(node, log_prob) in entries {
                self.add_arc(node, built.nodes[offset], log_prob + source_lp);
            }
        }
        let mut exits = built.exits.clone();
        if let Some(tee_lp) = built.tee_log_prob {
            for &(node, log_prob) in entries {
                exits.push((node, log_prob + tee_lp));
            }
        }
        exits
    }

    /// Run the finishing pass: silence paths, word-boundary resolution, and
    /// lookahead cache allocation. Must be called exactly once, after all
    /// words are inserted.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(NetworkError::AlreadyFinished);
        }
        self.build_silence_paths()?;
        if self.config.cross_word_triphones {
            cross_word::build(self)?;
        } else if self.config.optional_short_silence {
            self.splice_in_tree_short_silence()?;
        }
        if self.config.lookahead.is_enabled() {
            self.set_lookahead_cache_sizes(self.config.lookahead_cache_size);
        }
        self.finished = true;
        let stats = self.analyze();
        info!(
            words = self.words,
            nodes = stats.total_nodes,
            arcs = stats.total_arcs,
            fan_out_nodes = stats.fan_out_nodes,
            fan_in_nodes = stats.fan_in_nodes,
            "lexical network finished"
        );
        Ok(())
    }

    /// Connect the start, end, and final markers through the silence model,
    /// and insert silence as a word when configured.
    fn build_silence_paths(&mut self) -> Result<()> {
        let silence = self.inventory.by_label(&self.config.silence_label).ok();
        match silence {
            Some(silence_id) => {
                let (nodes, exits) = self.insert_chain(&[(self.start, 0.0)], silence_id, 0)?;
                self.node_mut(nodes[0]).set_flag(flags::SILENCE_FIRST);
                self.silence_node = Some(nodes[0]);
                let root = self.root;
                for (node, log_prob) in exits {
                    self.add_arc(node, root, log_prob);
                }

                let (nodes, exits) = self.insert_chain(&[(self.end, 0.0)], silence_id, 0)?;
                self.last_silence_node = Some(nodes[0]);
                let final_node = self.final_node;
                for (node, log_prob) in exits {
                    self.add_arc(node, final_node, log_prob);
                }

                if self.config.silence_is_word {
                    if let Some(id) = self.config.silence_word_id {
                        let word = WordId::new(id);
                        self.words = self.words.max(id + 1);
                        self.add_word_in_tree(&[silence_id], word)?;
                    }
                }
            }
            None => {
                debug!(
                    label = %self.config.silence_label,
                    "no silence model loaded, boundary markers linked directly"
                );
                self.add_arc(self.start, self.root, 0.0);
                self.add_arc(self.end, self.final_node, 0.0);
            }
        }
        Ok(())
    }

    /// Optional short silence between words when boundaries are resolved in
    /// the tree: one shared silence state spliced as an alternative path from
    /// every word end back to the root.
    fn splice_in_tree_short_silence(&mut self) -> Result<()> {
        let silence_id = self.inventory.by_label(&self.config.silence_label)?;
        let silence_node = self.short_silence_node(silence_id)?;
        let root = self.root;
        self.add_arc(silence_node, root, 0.0);
        for word_end in self.word_end_nodes.clone() {
            self.add_arc(word_end, silence_node, 0.0);
        }
        Ok(())
    }

    /// Create a single-state optional silence node from the silence model's
    /// first emitting state.
    pub(super) fn short_silence_node(&mut self, silence_id: HmmId) -> Result<NodeId> {
        let hmm = self.inventory.hmm(silence_id);
        let state = hmm.states[FIRST_EMITTING_STATE].clone();
        let node = self.new_node(
            None,
            Some(AcousticState {
                hmm: silence_id,
                state_index: FIRST_EMITTING_STATE,
                model: state.model,
            }),
        );
        self.node_mut(node).set_flag(flags::SILENCE_FIRST);
        let self_loop = state
            .transitions
            .iter()
            .find(|t| t.target == FIRST_EMITTING_STATE)
            .map(|t| t.log_prob)
            .unwrap_or(-0.693);
        self.add_arc(node, node, self_loop);
        Ok(node)
    }

    /// Apply one lookahead cache capacity to every node carrying a
    /// reachable-word list. Existing cache contents are dropped.
    pub fn set_lookahead_cache_sizes(&mut self, capacity: usize) {
        for node in &mut self.nodes {
            if node.possible_words.is_empty() {
                continue;
            }
            match &mut node.lookahead {
                Some(cache) => cache.resize(capacity),
                None => node.lookahead = Some(LookaheadCache::new(capacity)),
            }
        }
    }

    /// Lookahead score for a node under a bounded word context, filling the
    /// node's cache on a miss.
    ///
    /// `history_code` identifies the bounded context and keys the cache;
    /// nodes without a reachable-word list score zero.
    pub fn lookahead_score(
        &mut self,
        node_id: NodeId,
        history_code: u64,
        context: &[WordId],
        lm: &dyn LanguageModel,
    ) -> f32 {
        let node = &self.nodes[node_id.index()];
        if node.possible_words.is_empty() {
            return 0.0;
        }
        if let Some(cache) = &node.lookahead {
            if let Some(score) = cache.find(history_code) {
                return score;
            }
        }
        let mut best = f32::NEG_INFINITY;
        for &word in &node.possible_words {
            best = best.max(lm.lookahead_log_prob(context, word));
        }
        if let Some(cache) = &mut self.nodes[node_id.index()].lookahead {
            cache.insert(history_code, best);
        }
        best
    }

    /// Discard lookahead caches deep in the graph or past small-delta
    /// branches, bounding total cache memory against fan-out.
    ///
    /// Walks from the root tracking cumulative depth and the reachable-word
    /// count delta relative to the nearest cached ancestor; a node's cache is
    /// dropped once `depth > max_depth` or the delta falls under `min_delta`.
    /// The pass is idempotent and safe to re-run after reconfiguration.
    pub fn prune_lookahead_buffers(&mut self, min_delta: usize, max_depth: usize) -> Result<()> {
        if !self.finished {
            return Err(NetworkError::NotFinished);
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![(self.root, self.words as usize, 0usize)];
        visited[self.root.index()] = true;
        let mut pruned = 0usize;
        while let Some((id, last_size, depth)) = stack.pop() {
            let mut next_size = last_size;
            let node = &self.nodes[id.index()];
            if !node.possible_words.is_empty() {
                let size = node.possible_words.len();
                let delta = last_size.saturating_sub(size);
                if depth > max_depth || delta < min_delta {
                    if self.nodes[id.index()].lookahead.take().is_some() {
                        pruned += 1;
                    }
                } else {
                    next_size = size;
                }
            }
            let targets: Vec<NodeId> = self.nodes[id.index()]
                .arcs
                .iter()
                .map(|a| a.target)
                .collect();
            for target in targets {
                if !visited[target.index()] {
                    visited[target.index()] = true;
                    stack.push((target, next_size, depth + 1));
                }
            }
        }
        debug!(pruned, min_delta, max_depth, "lookahead buffers pruned");
        Ok(())
    }

    /// Head index of a node's per-utterance token list.
    pub fn token_list(&self, node: NodeId) -> Option<u32> {
        self.nodes[node.index()].token_list
    }

    /// Attach a token-list head to a node during decoding.
    pub fn set_token_list(&mut self, node: NodeId, head: Option<u32>) {
        self.nodes[node.index()].token_list = head;
    }

    /// Clear every node's token list between utterances.
    pub fn clear_token_lists(&mut self) {
        for node in &mut self.nodes {
            node.token_list = None;
        }
    }
}

fn source_entry_log_prob(hmm: &Hmm) -> f32 {
    hmm.states[crate::hmm::SOURCE_STATE]
        .transitions
        .iter()
        .find(|t| t.target == FIRST_EMITTING_STATE)
        .map(|t| t.log_prob)
        .unwrap_or(0.0)
}

fn source_tee_log_prob(hmm: &Hmm) -> Option<f32> {
    hmm.states[crate::hmm::SOURCE_STATE]
        .transitions
        .iter()
        .find(|t| t.target == SINK_STATE)
        .map(|t| t.log_prob)
}
