//! Cross-word fan-out/fan-in network construction.
//!
//! The correct acoustic realization of a word's boundary units depends on the
//! adjacent word. Rather than growing a boundary variant per word pair, the
//! finishing pass factors the boundary region into two independent
//! context-keyed subnetworks, each built once per distinct boundary context:
//!
//! - **Fan-out**: a word ending with units `(a, b)` exits through a bundle of
//!   chains, one per available right context `r` (triphones `a-b+r`), entered
//!   under key `(a, b)` and terminating toward boundary key `(b, r)`.
//! - **Fan-in**: a word starting with units `(c, d)` is entered through
//!   chains `l-c+d` for every available left context `l`, entered under
//!   boundary key `(l, c)` and exiting into the tree where the word-initial
//!   context `(c, d)` is resolved.
//!
//! The linking pass then connects every fan-out terminal bundle to every
//! fan-in entry bundle with a matching boundary key, materializing an
//! O(contexts squared), not O(words squared), combination. Single-unit words
//! cannot be split into a fan part and a fixed-context part and are spliced
//! directly as fan-out-to-fan-in bridges keyed by both neighboring contexts.
//!
//! All keyed collections here are scratch state owned by the finishing pass;
//! they are dropped once linking completes and only the stitched graph
//! remains.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{NetworkError, Result};
use crate::hmm::triphone_parts;
use crate::types::{HmmId, NodeId, WordId};

use super::node::flags;
use super::tree::LexNetwork;

/// Boundary context key: the two unit labels adjacent to a word boundary.
pub(super) type FanKey = (String, String);

/// Build a boundary context key.
pub(super) fn fan_key(a: &str, b: &str) -> FanKey {
    (a.to_string(), b.to_string())
}

/// One realized fan chain for a single context-dependent unit.
struct FanChain {
    entry: NodeId,
    entry_log_prob: f32,
    terminals: Vec<(NodeId, f32)>,
}

/// Scratch state of the finishing pass.
struct CrossWordBuilder<'a> {
    net: &'a mut LexNetwork,
    triphones: Vec<(HmmId, String, String, String)>,
    silence_center: String,
    /// Units that can end a word; left contexts outside this set need no
    /// fan-in chains.
    viable_last: std::collections::HashSet<String>,
    /// Units that can start a word; right contexts outside this set need no
    /// fan-out chains.
    viable_first: std::collections::HashSet<String>,

    fan_out_entry: HashMap<FanKey, Vec<(NodeId, f32)>>,
    fan_out_last: HashMap<FanKey, Vec<(NodeId, f32)>>,
    fan_in_entry: HashMap<FanKey, Vec<(NodeId, f32)>>,
    fan_in_last: HashMap<FanKey, Vec<(NodeId, f32)>>,
    connections: HashMap<FanKey, Vec<NodeId>>,
}

/// Run cross-word network construction on a network whose words have all
/// been inserted. Called exactly once from the finishing pass.
pub(super) fn build(net: &mut LexNetwork) -> Result<()> {
    let connections = std::mem::take(&mut net.fan_in_targets);
    let pending_fan_out = std::mem::take(&mut net.pending_fan_out);
    let pending_single = std::mem::take(&mut net.pending_single);
    net.interior_roots.clear();

    if connections.is_empty() && pending_fan_out.is_empty() && pending_single.is_empty() {
        return Ok(());
    }

    let triphones: Vec<(HmmId, String, String, String)> = net
        .inventory()
        .iter()
        .filter_map(|(id, hmm)| {
            triphone_parts(&hmm.label)
                .map(|(l, c, r)| (id, l.to_string(), c.to_string(), r.to_string()))
        })
        .collect();

    let silence_center = net.config().silence_label.clone();
    let mut viable_last: std::collections::HashSet<String> = pending_fan_out
        .iter()
        .map(|(_, (_, b))| b.clone())
        .collect();
    let mut viable_first: std::collections::HashSet<String> =
        connections.keys().map(|(c, _)| c.clone()).collect();
    for (_, center) in &pending_single {
        viable_last.insert(center.clone());
        viable_first.insert(center.clone());
    }

    let mut builder = CrossWordBuilder {
        net,
        triphones,
        silence_center,
        viable_last,
        viable_first,
        fan_out_entry: HashMap::new(),
        fan_out_last: HashMap::new(),
        fan_in_entry: HashMap::new(),
        fan_in_last: HashMap::new(),
        connections,
    };

    builder.build_fan_in_network()?;
    builder.build_single_unit_bridges(&pending_single)?;
    builder.build_fan_out_network(&pending_fan_out)?;
    builder.link_fan_out_to_fan_in()?;
    builder.link_fan_in_to_tree();
    builder.link_root_entries();

    debug!(
        fan_out_bundles = builder.fan_out_entry.len(),
        fan_in_bundles = builder.fan_in_entry.len(),
        boundary_keys = builder.fan_out_last.len(),
        "cross-word network linked"
    );
    // Builder drop frees every scratch collection; only the stitched graph
    // stays reachable from the root and start nodes.
    Ok(())
}

impl CrossWordBuilder<'_> {
    fn left_is_viable(&self, left: &str) -> bool {
        self.viable_last.contains(left) || left == self.silence_center
    }

    fn right_is_viable(&self, right: &str) -> bool {
        self.viable_first.contains(right) || right == self.silence_center
    }

    fn build_fan_chain(&mut self, hmm_id: HmmId, base_flags: u16, first_flags: u16) -> Result<FanChain> {
        let built = self.net.build_chain_nodes(hmm_id, base_flags)?;
        self.net.node_mut(built.nodes[0]).set_flag(first_flags);
        let entry_log_prob = built
            .entries
            .iter()
            .find(|(offset, _)| *offset == 0)
            .map(|&(_, lp)| lp)
            .unwrap_or(0.0);
        Ok(FanChain {
            entry: built.nodes[0],
            entry_log_prob,
            terminals: built.exits,
        })
    }

    fn boundary_marker_flag(&self) -> u16 {
        if self.net.config().word_boundary_id.is_some() {
            flags::INSERT_WORD_BOUNDARY
        } else {
            0
        }
    }

    /// Build fan-in chains for every word-initial context actually produced
    /// by some inserted word.
    fn build_fan_in_network(&mut self) -> Result<()> {
        let mut covered: std::collections::HashSet<FanKey> = std::collections::HashSet::new();
        for i in 0..self.triphones.len() {
            let (id, left, center, right) = self.triphones[i].clone();
            let exit_key = fan_key(&center, &right);
            if !self.connections.contains_key(&exit_key) || !self.left_is_viable(&left) {
                continue;
            }
            let chain = self.build_fan_chain(
                id,
                flags::FAN_IN,
                flags::FAN_IN_FIRST | flags::FIRST_STATE_OF_WORD,
            )?;
            self.fan_in_entry
                .entry(fan_key(&left, &center))
                .or_default()
                .push((chain.entry, chain.entry_log_prob));
            self.fan_in_last
                .entry(exit_key.clone())
                .or_default()
                .extend(chain.terminals);
            covered.insert(exit_key);
        }
        for key in self.connections.keys() {
            if !covered.contains(key) {
                return Err(NetworkError::MissingModel {
                    label: format!("*-{}+{}", key.0, key.1),
                });
            }
        }
        Ok(())
    }

    /// Splice single-unit words directly as fan-out-to-fan-in bridges keyed
    /// by both neighboring contexts.
    fn build_single_unit_bridges(&mut self, pending: &[(WordId, String)]) -> Result<()> {
        for (word_id, center) in pending {
            let mut realized = false;
            for i in 0..self.triphones.len() {
                let (id, left, c, right) = self.triphones[i].clone();
                if &c != center || !self.left_is_viable(&left) || !self.right_is_viable(&right) {
                    continue;
                }
                let chain = self.build_fan_chain(
                    id,
                    flags::FAN_IN | flags::FAN_OUT,
                    flags::FAN_IN_FIRST
                        | flags::FIRST_STATE_OF_WORD
                        | self.boundary_marker_flag(),
                )?;
                let word_end = self.net.new_node(Some(*word_id), None);
                self.net
                    .node_mut(word_end)
                    .set_flag(flags::USE_WORD_END_BEAM | flags::FAN_OUT);
                for (terminal, log_prob) in chain.terminals {
                    self.net.add_arc(terminal, word_end, log_prob);
                }
                self.fan_in_entry
                    .entry(fan_key(&left, center))
                    .or_default()
                    .push((chain.entry, chain.entry_log_prob));
                if right == self.silence_center {
                    let end = self.net.end_node();
                    self.net.add_arc(word_end, end, 0.0);
                } else {
                    self.fan_out_last
                        .entry(fan_key(center, &right))
                        .or_default()
                        .push((word_end, 0.0));
                }
                self.net.word_end_nodes.push(word_end);
                realized = true;
            }
            if !realized {
                return Err(NetworkError::MissingModel {
                    label: format!("*-{}+*", center),
                });
            }
        }
        Ok(())
    }

    /// Build fan-out bundles, one per distinct word-final context, and link
    /// every word end into its bundle.
    fn build_fan_out_network(&mut self, pending: &[(NodeId, FanKey)]) -> Result<()> {
        let silence_id = self
            .net
            .inventory()
            .by_label(&self.net.config().silence_label)
            .ok();
        let short_silence = self.net.config().optional_short_silence;
        let mut silence_nodes: HashMap<FanKey, NodeId> = HashMap::new();

        for (word_end, key) in pending {
            if !self.fan_out_entry.contains_key(key) {
                self.build_fan_out_bundle(key)?;
            }
            let entries = self.fan_out_entry[key].clone();
            for &(entry, entry_lp) in &entries {
                self.net.add_arc(*word_end, entry, entry_lp);
            }
            // Optional short silence: an alternative path over one silence
            // state that preserves the boundary context.
            if short_silence {
                if let Some(silence_id) = silence_id {
                    let silence = match silence_nodes.get(key) {
                        Some(&node) => node,
                        None => {
                            let node = self.net.short_silence_node(silence_id)?;
                            for &(entry, entry_lp) in &entries {
                                self.net.add_arc(node, entry, entry_lp);
                            }
                            silence_nodes.insert(key.clone(), node);
                            node
                        }
                    };
                    self.net.add_arc(*word_end, silence, 0.0);
                }
            }
        }
        Ok(())
    }

    fn build_fan_out_bundle(&mut self, key: &FanKey) -> Result<()> {
        let mut entries = Vec::new();
        for i in 0..self.triphones.len() {
            let (id, left, center, right) = self.triphones[i].clone();
            if left != key.0 || center != key.1 || !self.right_is_viable(&right) {
                continue;
            }
            let chain = self.build_fan_chain(
                id,
                flags::FAN_OUT,
                flags::FAN_OUT_FIRST | flags::AFTER_WORD_ID | self.boundary_marker_flag(),
            )?;
            entries.push((chain.entry, chain.entry_log_prob));
            if right == self.silence_center {
                // Utterance-final realization: exits toward the final
                // silence instead of another word.
                let end = self.net.end_node();
                for (terminal, log_prob) in chain.terminals {
                    self.net.add_arc(terminal, end, log_prob);
                }
            } else {
                self.fan_out_last
                    .entry(fan_key(&center, &right))
                    .or_default()
                    .extend(chain.terminals);
            }
        }
        if entries.is_empty() {
            return Err(NetworkError::MissingModel {
                label: format!("{}-{}+*", key.0, key.1),
            });
        }
        self.fan_out_entry.insert(key.clone(), entries);
        Ok(())
    }

    /// The linking pass: connect every fan-out terminal bundle to every
    /// fan-in entry bundle with a compatible boundary key. The arc carries
    /// the out-transition log-probability of the pre-excision arc, composed
    /// with the fan-in chain's own entry transition.
    fn link_fan_out_to_fan_in(&mut self) -> Result<()> {
        for (key, terminals) in &self.fan_out_last {
            let entries = self
                .fan_in_entry
                .get(key)
                .ok_or_else(|| NetworkError::MissingModel {
                    label: format!("{}-{}+*", key.0, key.1),
                })?;
            for &(terminal, out_lp) in terminals {
                for &(entry, entry_lp) in entries {
                    self.net.add_arc(terminal, entry, out_lp + entry_lp);
                }
            }
        }
        Ok(())
    }

    /// Connect fan-in chain terminals back into the prefix tree at the
    /// connection points where word-initial context is resolved.
    fn link_fan_in_to_tree(&mut self) {
        for (key, terminals) in &self.fan_in_last {
            if let Some(targets) = self.connections.get(key) {
                for &(terminal, log_prob) in terminals {
                    for &target in targets {
                        self.net.add_arc(terminal, target, log_prob);
                        self.net.node_mut(target).set_flag(flags::LINKED);
                    }
                }
            }
        }
    }

    /// Words after sentence-start silence enter through fan-in bundles whose
    /// left context is the silence unit.
    fn link_root_entries(&mut self) {
        let root = self.net.root();
        for (key, entries) in &self.fan_in_entry {
            if key.0 == self.silence_center {
                for &(entry, entry_lp) in entries {
                    self.net.add_arc(root, entry, entry_lp);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::hmm::{Hmm, HmmInventory};
    use crate::network::fixtures;
    use crate::network::tree::LexNetwork;

    fn two_word_net() -> LexNetwork {
        let inventory = fixtures::triphones(&["a", "b"]);
        let mut net = LexNetwork::new(fixtures::cross_word_config(), inventory).unwrap();
        net.add_word_by_labels(&["_-a+b", "a-b+_"], WordId::new(0))
            .unwrap();
        net.add_word_by_labels(&["_-b+a", "b-a+_"], WordId::new(1))
            .unwrap();
        net.finish().unwrap();
        net
    }

    #[test]
    fn test_fan_networks_are_built() {
        let net = two_word_net();
        let stats = net.analyze();
        assert!(stats.fan_out_nodes > 0);
        assert!(stats.fan_in_nodes > 0);
        assert_eq!(stats.words, 2);
    }

    #[test]
    fn test_word_ends_enter_fan_out_bundles() {
        let net = two_word_net();
        for word_end in net.iter_nodes().filter(|n| n.word_id.is_some()) {
            let enters_fan_out = word_end
                .arcs
                .iter()
                .any(|a| net.node(a.target).has_flag(flags::FAN_OUT_FIRST));
            assert!(
                enters_fan_out,
                "every word end must reach a fan-out bundle"
            );
        }
    }

    #[test]
    fn test_no_orphaned_boundary() {
        let net = two_word_net();
        // Every fan-out node that exits the fan network must lead to a
        // fan-in entry (or the utterance-end collector): successful linking
        // means no fan-out chain dead-ends at the boundary.
        for node in net.iter_nodes() {
            if !node.has_flag(flags::FAN_OUT) || node.state.is_none() {
                continue;
            }
            let exits: Vec<_> = node
                .arcs
                .iter()
                .filter(|a| {
                    let target = net.node(a.target);
                    target.has_flag(flags::FAN_IN_FIRST)
                        || a.target == net.end_node()
                        || target.word_id.is_some()
                })
                .collect();
            let stays_inside: bool = node.arcs.iter().any(|a| {
                net.node(a.target).has_flag(flags::FAN_OUT) && a.target != node.id
            });
            assert!(
                !exits.is_empty() || stays_inside,
                "fan-out node {} dead-ends",
                node.id
            );
        }
    }

    #[test]
    fn test_root_enters_fan_in_after_silence_context() {
        let net = two_word_net();
        let fan_in_entries: Vec<_> = net
            .node(net.root())
            .arcs
            .iter()
            .filter(|a| net.node(a.target).has_flag(flags::FAN_IN_FIRST))
            .collect();
        assert!(
            !fan_in_entries.is_empty(),
            "words must be reachable from the root through silence-context fan-in chains"
        );
    }

    #[test]
    fn test_fan_out_terminals_link_to_fan_in_entries() {
        let net = two_word_net();
        let mut boundary_links = 0usize;
        for node in net.iter_nodes() {
            if !node.has_flag(flags::FAN_OUT) {
                continue;
            }
            boundary_links += node
                .arcs
                .iter()
                .filter(|a| net.node(a.target).has_flag(flags::FAN_IN_FIRST))
                .count();
        }
        assert!(boundary_links > 0);
    }

    #[test]
    fn test_single_unit_word_becomes_bridge() {
        let inventory = fixtures::triphones(&["a", "b"]);
        let mut net = LexNetwork::new(fixtures::cross_word_config(), inventory).unwrap();
        net.add_word_by_labels(&["_-a+_"], WordId::new(0)).unwrap();
        net.add_word_by_labels(&["_-b+a", "b-a+_"], WordId::new(1))
            .unwrap();
        net.finish().unwrap();

        // Bridge chains belong to both fan networks at once.
        let bridges: Vec<_> = net
            .iter_nodes()
            .filter(|n| {
                n.state.is_some() && n.has_flag(flags::FAN_IN) && n.has_flag(flags::FAN_OUT)
            })
            .collect();
        assert!(!bridges.is_empty());

        // No interior fixed-context node: every node carrying the word's
        // identity sits inside the fan network.
        let word_ends: Vec<_> = net
            .iter_nodes()
            .filter(|n| n.word_id == Some(WordId::new(0)))
            .collect();
        assert!(!word_ends.is_empty());
        for word_end in &word_ends {
            assert!(word_end.has_flag(flags::FAN_OUT));
        }

        // Reachable from the silence left context at the root.
        let root_reaches_bridge = net.node(net.root()).arcs.iter().any(|a| {
            let t = net.node(a.target);
            t.has_flag(flags::FAN_IN) && t.has_flag(flags::FAN_OUT)
        });
        assert!(root_reaches_bridge);

        // Leads onward to every compatible right context: some bridge word
        // end links into a fan-in entry or the end collector.
        let onward = word_ends.iter().any(|we| {
            we.arcs.iter().any(|a| {
                net.node(a.target).has_flag(flags::FAN_IN_FIRST) || a.target == net.end_node()
            })
        });
        assert!(onward);
    }

    #[test]
    fn test_missing_fan_out_model_is_fatal() {
        // The only available realization of the word-final unit "b" has a
        // right context ("c") that no inserted word can provide, so the
        // fan-out bundle for context (a, b) comes up empty.
        let mut inventory = HmmInventory::new();
        inventory
            .insert(Hmm::linear("_-a+b", &[10, 11], -0.3, -1.4).unwrap())
            .unwrap();
        inventory
            .insert(Hmm::linear("a-b+c", &[12, 13], -0.3, -1.4).unwrap())
            .unwrap();
        inventory
            .insert(Hmm::linear("_", &[1, 2], -0.2, -1.7).unwrap())
            .unwrap();
        let mut net = LexNetwork::new(fixtures::cross_word_config(), inventory).unwrap();
        net.add_word_by_labels(&["_-a+b", "a-b+c"], WordId::new(0))
            .unwrap();
        match net.finish() {
            Err(NetworkError::MissingModel { label }) => assert_eq!(label, "a-b+*"),
            other => panic!("expected MissingModel, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_monophone_words_fall_back_to_tree() {
        // A silence-like monophone word under cross-word configuration is
        // resolved in the tree, not the fan network.
        let inventory = fixtures::triphones(&["a"]);
        let mut net = LexNetwork::new(fixtures::cross_word_config(), inventory).unwrap();
        net.add_word_by_labels(&["_"], WordId::new(0)).unwrap();
        net.finish().unwrap();
        let word_end = net
            .iter_nodes()
            .find(|n| n.word_id == Some(WordId::new(0)))
            .unwrap();
        assert!(!word_end.has_flag(flags::FAN_OUT));
        assert!(word_end.arc_to(net.root()).is_some());
    }

    #[test]
    fn test_boundary_marker_flag_set_when_configured() {
        let inventory = fixtures::triphones(&["a", "b"]);
        let config = NetworkConfig {
            cross_word_triphones: true,
            word_boundary_id: Some(77),
            ..NetworkConfig::default()
        };
        let mut net = LexNetwork::new(config, inventory).unwrap();
        net.add_word_by_labels(&["_-a+b", "a-b+_"], WordId::new(0))
            .unwrap();
        net.add_word_by_labels(&["_-b+a", "b-a+_"], WordId::new(1))
            .unwrap();
        net.finish().unwrap();

        let marked = net
            .iter_nodes()
            .filter(|n| n.has_flag(flags::INSERT_WORD_BOUNDARY))
            .count();
        assert!(marked > 0);
        for node in net.iter_nodes().filter(|n| n.has_flag(flags::INSERT_WORD_BOUNDARY)) {
            assert!(node.has_flag(flags::FAN_OUT_FIRST) || node.has_flag(flags::FAN_IN_FIRST));
        }
    }

    #[test]
    fn test_optional_short_silence_preserves_context() {
        let inventory = fixtures::triphones(&["a", "b"]);
        let config = NetworkConfig {
            cross_word_triphones: true,
            optional_short_silence: true,
            ..NetworkConfig::default()
        };
        let mut net = LexNetwork::new(config, inventory).unwrap();
        net.add_word_by_labels(&["_-a+b", "a-b+_"], WordId::new(0))
            .unwrap();
        net.add_word_by_labels(&["_-b+a", "b-a+_"], WordId::new(1))
            .unwrap();
        net.finish().unwrap();

        // Word ends must offer a silence alternative that still reaches the
        // same fan-out bundle.
        let word_end = net
            .iter_nodes()
            .find(|n| n.word_id == Some(WordId::new(0)))
            .unwrap();
        let silence = word_end
            .arcs
            .iter()
            .map(|a| net.node(a.target))
            .find(|n| n.has_flag(flags::SILENCE_FIRST))
            .expect("short silence node at the boundary");
        assert!(silence
            .arcs
            .iter()
            .any(|a| net.node(a.target).has_flag(flags::FAN_OUT_FIRST)));
    }

    #[test]
    fn test_three_unit_words_share_interior() {
        let inventory = fixtures::triphones(&["a", "b", "c"]);
        let mut net = LexNetwork::new(fixtures::cross_word_config(), inventory).unwrap();
        // Both words have phonemes (a, b, ...) so the interior connection
        // point for context (a, b) is shared.
        net.add_word_by_labels(&["_-a+b", "a-b+c", "b-c+_"], WordId::new(0))
            .unwrap();
        net.add_word_by_labels(&["_-a+b", "a-b+a", "b-a+_"], WordId::new(1))
            .unwrap();
        net.finish().unwrap();

        let connections: Vec<_> = net
            .iter_nodes()
            .filter(|n| n.has_flag(flags::FAN_IN_CONNECTION))
            .collect();
        assert_eq!(connections.len(), 1, "one connection point per context");
        assert!(connections[0].has_flag(flags::LINKED));
    }
}
