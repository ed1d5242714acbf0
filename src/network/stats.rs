//! Network size analysis.
//!
//! Counts nodes and arcs in the prefix tree and in the fan networks after
//! construction, for capacity planning and regression tracking. The report is
//! serializable and logged by the finishing pass.

use serde::{Deserialize, Serialize};

use super::node::flags;
use super::tree::LexNetwork;

/// Node and arc counts per network region.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Nodes outside the fan networks.
    pub tree_nodes: usize,
    /// Arcs leaving tree nodes.
    pub tree_arcs: usize,
    /// Nodes in the fan-out network (bridges count in both fan regions).
    pub fan_out_nodes: usize,
    /// Arcs leaving fan-out nodes.
    pub fan_out_arcs: usize,
    /// Nodes in the fan-in network.
    pub fan_in_nodes: usize,
    /// Arcs leaving fan-in nodes.
    pub fan_in_arcs: usize,
    /// All nodes in the arena.
    pub total_nodes: usize,
    /// All arcs in the arena.
    pub total_arcs: usize,
    /// Largest inserted word identifier plus one.
    pub words: u32,
}

impl LexNetwork {
    /// Count nodes and arcs per network region.
    pub fn analyze(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            words: self.words(),
            ..NetworkStats::default()
        };
        for node in self.iter_nodes() {
            let arcs = node.arcs.len();
            stats.total_nodes += 1;
            stats.total_arcs += arcs;
            if node.has_flag(flags::FAN_OUT) {
                stats.fan_out_nodes += 1;
                stats.fan_out_arcs += arcs;
            }
            if node.has_flag(flags::FAN_IN) {
                stats.fan_in_nodes += 1;
                stats.fan_in_arcs += arcs;
            }
            if !node.has_flag(flags::FAN_OUT | flags::FAN_IN) {
                stats.tree_nodes += 1;
                stats.tree_arcs += arcs;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_serialize() {
        let stats = NetworkStats {
            tree_nodes: 10,
            tree_arcs: 14,
            total_nodes: 10,
            total_arcs: 14,
            words: 2,
            ..NetworkStats::default()
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"tree_nodes\":10"));
        let back: NetworkStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back.words, 2);
    }
}
