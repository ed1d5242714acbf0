//! Search network construction.
//!
//! This module contains the shared lexical prefix network, its node/arc data
//! model, the cross-word fan network construction, and the language-model
//! lookahead caches attached to nodes.

mod cross_word;
mod lookahead;
mod node;
mod stats;
mod tree;

pub use lookahead::{LookaheadCache, LookaheadMode};
pub use node::{flags, AcousticState, Arc, Node};
pub use stats::NetworkStats;
pub use tree::LexNetwork;

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared model inventories for network tests.

    use crate::config::NetworkConfig;
    use crate::hmm::{Hmm, HmmInventory};
    use crate::types::HmmId;

    /// Monophone inventory: each label becomes a two-state chain with
    /// emission models derived from its position.
    pub fn monophones(labels: &[&str]) -> (HmmInventory, Vec<HmmId>) {
        let mut inventory = HmmInventory::new();
        let mut ids = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            let base = (i as i32 + 1) * 10;
            let hmm = Hmm::linear(*label, &[base, base + 1], -0.3, -1.4).unwrap();
            ids.push(inventory.insert(hmm).unwrap());
        }
        (inventory, ids)
    }

    /// Full triphone inventory over the given phones with silence contexts:
    /// every `l-c+r` with `l, r` drawn from phones plus `_`, and `c` from
    /// phones, plus the `_` silence model itself. Each triphone gets two
    /// emitting states with models unique to the full context.
    pub fn triphones(phones: &[&str]) -> HmmInventory {
        let mut inventory = HmmInventory::new();
        let mut contexts: Vec<&str> = phones.to_vec();
        contexts.push("_");
        let mut next_model = 100;
        for center in phones {
            for left in &contexts {
                for right in &contexts {
                    let label = format!("{}-{}+{}", left, center, right);
                    let hmm =
                        Hmm::linear(label, &[next_model, next_model + 1], -0.3, -1.4).unwrap();
                    inventory.insert(hmm).unwrap();
                    next_model += 2;
                }
            }
        }
        inventory
            .insert(Hmm::linear("_", &[1, 2], -0.2, -1.7).unwrap())
            .unwrap();
        inventory
    }

    /// Configuration with cross-word triphones enabled.
    pub fn cross_word_config() -> NetworkConfig {
        NetworkConfig {
            cross_word_triphones: true,
            ..NetworkConfig::default()
        }
    }
}
