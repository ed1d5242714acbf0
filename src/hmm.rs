//! Acoustic model chains and the model inventory.
//!
//! An [`Hmm`] is a left-to-right chain of emitting states with transition
//! log-probabilities and optional skip transitions. By convention state 0 is
//! the non-emitting source, state 1 the non-emitting sink, and states 2 and
//! up are the emitting states in chain order.
//!
//! NOTE:
//! - Network construction assumes that states with identical emission models
//!   have identical outgoing transition structure, although with different
//!   destinations.
//! - Chains must have left-to-right topology; skip transitions are allowed,
//!   except from the source state (see below).
//! - If the source state has transitions to anything other than the first
//!   emitting state and the sink, prefix sharing is unsafe for that chain and
//!   the tree forks there.

use std::collections::HashMap;

use crate::error::{NetworkError, Result};
use crate::types::HmmId;

/// Index of the non-emitting source state.
pub const SOURCE_STATE: usize = 0;

/// Index of the non-emitting sink state.
pub const SINK_STATE: usize = 1;

/// Index of the first emitting state.
pub const FIRST_EMITTING_STATE: usize = 2;

/// A single transition out of an HMM state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HmmTransition {
    /// Target state index within the chain.
    pub target: usize,
    /// Transition log-probability.
    pub log_prob: f32,
}

/// One state of an acoustic model chain.
#[derive(Debug, Clone, PartialEq)]
pub struct HmmState {
    /// Emission distribution index; negative for non-emitting source/sink states.
    pub model: i32,
    /// Outgoing transitions.
    pub transitions: Vec<HmmTransition>,
}

impl HmmState {
    /// Create a non-emitting state with the given transitions.
    pub fn silent(transitions: Vec<HmmTransition>) -> Self {
        Self {
            model: -1,
            transitions,
        }
    }

    /// Create an emitting state with the given emission model and transitions.
    pub fn emitting(model: i32, transitions: Vec<HmmTransition>) -> Self {
        Self { model, transitions }
    }
}

/// An acoustic sub-word model: a chain of states with transition probabilities.
#[derive(Debug, Clone)]
pub struct Hmm {
    /// Unit label. Context-dependent units use the triphone form `l-c+r`.
    pub label: String,
    /// States in chain order: source, sink, then emitting states.
    pub states: Vec<HmmState>,
}

impl Hmm {
    /// Create a model and validate its topology.
    pub fn new(label: impl Into<String>, states: Vec<HmmState>) -> Result<Self> {
        let hmm = Self {
            label: label.into(),
            states,
        };
        hmm.validate()?;
        Ok(hmm)
    }

    /// Build a plain left-to-right chain without skips: source enters the
    /// first state with probability one, every emitting state has a self-loop
    /// and a forward transition, and the last state exits to the sink.
    pub fn linear(
        label: impl Into<String>,
        models: &[i32],
        self_loop_log_prob: f32,
        forward_log_prob: f32,
    ) -> Result<Self> {
        let mut states = vec![
            HmmState::silent(vec![HmmTransition {
                target: FIRST_EMITTING_STATE,
                log_prob: 0.0,
            }]),
            HmmState::silent(Vec::new()),
        ];
        for (i, &model) in models.iter().enumerate() {
            let own = FIRST_EMITTING_STATE + i;
            let next = if i + 1 == models.len() {
                SINK_STATE
            } else {
                own + 1
            };
            states.push(HmmState::emitting(
                model,
                vec![
                    HmmTransition {
                        target: own,
                        log_prob: self_loop_log_prob,
                    },
                    HmmTransition {
                        target: next,
                        log_prob: forward_log_prob,
                    },
                ],
            ));
        }
        Self::new(label, states)
    }

    /// Number of emitting states.
    pub fn num_emitting(&self) -> usize {
        self.states.len().saturating_sub(FIRST_EMITTING_STATE)
    }

    /// The emitting states in chain order.
    pub fn emitting_states(&self) -> &[HmmState] {
        &self.states[FIRST_EMITTING_STATE..]
    }

    /// True if the label has the context-dependent `l-c+r` form.
    pub fn is_triphone(&self) -> bool {
        triphone_parts(&self.label).is_some()
    }

    /// Left context of a triphone label.
    pub fn left_context(&self) -> Option<&str> {
        triphone_parts(&self.label).map(|(l, _, _)| l)
    }

    /// Center unit of a triphone label, or the whole label for
    /// context-independent units.
    pub fn center(&self) -> &str {
        triphone_parts(&self.label).map_or(self.label.as_str(), |(_, c, _)| c)
    }

    /// Right context of a triphone label.
    pub fn right_context(&self) -> Option<&str> {
        triphone_parts(&self.label).map(|(_, _, r)| r)
    }

    /// Check the left-to-right/skip topology assumption.
    ///
    /// Rejected outright: chains without emitting states, transitions back to
    /// the source, backward transitions between emitting states, and chains
    /// from which the sink is unreachable. Source-state skip transitions are
    /// legal but degrade sharing; they are detected separately by
    /// [`Hmm::source_is_share_safe`].
    pub fn validate(&self) -> Result<()> {
        if self.num_emitting() == 0 {
            return Err(NetworkError::ChainTopology(format!(
                "model '{}' has no emitting states",
                self.label
            )));
        }
        let mut sink_reachable = false;
        for (i, state) in self.states.iter().enumerate() {
            if i == SINK_STATE {
                continue;
            }
            if i == SOURCE_STATE && state.transitions.is_empty() {
                return Err(NetworkError::ChainTopology(format!(
                    "model '{}' has no transitions out of its source state",
                    self.label
                )));
            }
            for t in &state.transitions {
                if t.target >= self.states.len() {
                    return Err(NetworkError::ChainTopology(format!(
                        "model '{}' state {} targets nonexistent state {}",
                        self.label, i, t.target
                    )));
                }
                if t.target == SOURCE_STATE {
                    return Err(NetworkError::ChainTopology(format!(
                        "model '{}' state {} transitions back to the source",
                        self.label, i
                    )));
                }
                if t.target == SINK_STATE {
                    sink_reachable = true;
                } else if i >= FIRST_EMITTING_STATE && t.target < i {
                    return Err(NetworkError::ChainTopology(format!(
                        "model '{}' has a backward transition {} -> {}",
                        self.label, i, t.target
                    )));
                }
            }
        }
        if !sink_reachable {
            return Err(NetworkError::ChainTopology(format!(
                "model '{}' cannot reach its sink state",
                self.label
            )));
        }
        Ok(())
    }

    /// True if every source transition targets the first emitting state or
    /// the sink, the precondition for sharing this chain's states in the
    /// prefix tree.
    pub fn source_is_share_safe(&self) -> bool {
        self.states[SOURCE_STATE]
            .transitions
            .iter()
            .all(|t| t.target == FIRST_EMITTING_STATE || t.target == SINK_STATE)
    }
}

/// Split a triphone label `l-c+r` into its context parts.
pub fn triphone_parts(label: &str) -> Option<(&str, &str, &str)> {
    let (left, rest) = label.split_once('-')?;
    let (center, right) = rest.split_once('+')?;
    if left.is_empty() || center.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, center, right))
}

/// The loaded set of acoustic models: a label-to-index map plus the ordered
/// model collection.
#[derive(Debug, Default)]
pub struct HmmInventory {
    map: HashMap<String, HmmId>,
    hmms: Vec<Hmm>,
    ignore_case: bool,
}

impl HmmInventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty inventory with case-insensitive label lookup.
    pub fn with_ignore_case(ignore_case: bool) -> Self {
        Self {
            ignore_case,
            ..Self::default()
        }
    }

    fn key(&self, label: &str) -> String {
        if self.ignore_case {
            label.to_lowercase()
        } else {
            label.to_string()
        }
    }

    /// Switch case handling for label lookup, rebuilding the label map.
    pub fn set_ignore_case(&mut self, ignore_case: bool) {
        if self.ignore_case == ignore_case {
            return;
        }
        self.ignore_case = ignore_case;
        self.map = self
            .hmms
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let key = if ignore_case {
                    h.label.to_lowercase()
                } else {
                    h.label.clone()
                };
                (key, HmmId::new(i as u32))
            })
            .collect();
    }

    /// Add a model to the inventory, validating its topology.
    pub fn insert(&mut self, hmm: Hmm) -> Result<HmmId> {
        hmm.validate()?;
        let id = HmmId::new(self.hmms.len() as u32);
        self.map.insert(self.key(&hmm.label), id);
        self.hmms.push(hmm);
        Ok(id)
    }

    /// Get a model by index.
    pub fn hmm(&self, id: HmmId) -> &Hmm {
        &self.hmms[id.index()]
    }

    /// Resolve a label to a model index; missing models are a fatal
    /// configuration error.
    pub fn by_label(&self, label: &str) -> Result<HmmId> {
        self.map
            .get(&self.key(label))
            .copied()
            .ok_or_else(|| NetworkError::MissingModel {
                label: label.to_string(),
            })
    }

    /// True if a model with this label is loaded.
    pub fn contains_label(&self, label: &str) -> bool {
        self.map.contains_key(&self.key(label))
    }

    /// Iterate over all models with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (HmmId, &Hmm)> {
        self.hmms
            .iter()
            .enumerate()
            .map(|(i, h)| (HmmId::new(i as u32), h))
    }

    /// Number of loaded models.
    pub fn len(&self) -> usize {
        self.hmms.len()
    }

    /// True if no models are loaded.
    pub fn is_empty(&self) -> bool {
        self.hmms.is_empty()
    }
}
