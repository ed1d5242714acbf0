//! The `lexnet` core library.
//!
//! This crate is the network-construction core of a speech-decoding engine:
//! it compiles a pronunciation dictionary, expressed as sequences of acoustic
//! sub-word model chains, into a single shared search graph that a
//! frame-synchronous Viterbi search loop traverses. Word pronunciations share
//! common prefixes to keep the graph small, while a fan-out/fan-in network
//! resolves context-dependent units at word boundaries without enumerating
//! word pairs. Per-node lookahead caches and reference-counted backtrace
//! histories complete the contract toward the external search loop.

pub mod config;
pub mod error;
pub mod history;
pub mod hmm;
pub mod lm;
pub mod network;
pub mod types;

pub use config::NetworkConfig;
pub use error::{NetworkError, Result};
pub use history::{
    HistoryArena, HistoryRef, LmHistory, StateHistory, Token, WordHistory,
};
pub use hmm::{Hmm, HmmInventory, HmmState, HmmTransition};
pub use lm::LanguageModel;
pub use network::{flags, LexNetwork, LookaheadMode, NetworkStats, Node};
pub use types::{HmmId, NodeId, WordId};
