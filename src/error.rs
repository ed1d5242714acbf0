//! Custom error types for lexical network construction.
//!
//! This module provides a centralized error handling system using the `thiserror`
//! crate to define structured, typed errors with clear messages. All construction
//! errors are fatal: a network that is missing models or was fed malformed chain
//! topology would silently fail to recognize some words, so the build aborts
//! instead.

use std::io;
use thiserror::Error;

/// Primary error type for network construction and maintenance.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No acoustic model exists for a required unit or boundary context.
    #[error("missing acoustic model for unit '{label}'")]
    MissingModel {
        /// The requested model label (may contain `*` wildcards for context families).
        label: String,
    },

    /// An acoustic model chain violates the left-to-right/skip topology assumption.
    #[error("malformed chain topology: {0}")]
    ChainTopology(String),

    /// A word was submitted with an empty model chain list.
    #[error("word {word} has an empty model chain")]
    EmptyChain {
        /// The offending word identifier.
        word: u32,
    },

    /// Invalid configuration values.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The finishing pass was invoked more than once, or a word was inserted
    /// after finishing.
    #[error("network is already finished")]
    AlreadyFinished,

    /// An operation that requires a finished network was invoked before the
    /// finishing pass.
    #[error("network is not finished yet")]
    NotFinished,

    /// Errors from the underlying IO system (configuration loading).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience type alias for Results with NetworkError.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = NetworkError::MissingModel {
            label: "a-b+*".to_string(),
        };
        assert_eq!(err.to_string(), "missing acoustic model for unit 'a-b+*'");

        let err = NetworkError::EmptyChain { word: 12 };
        assert_eq!(err.to_string(), "word 12 has an empty model chain");
    }
}
