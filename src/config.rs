//! Network construction configuration.
//!
//! All boundary and lookahead toggles are read once during construction: the
//! finished graph never consults configuration again. Values can be loaded
//! from a TOML or YAML file and overridden through `LEXNET_`-prefixed
//! environment variables.

use figment::{
    providers::{Env, Format, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};
use crate::network::LookaheadMode;

fn default_lookahead() -> LookaheadMode {
    LookaheadMode::Disabled
}
fn default_lookahead_cache_size() -> usize {
    512
}
fn default_silence_label() -> String {
    "_".to_string()
}

/// Configuration for one network build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Language-model lookahead mode.
    #[serde(default = "default_lookahead")]
    pub lookahead: LookaheadMode,

    /// Slot capacity applied to every node's lookahead cache.
    #[serde(default = "default_lookahead_cache_size")]
    pub lookahead_cache_size: usize,

    /// Model word boundaries with context-dependent units resolved through
    /// the fan-out/fan-in network.
    #[serde(default)]
    pub cross_word_triphones: bool,

    /// Emit silence as a vocabulary word (requires `silence_word_id`).
    #[serde(default)]
    pub silence_is_word: bool,

    /// Vocabulary identifier of the silence word.
    #[serde(default)]
    pub silence_word_id: Option<u32>,

    /// Case-insensitive model label lookup.
    #[serde(default)]
    pub ignore_case: bool,

    /// Splice an optional short-silence state at word boundaries.
    #[serde(default)]
    pub optional_short_silence: bool,

    /// Vocabulary identifier of the word-boundary marker, if the search loop
    /// should emit one between words.
    #[serde(default)]
    pub word_boundary_id: Option<u32>,

    /// Vocabulary identifier of the sentence-start word.
    #[serde(default)]
    pub sentence_start_id: Option<u32>,

    /// Vocabulary identifier of the sentence-end word; its word ends are
    /// routed to the final node.
    #[serde(default)]
    pub sentence_end_id: Option<u32>,

    /// Label of the silence model in the inventory.
    #[serde(default = "default_silence_label")]
    pub silence_label: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            lookahead: default_lookahead(),
            lookahead_cache_size: default_lookahead_cache_size(),
            cross_word_triphones: false,
            silence_is_word: false,
            silence_word_id: None,
            ignore_case: false,
            optional_short_silence: false,
            word_boundary_id: None,
            sentence_start_id: None,
            sentence_end_id: None,
            silence_label: default_silence_label(),
        }
    }
}

impl NetworkConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables prefixed with `LEXNET_` (highest priority)
    /// 2. `lexnet.yaml` (if it exists)
    /// 3. `lexnet.toml` (if it exists)
    /// 4. Built-in defaults (lowest priority)
    pub fn load() -> Result<Self> {
        Self::load_from(Figment::new()
            .merge(figment::providers::Serialized::defaults(Self::default()))
            .merge(Toml::file("lexnet.toml"))
            .merge(Yaml::file("lexnet.yaml"))
            .merge(Env::prefixed("LEXNET_")))
    }

    /// Load configuration from an explicit TOML file path, still honoring
    /// `LEXNET_` environment overrides.
    pub fn load_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::load_from(Figment::new()
            .merge(figment::providers::Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("LEXNET_")))
    }

    fn load_from(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| {
            NetworkError::Configuration(format!("failed to load configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.lookahead.is_enabled() {
            if self.lookahead_cache_size == 0 {
                return Err(NetworkError::Configuration(
                    "lookahead_cache_size must be nonzero when lookahead is enabled".to_string(),
                ));
            }
            if self.lookahead_cache_size > 1 << 20 {
                return Err(NetworkError::Configuration(format!(
                    "lookahead_cache_size {} too large (max {})",
                    self.lookahead_cache_size,
                    1 << 20
                )));
            }
        }
        if self.silence_is_word && self.silence_word_id.is_none() {
            return Err(NetworkError::Configuration(
                "silence_is_word requires silence_word_id".to_string(),
            ));
        }
        if self.silence_label.is_empty() {
            return Err(NetworkError::Configuration(
                "silence_label cannot be empty".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.sentence_start_id, self.sentence_end_id) {
            if start == end {
                return Err(NetworkError::Configuration(
                    "sentence start and end words must differ".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Export configuration to TOML format.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| NetworkError::Configuration(format!("failed to serialize to TOML: {}", e)))
    }

    /// Export configuration to YAML format.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| NetworkError::Configuration(format!("failed to serialize to YAML: {}", e)))
    }

    /// Export configuration to JSON format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| NetworkError::Configuration(format!("failed to serialize to JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = NetworkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lookahead, LookaheadMode::Disabled);
        assert_eq!(config.silence_label, "_");
    }

    #[test]
    fn test_silence_word_requires_id() {
        let config = NetworkConfig {
            silence_is_word: true,
            ..NetworkConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NetworkError::Configuration(_))
        ));
    }

    #[test]
    fn test_zero_cache_size_rejected_when_enabled() {
        let config = NetworkConfig {
            lookahead: LookaheadMode::Full,
            lookahead_cache_size: 0,
            ..NetworkConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "cross_word_triphones = true\nlookahead = \"full\"\nlookahead_cache_size = 64"
        )
        .unwrap();
        let config = NetworkConfig::load_file(file.path()).unwrap();
        assert!(config.cross_word_triphones);
        assert_eq!(config.lookahead, LookaheadMode::Full);
        assert_eq!(config.lookahead_cache_size, 64);
    }

    #[test]
    fn test_round_trip_export() {
        let config = NetworkConfig {
            word_boundary_id: Some(3),
            ..NetworkConfig::default()
        };
        let toml_text = config.to_toml().unwrap();
        let back: NetworkConfig = toml::from_str(&toml_text).unwrap();
        assert_eq!(back.word_boundary_id, Some(3));
        assert!(config.to_yaml().is_ok());
        assert!(config.to_json().is_ok());
    }
}
