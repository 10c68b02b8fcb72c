//! Configuration for narrative selection.
//!
//! Loaded from TOML; every section and field falls back to its default.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Complete narrator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Mood and resource line selection
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Moment reveal and destruction
    #[serde(default)]
    pub moments: MomentConfig,
}

impl NarratorConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Thresholds for mood and resource narrative lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Chance a waiting or awakening city asks a question
    pub request_chance: f32,
    /// Unanswered count above which a waiting city repeats itself
    pub repeat_questions_above: usize,
    /// Abandonment hours above which a forgotten city is overgrown
    pub overgrown_after_hours: f32,
    /// Progress below which an awakening city is only stirring
    pub first_stirrings_below: f32,
    /// Coherence below which edges blur
    pub low_coherence: f32,
    /// Trust above which doors unlock
    pub high_trust: f32,
    /// Trust below which shutters close
    pub low_trust: f32,
    /// Growth-rate parameter above which towers rise
    pub growth_rate_threshold: f32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            request_chance: 0.4,
            repeat_questions_above: 3,
            overgrown_after_hours: 72.0,
            first_stirrings_below: 0.1,
            low_coherence: 0.2,
            high_trust: 0.8,
            low_trust: 0.2,
            growth_rate_threshold: 1.5,
        }
    }
}

/// Moment reveal, fragility and affinity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentConfig {
    /// Chance per narrative tick to reveal a new moment
    pub reveal_chance: f32,
    /// Chance per narrative tick to settle a revealed moment
    pub resolve_chance: f32,
    /// Fragility at or above which a moment is highly fragile
    pub high_fragility: u8,
    /// Fragility at or above which a moment is moderately fragile
    pub moderate_fragility: u8,
    /// Destruction probability for highly fragile moments
    pub high_destruction: f32,
    /// Destruction probability for moderately fragile moments
    pub moderate_destruction: f32,
    /// Destruction probability for sturdy moments
    pub low_destruction: f32,
    /// Base selection weight before affinity
    pub base_weight: f32,
    /// Affinity overrides keyed by "moment_type.pattern" (e.g., "personal.story")
    pub affinity_overrides: HashMap<String, f32>,
}

impl Default for MomentConfig {
    fn default() -> Self {
        Self {
            reveal_chance: 0.3,
            resolve_chance: 0.5,
            high_fragility: 8,
            moderate_fragility: 5,
            high_destruction: 0.7,
            moderate_destruction: 0.4,
            low_destruction: 0.15,
            base_weight: 1.0,
            affinity_overrides: HashMap::new(),
        }
    }
}

/// Errors that can occur loading narrator configuration or templates.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NarratorConfig::default();

        assert_eq!(config.selection.request_chance, 0.4);
        assert_eq!(config.moments.high_fragility, 8);
        assert_eq!(config.moments.low_destruction, 0.15);
        assert!(config.moments.affinity_overrides.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
            [moments]
            reveal_chance = 0.9

            [moments.affinity_overrides]
            "sensory.control" = 2.0
        "#;

        let config = NarratorConfig::from_str(toml).unwrap();

        assert_eq!(config.moments.reveal_chance, 0.9);
        assert_eq!(config.moments.resolve_chance, 0.5);
        assert_eq!(config.moments.affinity_overrides.get("sensory.control"), Some(&2.0));
        assert_eq!(config.selection.low_trust, 0.2);
    }

    #[test]
    fn test_config_to_toml() {
        let toml = NarratorConfig::default().to_toml().unwrap();
        assert!(toml.contains("[selection]"));
        assert!(toml.contains("[moments]"));

        let back = NarratorConfig::from_str(&toml).unwrap();
        assert_eq!(back.selection.high_trust, 0.8);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(NarratorConfig::from_str("[selection\nrequest_chance = ").is_err());
    }
}
