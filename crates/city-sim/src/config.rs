//! Simulation Configuration
//!
//! Tuning values for the tick loop and resource formulas, loaded from TOML.
//! Every section is optional and falls back to its defaults.

use narrator::{ConfigError, NarratorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
    #[serde(default)]
    pub narrator: NarratorConfig,
}

impl SimConfig {
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

/// Tick loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Upper bound on ticks per run
    pub max_ticks: u32,
    /// Delay between ticks in milliseconds
    pub tick_delay_ms: u64,
    /// Progress gained per tick
    pub progress_increment: f32,
    /// Ticks between narrative passes
    pub narrative_interval: u32,
    /// Ticks between emergence and story-beat evaluation
    pub evaluation_interval: u32,
    /// Ticks between saves
    pub save_interval: u32,
    /// Seed for the narrative random source
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: 100,
            tick_delay_ms: 100,
            progress_increment: 0.01,
            narrative_interval: 10,
            evaluation_interval: 5,
            save_interval: 10,
            seed: 42,
        }
    }
}

/// Per-tick resource drift and interaction deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Attention lost per tick before abandonment scaling
    pub attention_decay: f32,
    /// Coherence lost per tick at zero attention
    pub coherence_decay: f32,
    /// Memory gained per tick
    pub memory_growth: f32,
    /// Trust lost per tick per hour of abandonment
    pub trust_neglect: f32,
    /// Trust and coherence gained per tick per answered request
    pub trust_response_bonus: f32,
    /// Autonomy gained per tick at zero attention
    pub autonomy_growth: f32,
    /// Complexity gained per tick before thread scaling
    pub complexity_growth: f32,
    /// Attention gained by an interaction
    pub interaction_attention: f32,
    /// Coherence gained by an interaction
    pub interaction_coherence: f32,
    /// Trust gained by answering a request
    pub response_trust: f32,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            attention_decay: 0.001,
            coherence_decay: 0.008,
            memory_growth: 0.002,
            trust_neglect: 0.0005,
            trust_response_bonus: 0.002,
            autonomy_growth: 0.003,
            complexity_growth: 0.001,
            interaction_attention: 0.1,
            interaction_coherence: 0.02,
            response_trust: 0.05,
        }
    }
}

/// Returns the default configuration as a commented TOML string.
pub fn default_config_toml() -> String {
    r#"# City Consciousness Configuration

[simulation]
max_ticks = 100
tick_delay_ms = 100
progress_increment = 0.01
narrative_interval = 10
evaluation_interval = 5
save_interval = 10
seed = 42

[resources]
attention_decay = 0.001
coherence_decay = 0.008
memory_growth = 0.002
trust_neglect = 0.0005
trust_response_bonus = 0.002
autonomy_growth = 0.003
complexity_growth = 0.001
interaction_attention = 0.1
interaction_coherence = 0.02
response_trust = 0.05

[narrator.selection]
request_chance = 0.4
repeat_questions_above = 3
overgrown_after_hours = 72.0
first_stirrings_below = 0.1
low_coherence = 0.2
high_trust = 0.8
low_trust = 0.2
growth_rate_threshold = 1.5

[narrator.moments]
reveal_chance = 0.3
resolve_chance = 0.5
high_fragility = 8
moderate_fragility = 5
high_destruction = 0.7
moderate_destruction = 0.4
low_destruction = 0.15
base_weight = 1.0

# Affinity overrides keyed by "moment_type.pattern"
[narrator.moments.affinity_overrides]
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_toml_parses() {
        let config = SimConfig::from_str(&default_config_toml()).unwrap();

        assert_eq!(config.simulation.max_ticks, 100);
        assert_eq!(config.simulation.narrative_interval, 10);
        assert_eq!(config.resources.response_trust, 0.05);
        assert_eq!(config.narrator.selection.request_chance, 0.4);
        assert_eq!(config.narrator.moments.high_fragility, 8);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = SimConfig::from_str("").unwrap();

        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.resources.coherence_decay, 0.008);
        assert_eq!(config.narrator.moments.resolve_chance, 0.5);
    }

    #[test]
    fn test_partial_override() {
        let toml = r#"
            [simulation]
            max_ticks = 10
            tick_delay_ms = 0

            [narrator.moments]
            reveal_chance = 1.0
        "#;

        let config = SimConfig::from_str(toml).unwrap();

        assert_eq!(config.simulation.max_ticks, 10);
        assert_eq!(config.simulation.tick_delay_ms, 0);
        assert_eq!(config.simulation.save_interval, 10);
        assert_eq!(config.narrator.moments.reveal_chance, 1.0);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = SimConfig::default();
        config.simulation.seed = 7;
        let toml = config.to_toml().unwrap();

        let back = SimConfig::from_str(&toml).unwrap();
        assert_eq!(back.simulation.seed, 7);
    }
}
