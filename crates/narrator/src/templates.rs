//! Narrative text templates.
//!
//! Lines are grouped under string keys and filled with a handful of
//! placeholders. The bundled set lives in `templates/narrative.toml`; a
//! replacement set can be loaded from any TOML file with the same shape.

use std::collections::HashMap;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Template key for each concluding assessment.
pub mod conclusion_keys {
    pub const AUTONOMOUS: &str = "autonomous";
    pub const TRUSTING: &str = "trusting";
    pub const FRAYING: &str = "fraying";
    pub const UNCERTAIN: &str = "uncertain";
}

/// Template key for each resource-threshold event.
pub mod resource_keys {
    pub const LOW_COHERENCE: &str = "low_coherence";
    pub const HIGH_TRUST: &str = "high_trust";
    pub const LOW_TRUST: &str = "low_trust";
    pub const RAPID_GROWTH: &str = "rapid_growth";
}

/// All narrative text the selector draws from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrativeTemplates {
    /// Mood lines keyed by "mood.situation" (e.g., "anxious.unanswered")
    #[serde(default)]
    pub mood_lines: HashMap<String, Vec<String>>,
    /// Lines for resource-threshold events
    #[serde(default)]
    pub resource_events: HashMap<String, Vec<String>>,
    /// Questions the city can put to the player
    #[serde(default)]
    pub requests: Vec<String>,
    /// Concluding assessment lines
    #[serde(default)]
    pub conclusions: HashMap<String, Vec<String>>,
}

impl NarrativeTemplates {
    /// Loads templates from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses templates from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn mood_line(&self, key: &str, rng: &mut impl Rng) -> Option<&str> {
        pick(self.mood_lines.get(key), rng)
    }

    pub fn resource_line(&self, key: &str, rng: &mut impl Rng) -> Option<&str> {
        pick(self.resource_events.get(key), rng)
    }

    pub fn request(&self, rng: &mut impl Rng) -> Option<&str> {
        self.requests.choose(rng).map(String::as_str)
    }

    /// First conclusion line for the key. Conclusions are not randomized so a
    /// run always ends on a predictable line.
    pub fn conclusion(&self, key: &str) -> Option<&str> {
        self.conclusions
            .get(key)
            .and_then(|lines| lines.first())
            .map(String::as_str)
    }
}

fn pick<'a>(lines: Option<&'a Vec<String>>, rng: &mut impl Rng) -> Option<&'a str> {
    lines.and_then(|l| l.choose(rng)).map(String::as_str)
}

/// Values substituted into template placeholders.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars<'a> {
    pub city: &'a str,
    pub hours: f32,
    pub unanswered: usize,
}

/// Fills `{city}`, `{hours}` and `{unanswered}`.
pub fn fill(template: &str, vars: &TemplateVars<'_>) -> String {
    template
        .replace("{city}", vars.city)
        .replace("{hours}", &format!("{:.0}", vars.hours))
        .replace("{unanswered}", &vars.unanswered.to_string())
}

/// The bundled template set.
pub fn default_templates() -> NarrativeTemplates {
    // The bundled file is covered by tests; an empty set is the safe fallback.
    NarrativeTemplates::from_str(include_str!("../templates/narrative.toml")).unwrap_or_else(|e| {
        tracing::error!("Bundled narrative templates failed to parse: {}", e);
        NarrativeTemplates::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_templates_parse() {
        let templates =
            NarrativeTemplates::from_str(include_str!("../templates/narrative.toml")).unwrap();

        assert!(!templates.requests.is_empty());
        assert!(templates.mood_lines.contains_key("anxious.unanswered"));
        assert!(templates.resource_events.contains_key(resource_keys::RAPID_GROWTH));
        for key in [
            conclusion_keys::AUTONOMOUS,
            conclusion_keys::TRUSTING,
            conclusion_keys::FRAYING,
            conclusion_keys::UNCERTAIN,
        ] {
            assert!(templates.conclusion(key).is_some(), "missing conclusion {key}");
        }
    }

    #[test]
    fn test_requests_not_nested_in_tables() {
        let templates = default_templates();
        assert!(!templates.resource_events.contains_key("requests"));
        assert_eq!(templates.requests.len(), 6);
    }

    #[test]
    fn test_fill_placeholders() {
        let vars = TemplateVars {
            city: "Vessel",
            hours: 72.4,
            unanswered: 3,
        };
        assert_eq!(
            fill("{city}: {unanswered} after {hours}h", &vars),
            "Vessel: 3 after 72h"
        );
    }

    #[test]
    fn test_missing_key_is_none() {
        let templates = default_templates();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(templates.mood_line("joyful.dancing", &mut rng).is_none());
    }

    #[test]
    fn test_custom_templates_from_toml() {
        let toml = r#"
            requests = ["Why?"]

            [mood_lines]
            "waiting.idle" = ["Custom wait."]
        "#;
        let templates = NarrativeTemplates::from_str(toml).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(templates.mood_line("waiting.idle", &mut rng), Some("Custom wait."));
        assert_eq!(templates.request(&mut rng), Some("Why?"));
        assert!(templates.conclusions.is_empty());
    }
}
