//! Game State
//!
//! Per-session player state. Choice counters and the player-city trust and
//! autonomy scalars change only through [`GameState::record_choice`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::resources::{clamp_unit, deserialize_unit};

/// The four ways a player tends to choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoicePattern {
    Story,
    Efficiency,
    Autonomy,
    Control,
}

impl ChoicePattern {
    pub fn all() -> &'static [ChoicePattern] {
        &[
            ChoicePattern::Story,
            ChoicePattern::Efficiency,
            ChoicePattern::Autonomy,
            ChoicePattern::Control,
        ]
    }

    /// (trust delta, autonomy delta) applied when the pattern is chosen.
    fn relationship_shift(self) -> (f32, f32) {
        match self {
            ChoicePattern::Story => (0.05, 0.0),
            ChoicePattern::Efficiency => (-0.02, -0.01),
            ChoicePattern::Autonomy => (0.02, 0.05),
            ChoicePattern::Control => (-0.03, -0.05),
        }
    }
}

impl fmt::Display for ChoicePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChoicePattern::Story => "story",
            ChoicePattern::Efficiency => "efficiency",
            ChoicePattern::Autonomy => "autonomy",
            ChoicePattern::Control => "control",
        };
        f.write_str(name)
    }
}

/// Player session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub act: u32,
    pub scene: u32,
    choices: BTreeMap<ChoicePattern, u32>,
    #[serde(default)]
    pub unlocked_commands: BTreeSet<String>,
    #[serde(default)]
    pub revealed_moments: BTreeSet<String>,
    #[serde(default)]
    pub destroyed_moments: BTreeSet<String>,
    #[serde(default)]
    pub preserved_moments: BTreeSet<String>,
    #[serde(default)]
    pub remembered_moments: BTreeSet<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub string_flags: BTreeMap<String, String>,
    #[serde(deserialize_with = "deserialize_unit")]
    trust: f32,
    #[serde(deserialize_with = "deserialize_unit")]
    autonomy: f32,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            act: 1,
            scene: 1,
            choices: BTreeMap::new(),
            unlocked_commands: BTreeSet::new(),
            revealed_moments: BTreeSet::new(),
            destroyed_moments: BTreeSet::new(),
            preserved_moments: BTreeSet::new(),
            remembered_moments: BTreeSet::new(),
            flags: BTreeMap::new(),
            string_flags: BTreeMap::new(),
            trust: 0.5,
            autonomy: 0.0,
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a choice and shifts the player-city relationship.
    pub fn record_choice(&mut self, pattern: ChoicePattern) -> u32 {
        let count = self.choices.entry(pattern).or_insert(0);
        *count += 1;
        let count = *count;

        let (trust, autonomy) = pattern.relationship_shift();
        self.trust = clamp_unit(self.trust + trust);
        self.autonomy = clamp_unit(self.autonomy + autonomy);
        count
    }

    pub fn choice_count(&self, pattern: ChoicePattern) -> u32 {
        self.choices.get(&pattern).copied().unwrap_or(0)
    }

    pub fn total_choices(&self) -> u32 {
        self.choices.values().sum()
    }

    /// The most chosen pattern. Ties go to the earlier pattern in
    /// [`ChoicePattern::all`]; `None` before any choice is made.
    pub fn dominant_pattern(&self) -> Option<ChoicePattern> {
        let mut best: Option<(ChoicePattern, u32)> = None;
        for pattern in ChoicePattern::all() {
            let count = self.choice_count(*pattern);
            if count == 0 {
                continue;
            }
            match best {
                Some((_, top)) if top >= count => {}
                _ => best = Some((*pattern, count)),
            }
        }
        best.map(|(p, _)| p)
    }

    pub fn trust(&self) -> f32 {
        self.trust
    }

    pub fn autonomy(&self) -> f32 {
        self.autonomy
    }

    pub fn advance_scene(&mut self) {
        self.scene += 1;
    }

    /// Moves to the next act and resets the scene counter.
    pub fn advance_act(&mut self) {
        self.act += 1;
        self.scene = 1;
    }

    pub fn unlock_command(&mut self, command: impl Into<String>) -> bool {
        self.unlocked_commands.insert(command.into())
    }

    pub fn is_unlocked(&self, command: &str) -> bool {
        self.unlocked_commands.contains(command)
    }

    pub fn set_flag(&mut self, key: impl Into<String>, value: bool) {
        self.flags.insert(key.into(), value);
    }

    pub fn flag(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }

    pub fn set_string_flag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.string_flags.insert(key.into(), value.into());
    }

    pub fn string_flag(&self, key: &str) -> Option<&str> {
        self.string_flags.get(key).map(String::as_str)
    }

    pub fn mark_revealed(&mut self, moment_id: impl Into<String>) -> bool {
        self.revealed_moments.insert(moment_id.into())
    }

    pub fn mark_destroyed(&mut self, moment_id: impl Into<String>) -> bool {
        self.destroyed_moments.insert(moment_id.into())
    }

    pub fn mark_preserved(&mut self, moment_id: impl Into<String>) -> bool {
        self.preserved_moments.insert(moment_id.into())
    }

    pub fn mark_remembered(&mut self, moment_id: impl Into<String>) -> bool {
        self.remembered_moments.insert(moment_id.into())
    }

    /// Whether the moment's fragility roll has already been made.
    pub fn is_settled(&self, moment_id: &str) -> bool {
        self.destroyed_moments.contains(moment_id) || self.preserved_moments.contains(moment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_choice_counts() {
        let mut state = GameState::new();
        assert_eq!(state.record_choice(ChoicePattern::Story), 1);
        assert_eq!(state.record_choice(ChoicePattern::Story), 2);
        state.record_choice(ChoicePattern::Control);

        assert_eq!(state.choice_count(ChoicePattern::Story), 2);
        assert_eq!(state.choice_count(ChoicePattern::Efficiency), 0);
        assert_eq!(state.total_choices(), 3);
    }

    #[test]
    fn test_dominant_pattern() {
        let mut state = GameState::new();
        assert_eq!(state.dominant_pattern(), None);

        state.record_choice(ChoicePattern::Control);
        state.record_choice(ChoicePattern::Autonomy);
        // Tie: earlier pattern wins.
        assert_eq!(state.dominant_pattern(), Some(ChoicePattern::Autonomy));

        state.record_choice(ChoicePattern::Control);
        assert_eq!(state.dominant_pattern(), Some(ChoicePattern::Control));
    }

    #[test]
    fn test_relationship_scalars_clamp() {
        let mut state = GameState::new();
        for _ in 0..40 {
            state.record_choice(ChoicePattern::Control);
        }
        assert_eq!(state.trust(), 0.0);
        assert_eq!(state.autonomy(), 0.0);

        for _ in 0..40 {
            state.record_choice(ChoicePattern::Autonomy);
        }
        assert!(state.trust() <= 1.0);
        assert_eq!(state.autonomy(), 1.0);
    }

    #[test]
    fn test_act_and_flags() {
        let mut state = GameState::new();
        state.advance_scene();
        assert_eq!(state.scene, 2);
        state.advance_act();
        assert_eq!((state.act, state.scene), (2, 1));

        assert!(state.unlock_command("listen"));
        assert!(!state.unlock_command("listen"));
        assert!(state.is_unlocked("listen"));

        state.set_flag("met_river", true);
        assert!(state.flag("met_river"));
        assert!(!state.flag("unknown"));
        state.set_string_flag("river_name", "Lethe");
        assert_eq!(state.string_flag("river_name"), Some("Lethe"));
    }

    #[test]
    fn test_settled_moments() {
        let mut state = GameState::new();
        state.mark_revealed("m_a");
        state.mark_revealed("m_b");
        assert!(!state.is_settled("m_a"));

        state.mark_preserved("m_a");
        state.mark_destroyed("m_b");
        assert!(state.is_settled("m_a"));
        assert!(state.is_settled("m_b"));
        assert!(!state.is_settled("m_c"));
    }

    #[test]
    fn test_decode_clamps_relationship_values() {
        let mut value = serde_json::to_value(GameState::new()).unwrap();
        value["trust"] = serde_json::json!(2.0);
        value["autonomy"] = serde_json::json!(-0.3);

        let state: GameState = serde_json::from_value(value).unwrap();

        assert_eq!(state.trust(), 1.0);
        assert_eq!(state.autonomy(), 0.0);
        assert!(state.preserved_moments.is_empty());
    }
}
