//! Story Beats
//!
//! Authored narrative beats and their trigger conditions. Triggers are an
//! internally tagged enum: the `type` field selects the payload shape, and an
//! unknown tag fails the whole document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resources::ResourceKind;
use crate::thread::ThreadCategory;

/// Condition that fires a story beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BeatTrigger {
    /// Total thread count reached
    ThreadCreated { count: usize },
    /// Thread count of one category reached
    ThreadTypeCreated {
        #[serde(rename = "threadType")]
        thread_type: ThreadCategory,
        count: usize,
    },
    /// Any link exists between the two categories
    RelationshipFormed { between: [ThreadCategory; 2] },
    /// A named emergent property is present
    EmergentPropertyAppeared { name: String },
    /// Some link between the categories has synergy above the threshold
    SynergyAbove {
        between: [ThreadCategory; 2],
        threshold: f32,
    },
    /// Some tension link between the categories is stronger than the threshold
    TensionAbove {
        between: [ThreadCategory; 2],
        threshold: f32,
    },
    /// City coherence above the threshold
    CityCoherenceAbove { threshold: f32 },
    /// Some thread of the category has complexity above the threshold
    ThreadComplexityAbove {
        #[serde(rename = "threadType")]
        thread_type: ThreadCategory,
        threshold: f32,
    },
}

impl BeatTrigger {
    /// The `type` tag as written in documents.
    pub fn tag(&self) -> &'static str {
        match self {
            BeatTrigger::ThreadCreated { .. } => "threadCreated",
            BeatTrigger::ThreadTypeCreated { .. } => "threadTypeCreated",
            BeatTrigger::RelationshipFormed { .. } => "relationshipFormed",
            BeatTrigger::EmergentPropertyAppeared { .. } => "emergentPropertyAppeared",
            BeatTrigger::SynergyAbove { .. } => "synergyAbove",
            BeatTrigger::TensionAbove { .. } => "tensionAbove",
            BeatTrigger::CityCoherenceAbove { .. } => "cityCoherenceAbove",
            BeatTrigger::ThreadComplexityAbove { .. } => "threadComplexityAbove",
        }
    }
}

/// Deltas applied when a beat fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatEffects {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<ResourceKind, f32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thread_complexity: BTreeMap<ThreadCategory, f32>,
}

impl BeatEffects {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.thread_complexity.is_empty()
    }
}

/// A reflective thought a beat can hand to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub branches: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// An authored story beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryBeat {
    pub id: String,
    pub name: String,
    pub trigger: BeatTrigger,
    #[serde(default)]
    pub dialogue: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<BeatEffects>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<Thought>,
    #[serde(default = "default_true")]
    pub one_time_only: bool,
    #[serde(default)]
    pub has_occurred: bool,
}

impl StoryBeat {
    pub fn new(id: impl Into<String>, name: impl Into<String>, trigger: BeatTrigger) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trigger,
            dialogue: Vec::new(),
            effects: None,
            thought: None,
            one_time_only: true,
            has_occurred: false,
        }
    }

    pub fn with_dialogue(mut self, lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dialogue = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_effects(mut self, effects: BeatEffects) -> Self {
        self.effects = Some(effects);
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.one_time_only = false;
        self
    }
}

/// Document shape for a set of beats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryBeatCollection {
    #[serde(default)]
    pub beats: Vec<StoryBeat>,
}
