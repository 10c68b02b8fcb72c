//! Shared data model for the city consciousness simulation.
//!
//! This crate holds plain data: the city aggregate, its threads and their
//! relationship graph, the bounded resource model, and the declarative
//! content documents (moments, dialogue, emergence rules, story beats).
//! Scheduling and rule evaluation live in `city-sim`.

pub mod beat;
pub mod city;
pub mod dialogue;
pub mod emergence;
pub mod error;
pub mod game_state;
pub mod moment;
pub mod resources;
pub mod rules;
pub mod thread;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use beat::{BeatEffects, BeatTrigger, StoryBeat, StoryBeatCollection, Thought};
pub use city::{City, CityRequest, CitySnapshot, Mood, PARAM_GROWTH_RATE, PARAM_RESPONSES_GIVEN};
pub use dialogue::{DialogueContext, DialogueFragment, DialogueLibraryFile, Speaker};
pub use emergence::{
    ConsciousnessExpansion, DeepenedRelationship, EmergenceConditions, EmergenceRule,
    EmergenceRuleCollection, EmergentProperty,
};
pub use error::ContentError;
pub use game_state::{ChoicePattern, GameState};
pub use moment::{CityMoment, CityMomentData, MomentLibrary, MomentType};
pub use resources::{clamp_signed, clamp_unit, ResourceKind, Resources};
pub use rules::{RelationshipRules, RelationshipTemplate, ThreadPair};
pub use thread::{
    ParseCategoryError, RelationKind, ThreadCategory, ThreadGraph, ThreadRelationship,
    UrbanThread,
};
