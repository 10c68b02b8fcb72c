//! Dialogue library documents.

use serde::{Deserialize, Serialize};

use crate::city::Mood;
use crate::thread::ThreadCategory;

/// Who speaks a fragment: the city itself or one of its thread categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Speaker {
    City,
    Transit,
    Housing,
    Culture,
    Commerce,
    Parks,
    Water,
    Power,
    Sewage,
    Knowledge,
}

impl From<ThreadCategory> for Speaker {
    fn from(category: ThreadCategory) -> Self {
        match category {
            ThreadCategory::Transit => Speaker::Transit,
            ThreadCategory::Housing => Speaker::Housing,
            ThreadCategory::Culture => Speaker::Culture,
            ThreadCategory::Commerce => Speaker::Commerce,
            ThreadCategory::Parks => Speaker::Parks,
            ThreadCategory::Water => Speaker::Water,
            ThreadCategory::Power => Speaker::Power,
            ThreadCategory::Sewage => Speaker::Sewage,
            ThreadCategory::Knowledge => Speaker::Knowledge,
        }
    }
}

/// Situation a fragment is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DialogueContext {
    Greeting,
    Awakening,
    Waiting,
    Anxious,
    Content,
    Forgotten,
    Transcendent,
    ThreadWoven,
    Emergence,
    Farewell,
}

impl From<Mood> for DialogueContext {
    fn from(mood: Mood) -> Self {
        match mood {
            Mood::Awakening => DialogueContext::Awakening,
            Mood::Waiting => DialogueContext::Waiting,
            Mood::Anxious => DialogueContext::Anxious,
            Mood::Content => DialogueContext::Content,
            Mood::Forgotten => DialogueContext::Forgotten,
            Mood::Transcendent => DialogueContext::Transcendent,
        }
    }
}

/// A group of interchangeable lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueFragment {
    pub id: String,
    pub speaker: Speaker,
    pub fragments: Vec<String>,
    pub context: DialogueContext,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Document shape for one speaker's dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueLibraryFile {
    pub speaker: Speaker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_terminology: Option<Vec<String>>,
    #[serde(default)]
    pub dialogue_fragments: Vec<DialogueFragment>,
}
