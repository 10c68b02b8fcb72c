//! City aggregate
//!
//! The root entity of the simulation. A city owns its threads, its emergent
//! properties and its narrative log; everything else refers to it by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::emergence::EmergentProperty;
use crate::resources::{clamp_unit, deserialize_unit, ResourceKind, Resources};
use crate::thread::ThreadGraph;

/// Parameter key: multiplier reported by growth-rate narrative lines.
pub const PARAM_GROWTH_RATE: &str = "growth_rate";
/// Parameter key: number of requests the player has answered.
pub const PARAM_RESPONSES_GIVEN: &str = "responses_given";

/// Discrete mood of a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Awakening,
    Waiting,
    Anxious,
    Content,
    Forgotten,
    Transcendent,
}

impl Mood {
    pub fn all() -> &'static [Mood] {
        &[
            Mood::Awakening,
            Mood::Waiting,
            Mood::Anxious,
            Mood::Content,
            Mood::Forgotten,
            Mood::Transcendent,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Awakening => "awakening",
            Mood::Waiting => "waiting",
            Mood::Anxious => "anxious",
            Mood::Content => "content",
            Mood::Forgotten => "forgotten",
            Mood::Transcendent => "transcendent",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question the city has put to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRequest {
    pub id: String,
    pub text: String,
    pub asked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

impl CityRequest {
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// The aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_unit")]
    progress: f32,
    #[serde(default)]
    pub log: Vec<String>,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub parameters: BTreeMap<String, f32>,
    #[serde(default)]
    pub mood: Mood,
    #[serde(deserialize_with = "deserialize_unit")]
    attention_level: f32,
    pub last_interaction: DateTime<Utc>,
    #[serde(default)]
    pub awareness_events: Vec<String>,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub threads: ThreadGraph,
    #[serde(default)]
    pub emergent_properties: Vec<EmergentProperty>,
    #[serde(default)]
    pub discovered_perceptions: Vec<String>,
    #[serde(default)]
    pub triggered_story_beats: BTreeSet<String>,
    #[serde(default)]
    pub requests: Vec<CityRequest>,
}

impl City {
    /// Creates a fresh city: no progress, default resources, half attention.
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            progress: 0.0,
            log: Vec::new(),
            is_running: false,
            parameters: BTreeMap::new(),
            mood: Mood::Awakening,
            attention_level: 0.5,
            last_interaction: now,
            awareness_events: Vec::new(),
            resources: Resources::new(),
            threads: ThreadGraph::new(),
            emergent_properties: Vec::new(),
            discovered_perceptions: Vec::new(),
            triggered_story_beats: BTreeSet::new(),
            requests: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = clamp_unit(progress);
    }

    pub fn advance_progress(&mut self, delta: f32) -> f32 {
        self.set_progress(self.progress + delta);
        self.progress
    }

    pub fn attention_level(&self) -> f32 {
        self.attention_level
    }

    pub fn set_attention_level(&mut self, attention: f32) {
        self.attention_level = clamp_unit(attention);
    }

    pub fn adjust_attention(&mut self, delta: f32) -> f32 {
        self.set_attention_level(self.attention_level + delta);
        self.attention_level
    }

    /// Shorthand for `resources.adjust`.
    pub fn adjust(&mut self, kind: ResourceKind, delta: f32) -> f32 {
        self.resources.adjust(kind, delta)
    }

    /// Hours since the player last interacted, never negative.
    pub fn abandonment_hours(&self, now: DateTime<Utc>) -> f32 {
        let seconds = (now - self.last_interaction).num_seconds().max(0);
        seconds as f32 / 3600.0
    }

    pub fn unanswered_requests(&self) -> usize {
        self.requests.iter().filter(|r| !r.is_answered()).count()
    }

    pub fn request(&self, id: &str) -> Option<&CityRequest> {
        self.requests.iter().find(|r| r.id == id)
    }

    pub fn request_mut(&mut self, id: &str) -> Option<&mut CityRequest> {
        self.requests.iter_mut().find(|r| r.id == id)
    }

    /// Records a new request and returns its id.
    pub fn ask(&mut self, text: impl Into<String>, now: DateTime<Utc>) -> String {
        let id = format!("req_{:04}", self.requests.len() + 1);
        self.requests.push(CityRequest {
            id: id.clone(),
            text: text.into(),
            asked_at: now,
            answer: None,
            answered_at: None,
        });
        id
    }

    pub fn parameter(&self, key: &str, default: f32) -> f32 {
        self.parameters.get(key).copied().unwrap_or(default)
    }

    pub fn set_parameter(&mut self, key: impl Into<String>, value: f32) {
        self.parameters.insert(key.into(), value);
    }

    /// Growth multiplier; 1.0 when never set.
    pub fn growth_rate(&self) -> f32 {
        self.parameter(PARAM_GROWTH_RATE, 1.0)
    }

    /// Answered request count; 0 when never set.
    pub fn responses_given(&self) -> u32 {
        self.parameter(PARAM_RESPONSES_GIVEN, 0.0).max(0.0) as u32
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    pub fn push_awareness(&mut self, event: impl Into<String>) {
        self.awareness_events.push(event.into());
    }

    /// Adds a perception unless already discovered. Returns true if new.
    pub fn discover(&mut self, perception: impl Into<String>) -> bool {
        let perception = perception.into();
        if self.discovered_perceptions.contains(&perception) {
            return false;
        }
        self.discovered_perceptions.push(perception);
        true
    }

    pub fn has_emergent_property(&self, name: &str) -> bool {
        self.emergent_properties.iter().any(|p| p.name == name)
    }

    pub fn has_triggered(&self, beat_id: &str) -> bool {
        self.triggered_story_beats.contains(beat_id)
    }

    /// Read-only view for dashboards.
    pub fn snapshot(&self, now: DateTime<Utc>) -> CitySnapshot {
        CitySnapshot {
            city_id: self.id.clone(),
            name: self.name.clone(),
            progress: self.progress,
            mood: self.mood,
            attention_level: self.attention_level,
            abandonment_hours: self.abandonment_hours(now),
            resources: self.resources.iter().collect(),
            thread_count: self.threads.len(),
            link_count: self.threads.link_count(),
            integration_level: self.threads.integration_level(),
            average_synergy: self.threads.average_synergy(),
            emergent_properties: self
                .emergent_properties
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            unanswered_requests: self.unanswered_requests(),
            triggered_story_beats: self.triggered_story_beats.iter().cloned().collect(),
            recent_log: self.log.iter().rev().take(10).rev().cloned().collect(),
            is_running: self.is_running,
        }
    }
}

/// Flattened read-only city state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySnapshot {
    pub city_id: String,
    pub name: String,
    pub progress: f32,
    pub mood: Mood,
    pub attention_level: f32,
    pub abandonment_hours: f32,
    pub resources: BTreeMap<ResourceKind, f32>,
    pub thread_count: usize,
    pub link_count: usize,
    pub integration_level: f32,
    pub average_synergy: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emergent_properties: Vec<String>,
    pub unanswered_requests: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggered_story_beats: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_log: Vec<String>,
    pub is_running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_new_city_defaults() {
        let city = City::new("Vessel", now());

        assert_eq!(city.progress(), 0.0);
        assert_eq!(city.mood, Mood::Awakening);
        assert_eq!(city.resources.coherence(), 1.0);
        assert_eq!(city.resources.trust(), 0.5);
        assert!(!city.is_running);
        assert_eq!(city.abandonment_hours(now()), 0.0);
    }

    #[test]
    fn test_progress_and_attention_clamp() {
        let mut city = City::new("Vessel", now());
        city.set_progress(1.4);
        assert_eq!(city.progress(), 1.0);
        city.adjust_attention(-2.0);
        assert_eq!(city.attention_level(), 0.0);
    }

    #[test]
    fn test_decode_clamps_bounded_fields() {
        let mut value = serde_json::to_value(City::new("Vessel", now())).unwrap();
        value["progress"] = serde_json::json!(4.0);
        value["attention_level"] = serde_json::json!(-0.5);
        value["resources"] = serde_json::json!({ "trust": 3.0, "autonomy": -1.0 });

        let city: City = serde_json::from_value(value).unwrap();

        assert_eq!(city.progress(), 1.0);
        assert_eq!(city.attention_level(), 0.0);
        assert_eq!(city.resources.trust(), 1.0);
        assert_eq!(city.resources.autonomy(), 0.0);
    }

    #[test]
    fn test_abandonment_hours() {
        let city = City::new("Vessel", now());
        let later = now() + Duration::hours(30);
        assert!((city.abandonment_hours(later) - 30.0).abs() < 1e-4);
        assert_eq!(city.abandonment_hours(now() - Duration::hours(2)), 0.0);
    }

    #[test]
    fn test_requests() {
        let mut city = City::new("Vessel", now());
        let id = city.ask("Will you name the river?", now());
        city.ask("Do you hear the trains?", now());
        assert_eq!(city.unanswered_requests(), 2);

        city.request_mut(&id).unwrap().answer = Some("Yes".to_string());
        assert_eq!(city.unanswered_requests(), 1);
    }

    #[test]
    fn test_discover_dedupes() {
        let mut city = City::new("Vessel", now());
        assert!(city.discover("the tide of commuters"));
        assert!(!city.discover("the tide of commuters"));
        assert_eq!(city.discovered_perceptions.len(), 1);
    }

    #[test]
    fn test_parameter_defaults() {
        let mut city = City::new("Vessel", now());
        assert_eq!(city.growth_rate(), 1.0);
        assert_eq!(city.responses_given(), 0);
        city.set_parameter(PARAM_RESPONSES_GIVEN, 3.0);
        assert_eq!(city.responses_given(), 3);
    }

    #[test]
    fn test_mood_serialization() {
        assert_eq!(serde_json::to_string(&Mood::Transcendent).unwrap(), r#""transcendent""#);
        assert_eq!(Mood::Forgotten.to_string(), "forgotten");
    }

    #[test]
    fn test_city_json_roundtrip_keeps_beats_as_set() {
        let mut city = City::new("Vessel", now());
        city.triggered_story_beats.insert("first_light".to_string());
        city.triggered_story_beats.insert("first_light".to_string());

        let json = serde_json::to_string(&city).unwrap();
        let back: City = serde_json::from_str(&json).unwrap();
        assert_eq!(back, city);
        assert_eq!(back.triggered_story_beats.len(), 1);
    }

    #[test]
    fn test_snapshot() {
        let mut city = City::new("Vessel", now());
        for i in 0..15 {
            city.push_log(format!("line {i}"));
        }
        let snapshot = city.snapshot(now() + Duration::hours(1));
        assert_eq!(snapshot.recent_log.len(), 10);
        assert_eq!(snapshot.recent_log[0], "line 5");
        assert_eq!(snapshot.resources.len(), 5);
        assert!((snapshot.abandonment_hours - 1.0).abs() < 1e-4);
    }
}
