//! Urban Threads
//!
//! Threads are the sub-entities a city is woven from. Each thread keeps its own
//! copy of every relationship it takes part in, so a link between two threads
//! is stored twice: once on each endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::resources::{
    clamp_signed, clamp_unit, deserialize_signed, deserialize_unit, deserialize_unit_opt,
};
use crate::rules::{RelationshipRules, ThreadPair};

/// Category of an urban thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadCategory {
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

impl ThreadCategory {
    /// Returns all categories.
    pub fn all() -> &'static [ThreadCategory] {
        &[
            ThreadCategory::Transit,
            ThreadCategory::Housing,
            ThreadCategory::Culture,
            ThreadCategory::Commerce,
            ThreadCategory::Parks,
            ThreadCategory::Water,
            ThreadCategory::Power,
            ThreadCategory::Sewage,
            ThreadCategory::Knowledge,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThreadCategory::Transit => "transit",
            ThreadCategory::Housing => "housing",
            ThreadCategory::Culture => "culture",
            ThreadCategory::Commerce => "commerce",
            ThreadCategory::Parks => "parks",
            ThreadCategory::Water => "water",
            ThreadCategory::Power => "power",
            ThreadCategory::Sewage => "sewage",
            ThreadCategory::Knowledge => "knowledge",
        }
    }
}

impl fmt::Display for ThreadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown thread category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for ThreadCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThreadCategory::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}

/// Kind of link between two threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Support,
    Harmony,
    Tension,
    Resonance,
    Dependency,
}

/// One endpoint's record of a link to another thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRelationship {
    pub id: String,
    pub other_thread_id: String,
    pub kind: RelationKind,
    #[serde(deserialize_with = "deserialize_unit")]
    strength: f32,
    #[serde(deserialize_with = "deserialize_signed")]
    synergy: f32,
    pub formed_at: DateTime<Utc>,
    pub same_type: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_unit_opt"
    )]
    pub resonance: Option<f32>,
}

impl ThreadRelationship {
    /// Creates a relationship; strength and synergy are clamped.
    pub fn new(
        other_thread_id: impl Into<String>,
        kind: RelationKind,
        strength: f32,
        synergy: f32,
        formed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            other_thread_id: other_thread_id.into(),
            kind,
            strength: clamp_unit(strength),
            synergy: clamp_signed(synergy),
            formed_at,
            same_type: false,
            resonance: None,
        }
    }

    /// Marks the relationship as linking two threads of the same category.
    pub fn with_resonance(mut self, resonance: f32) -> Self {
        self.same_type = true;
        self.resonance = Some(clamp_unit(resonance));
        self
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn synergy(&self) -> f32 {
        self.synergy
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = clamp_unit(strength);
    }

    pub fn set_synergy(&mut self, synergy: f32) {
        self.synergy = clamp_signed(synergy);
    }

    /// Shifts strength and synergy, clamping both.
    pub fn deepen(&mut self, strength_delta: f32, synergy_delta: f32) {
        self.set_strength(self.strength + strength_delta);
        self.set_synergy(self.synergy + synergy_delta);
    }
}

/// A single thread woven into a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrbanThread {
    pub id: String,
    pub category: ThreadCategory,
    pub instance: u32,
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_unit")]
    coherence: f32,
    #[serde(deserialize_with = "deserialize_unit")]
    autonomy: f32,
    #[serde(deserialize_with = "deserialize_unit")]
    complexity: f32,
    #[serde(default)]
    pub relationships: Vec<ThreadRelationship>,
    /// Owning city, by id.
    pub city_id: String,
}

impl UrbanThread {
    pub fn new(
        category: ThreadCategory,
        instance: u32,
        city_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}-{}", category, instance),
            category,
            instance,
            created_at,
            coherence: 0.5,
            autonomy: 0.0,
            complexity: 0.1,
            relationships: Vec::new(),
            city_id: city_id.into(),
        }
    }

    pub fn coherence(&self) -> f32 {
        self.coherence
    }

    pub fn autonomy(&self) -> f32 {
        self.autonomy
    }

    pub fn complexity(&self) -> f32 {
        self.complexity
    }

    pub fn adjust_coherence(&mut self, delta: f32) -> f32 {
        self.coherence = clamp_unit(self.coherence + delta);
        self.coherence
    }

    pub fn adjust_autonomy(&mut self, delta: f32) -> f32 {
        self.autonomy = clamp_unit(self.autonomy + delta);
        self.autonomy
    }

    pub fn adjust_complexity(&mut self, delta: f32) -> f32 {
        self.complexity = clamp_unit(self.complexity + delta);
        self.complexity
    }

    /// Adds a relationship unless one to the same thread already exists.
    ///
    /// Returns false when the call was a no-op.
    pub fn add_relationship(&mut self, relationship: ThreadRelationship) -> bool {
        if self.is_linked_to(&relationship.other_thread_id) {
            return false;
        }
        self.relationships.push(relationship);
        true
    }

    pub fn is_linked_to(&self, other_thread_id: &str) -> bool {
        self.relationships
            .iter()
            .any(|r| r.other_thread_id == other_thread_id)
    }

    pub fn relationship_with(&self, other_thread_id: &str) -> Option<&ThreadRelationship> {
        self.relationships
            .iter()
            .find(|r| r.other_thread_id == other_thread_id)
    }

    /// Mean relationship strength, 0 with no relationships.
    pub fn integration_level(&self) -> f32 {
        mean(self.relationships.iter().map(|r| r.strength))
    }

    /// Mean relationship synergy, 0 with no relationships.
    pub fn average_synergy(&self) -> f32 {
        mean(self.relationships.iter().map(|r| r.synergy))
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0f32, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// The set of threads owned by a city, plus their relationship edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadGraph {
    threads: Vec<UrbanThread>,
}

impl ThreadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weaves a new thread and links it to every existing thread.
    ///
    /// Links are created from the rule table and recorded on both endpoints.
    /// Returns the new thread's id.
    pub fn weave(
        &mut self,
        category: ThreadCategory,
        city_id: &str,
        now: DateTime<Utc>,
        rules: &RelationshipRules,
    ) -> String {
        let instance = self.count_of(category) as u32 + 1;
        let mut thread = UrbanThread::new(category, instance, city_id, now);

        for existing in &mut self.threads {
            let template = rules.relationship(existing.category, category);
            let same_type = existing.category == category;
            let kind = if same_type {
                RelationKind::Resonance
            } else {
                template.kind
            };

            let mut theirs =
                ThreadRelationship::new(&thread.id, kind, template.strength, template.synergy, now);
            let mut ours =
                ThreadRelationship::new(&existing.id, kind, template.strength, template.synergy, now);
            if same_type {
                let resonance = same_type_resonance(template.strength, template.synergy);
                theirs = theirs.with_resonance(resonance);
                ours = ours.with_resonance(resonance);
            }

            existing.add_relationship(theirs);
            thread.add_relationship(ours);
        }

        let id = thread.id.clone();
        self.threads.push(thread);
        id
    }

    /// Inserts a pre-built thread. Ignored if the id is already present.
    pub fn insert(&mut self, thread: UrbanThread) -> bool {
        if self.get(&thread.id).is_some() {
            return false;
        }
        self.threads.push(thread);
        true
    }

    /// Links two existing threads symmetrically. First relationship wins on
    /// each side.
    pub fn link(
        &mut self,
        a_id: &str,
        b_id: &str,
        kind: RelationKind,
        strength: f32,
        synergy: f32,
        now: DateTime<Utc>,
    ) -> bool {
        if a_id == b_id {
            return false;
        }
        let (Some(a_cat), Some(b_cat)) = (
            self.get(a_id).map(|t| t.category),
            self.get(b_id).map(|t| t.category),
        ) else {
            return false;
        };
        let same_type = a_cat == b_cat;
        let build = |other: &str| {
            let rel = ThreadRelationship::new(other, kind, strength, synergy, now);
            if same_type {
                rel.with_resonance(same_type_resonance(strength, synergy))
            } else {
                rel
            }
        };

        let mut added = false;
        if let Some(a) = self.get_mut(a_id) {
            added |= a.add_relationship(build(b_id));
        }
        if let Some(b) = self.get_mut(b_id) {
            added |= b.add_relationship(build(a_id));
        }
        added
    }

    pub fn get(&self, id: &str) -> Option<&UrbanThread> {
        self.threads.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut UrbanThread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    pub fn threads(&self) -> &[UrbanThread] {
        &self.threads
    }

    pub fn iter(&self) -> impl Iterator<Item = &UrbanThread> {
        self.threads.iter()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn count_of(&self, category: ThreadCategory) -> usize {
        self.threads.iter().filter(|t| t.category == category).count()
    }

    pub fn has_category(&self, category: ThreadCategory) -> bool {
        self.threads.iter().any(|t| t.category == category)
    }

    pub fn of_category(&self, category: ThreadCategory) -> impl Iterator<Item = &UrbanThread> {
        self.threads.iter().filter(move |t| t.category == category)
    }

    fn categories_by_id(&self) -> HashMap<&str, ThreadCategory> {
        self.threads
            .iter()
            .map(|t| (t.id.as_str(), t.category))
            .collect()
    }

    /// Relationships linking a thread of one category to a thread of the
    /// other. Each link is reported once, from the endpoint whose category
    /// sorts first in the normalized pair.
    pub fn relationships_between(
        &self,
        a: ThreadCategory,
        b: ThreadCategory,
    ) -> Vec<&ThreadRelationship> {
        let pair = ThreadPair::new(a, b);
        let categories = self.categories_by_id();
        let mut found = Vec::new();

        for thread in self.of_category(pair.first()) {
            for rel in &thread.relationships {
                let Some(other) = categories.get(rel.other_thread_id.as_str()) else {
                    continue;
                };
                if *other != pair.second() {
                    continue;
                }
                // Same-category links appear on both endpoints; keep one.
                if pair.is_same_type() && thread.id.as_str() > rel.other_thread_id.as_str() {
                    continue;
                }
                found.push(rel);
            }
        }
        found
    }

    /// Deepens every relationship between two categories, on both endpoints.
    pub fn deepen_between(
        &mut self,
        a: ThreadCategory,
        b: ThreadCategory,
        strength_delta: f32,
        synergy_delta: f32,
    ) -> usize {
        let pair = ThreadPair::new(a, b);
        let categories: HashMap<String, ThreadCategory> = self
            .threads
            .iter()
            .map(|t| (t.id.clone(), t.category))
            .collect();
        let mut touched = 0;

        for thread in &mut self.threads {
            if !pair.contains(thread.category) {
                continue;
            }
            let wanted = if thread.category == pair.first() {
                pair.second()
            } else {
                pair.first()
            };
            for rel in &mut thread.relationships {
                if categories.get(&rel.other_thread_id) == Some(&wanted) {
                    rel.deepen(strength_delta, synergy_delta);
                    touched += 1;
                }
            }
        }
        touched
    }

    /// Mean integration level over threads of the given categories.
    pub fn average_integration(&self, categories: &[ThreadCategory]) -> f32 {
        mean(
            self.threads
                .iter()
                .filter(|t| categories.contains(&t.category))
                .map(|t| t.integration_level()),
        )
    }

    /// Mean synergy across every thread.
    pub fn average_synergy(&self) -> f32 {
        mean(self.threads.iter().map(|t| t.average_synergy()))
    }

    /// Mean integration level across every thread.
    pub fn integration_level(&self) -> f32 {
        mean(self.threads.iter().map(|t| t.integration_level()))
    }

    /// Number of distinct links (each stored twice).
    pub fn link_count(&self) -> usize {
        self.threads.iter().map(|t| t.relationships.len()).sum::<usize>() / 2
    }
}

fn same_type_resonance(strength: f32, synergy: f32) -> f32 {
    clamp_unit((strength + synergy.max(0.0)) / 2.0 + 0.25)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_category_parse_and_display() {
        assert_eq!("Transit".parse::<ThreadCategory>().unwrap(), ThreadCategory::Transit);
        assert_eq!(" sewage ".parse::<ThreadCategory>().unwrap(), ThreadCategory::Sewage);
        assert!("monorail".parse::<ThreadCategory>().is_err());
        assert_eq!(ThreadCategory::Knowledge.to_string(), "knowledge");
    }

    #[test]
    fn test_relationship_clamps_on_write() {
        let mut rel = ThreadRelationship::new("parks-1", RelationKind::Harmony, 1.8, -2.0, now());
        assert_eq!(rel.strength(), 1.0);
        assert_eq!(rel.synergy(), -1.0);

        rel.deepen(-5.0, 5.0);
        assert_eq!(rel.strength(), 0.0);
        assert_eq!(rel.synergy(), 1.0);
    }

    #[test]
    fn test_decode_clamps_thread_values() {
        let mut thread = UrbanThread::new(ThreadCategory::Water, 1, "city", now());
        thread.add_relationship(
            ThreadRelationship::new("water-2", RelationKind::Resonance, 0.5, 0.5, now())
                .with_resonance(0.5),
        );
        let mut value = serde_json::to_value(&thread).unwrap();
        value["complexity"] = serde_json::json!(2.5);
        value["coherence"] = serde_json::json!(-1.0);
        value["relationships"][0]["strength"] = serde_json::json!(9.0);
        value["relationships"][0]["synergy"] = serde_json::json!(-9.0);
        value["relationships"][0]["resonance"] = serde_json::json!(1.5);

        let thread: UrbanThread = serde_json::from_value(value).unwrap();

        assert_eq!(thread.complexity(), 1.0);
        assert_eq!(thread.coherence(), 0.0);
        let rel = &thread.relationships[0];
        assert_eq!((rel.strength(), rel.synergy()), (1.0, -1.0));
        assert_eq!(rel.resonance, Some(1.0));
    }

    #[test]
    fn test_add_relationship_is_idempotent() {
        let mut thread = UrbanThread::new(ThreadCategory::Transit, 1, "city", now());
        let first = ThreadRelationship::new("water-1", RelationKind::Support, 0.3, 0.1, now());
        let second = ThreadRelationship::new("water-1", RelationKind::Tension, 0.9, -0.5, now());

        assert!(thread.add_relationship(first));
        assert!(!thread.add_relationship(second));
        assert_eq!(thread.relationships.len(), 1);
        assert_eq!(thread.relationships[0].kind, RelationKind::Support);
    }

    #[test]
    fn test_metrics_empty_thread() {
        let thread = UrbanThread::new(ThreadCategory::Parks, 1, "city", now());
        assert_eq!(thread.integration_level(), 0.0);
        assert_eq!(thread.average_synergy(), 0.0);
    }

    #[test]
    fn test_metrics_are_means() {
        let mut thread = UrbanThread::new(ThreadCategory::Parks, 1, "city", now());
        thread.add_relationship(ThreadRelationship::new("a", RelationKind::Support, 0.2, 0.4, now()));
        thread.add_relationship(ThreadRelationship::new("b", RelationKind::Support, 0.6, -0.2, now()));

        assert!((thread.integration_level() - 0.4).abs() < 1e-6);
        assert!((thread.average_synergy() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_weave_links_symmetrically() {
        let rules = RelationshipRules::standard();
        let mut graph = ThreadGraph::new();

        let transit = graph.weave(ThreadCategory::Transit, "city", now(), &rules);
        let housing = graph.weave(ThreadCategory::Housing, "city", now(), &rules);

        assert_eq!(transit, "transit-1");
        let t = graph.get(&transit).unwrap();
        let h = graph.get(&housing).unwrap();
        assert!(t.is_linked_to(&housing));
        assert!(h.is_linked_to(&transit));
        assert_eq!(t.relationship_with(&housing).unwrap().kind, RelationKind::Dependency);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn test_weave_same_category_resonates() {
        let rules = RelationshipRules::standard();
        let mut graph = ThreadGraph::new();

        let first = graph.weave(ThreadCategory::Parks, "city", now(), &rules);
        let second = graph.weave(ThreadCategory::Parks, "city", now(), &rules);

        assert_eq!(second, "parks-2");
        let rel = graph.get(&first).unwrap().relationship_with(&second).unwrap();
        assert!(rel.same_type);
        assert_eq!(rel.kind, RelationKind::Resonance);
        assert!(rel.resonance.is_some());
        assert_eq!(
            graph.relationships_between(ThreadCategory::Parks, ThreadCategory::Parks).len(),
            1
        );
    }

    #[test]
    fn test_link_is_idempotent() {
        let rules = RelationshipRules::standard();
        let mut graph = ThreadGraph::new();
        let a = graph.weave(ThreadCategory::Water, "city", now(), &rules);
        let b = graph.weave(ThreadCategory::Power, "city", now(), &rules);

        assert!(!graph.link(&a, &b, RelationKind::Harmony, 0.9, 0.9, now()));
        assert_eq!(graph.get(&a).unwrap().relationships.len(), 1);
        assert_eq!(graph.get(&a).unwrap().relationships[0].kind, RelationKind::Tension);
    }

    #[test]
    fn test_relationships_between_either_order() {
        let rules = RelationshipRules::standard();
        let mut graph = ThreadGraph::new();
        graph.weave(ThreadCategory::Water, "city", now(), &rules);
        graph.weave(ThreadCategory::Sewage, "city", now(), &rules);
        graph.weave(ThreadCategory::Sewage, "city", now(), &rules);

        let forward = graph.relationships_between(ThreadCategory::Water, ThreadCategory::Sewage);
        let backward = graph.relationships_between(ThreadCategory::Sewage, ThreadCategory::Water);
        assert_eq!(forward.len(), 2);
        assert_eq!(backward.len(), 2);
    }

    #[test]
    fn test_deepen_between_touches_both_endpoints() {
        let rules = RelationshipRules::standard();
        let mut graph = ThreadGraph::new();
        let culture = graph.weave(ThreadCategory::Culture, "city", now(), &rules);
        let knowledge = graph.weave(ThreadCategory::Knowledge, "city", now(), &rules);

        let touched = graph.deepen_between(ThreadCategory::Knowledge, ThreadCategory::Culture, 0.5, 0.5);
        assert_eq!(touched, 2);
        assert_eq!(graph.get(&culture).unwrap().relationship_with(&knowledge).unwrap().strength(), 1.0);
        assert_eq!(graph.get(&knowledge).unwrap().relationship_with(&culture).unwrap().synergy(), 1.0);
    }
}
