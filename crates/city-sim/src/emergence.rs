//! Emergence evaluation.
//!
//! Rules are declarative: a set of required thread categories plus optional
//! thresholds. A rule fires at most once per city; firing records an
//! [`EmergentProperty`] and applies its consciousness expansion.

use chrono::{DateTime, Utc};
use city_model::{
    City, EmergenceConditions, EmergenceRule, EmergentProperty, ResourceKind, ThreadCategory,
};
use tracing::info;

/// A rule that fired during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Emergence {
    pub name: String,
    pub story_beat_id: Option<String>,
}

/// Evaluates emergence rules against a city.
#[derive(Debug, Clone, Default)]
pub struct EmergenceEvaluator {
    rules: Vec<EmergenceRule>,
}

impl EmergenceEvaluator {
    pub fn new(rules: Vec<EmergenceRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[EmergenceRule] {
        &self.rules
    }

    /// Fires every satisfied rule that has not yet fired for this city.
    pub fn evaluate(&self, city: &mut City, now: DateTime<Utc>) -> Vec<Emergence> {
        let mut fired = Vec::new();
        for rule in &self.rules {
            if city.has_emergent_property(&rule.name) || !conditions_met(&rule.conditions, city) {
                continue;
            }
            apply_emergence(city, rule, now);
            fired.push(Emergence {
                name: rule.name.clone(),
                story_beat_id: rule.story_beat_id.clone(),
            });
        }
        fired
    }
}

/// True when every present condition holds. Absent thresholds are vacuous.
pub fn conditions_met(conditions: &EmergenceConditions, city: &City) -> bool {
    let required = &conditions.required_thread_types;
    if !required.iter().all(|c| city.threads.has_category(*c)) {
        return false;
    }

    if let Some(min) = conditions.minimum_relationship_strength {
        if !pairs_linked_at(required, min, city) {
            return false;
        }
    }

    if let Some(min) = conditions.minimum_average_integration {
        if city.threads.average_integration(required) < min {
            return false;
        }
    }

    if let Some(min) = conditions.minimum_thread_count {
        if city.threads.len() < min {
            return false;
        }
    }

    if let Some(min) = conditions.minimum_city_complexity {
        if city.resources.complexity() < min {
            return false;
        }
    }

    true
}

/// Every pair of required categories has some link at least `min` strong.
/// A category that is required alone, or listed more than once, needs a
/// link between two of its own threads.
fn pairs_linked_at(required: &[ThreadCategory], min: f32, city: &City) -> bool {
    let strong = |a: ThreadCategory, b: ThreadCategory| {
        city.threads
            .relationships_between(a, b)
            .iter()
            .any(|r| r.strength() >= min)
    };

    let mut distinct: Vec<ThreadCategory> = Vec::with_capacity(required.len());
    for category in required {
        if !distinct.contains(category) {
            distinct.push(*category);
        }
    }

    let needs_own_link =
        |c: ThreadCategory| distinct.len() == 1 || required.iter().filter(|r| **r == c).count() > 1;
    if !distinct
        .iter()
        .filter(|c| needs_own_link(**c))
        .all(|c| strong(*c, *c))
    {
        return false;
    }

    distinct.iter().enumerate().all(|(i, a)| {
        distinct[i + 1..].iter().all(|b| strong(*a, *b))
    })
}

/// Records the property and applies its expansion to the city.
pub fn apply_emergence(city: &mut City, rule: &EmergenceRule, now: DateTime<Utc>) {
    let required = &rule.conditions.required_thread_types;
    let contributing: Vec<String> = city
        .threads
        .iter()
        .filter(|t| required.contains(&t.category))
        .map(|t| t.id.clone())
        .collect();

    let property = EmergentProperty::new(rule, contributing, city.id.clone(), now);
    let expansion = &property.expansion;

    for perception in &expansion.new_perceptions {
        city.discover(perception.clone());
    }
    city.adjust(ResourceKind::Complexity, expansion.complexity_increase);

    if let Some(categories) = &expansion.affected_thread_types {
        let ids: Vec<String> = city
            .threads
            .iter()
            .filter(|t| categories.contains(&t.category))
            .map(|t| t.id.clone())
            .collect();
        for id in ids {
            if let Some(thread) = city.threads.get_mut(&id) {
                thread.adjust_complexity(expansion.complexity_increase);
            }
        }
    }

    if let Some(deepened) = &expansion.deepened_relationships {
        for d in deepened {
            let [a, b] = d.thread_types;
            city.threads
                .deepen_between(a, b, d.strength_increase, d.synergy_increase);
        }
    }

    city.push_awareness(expansion.expanded_self_awareness.clone());
    city.push_log(format!("Something new emerges: {}", rule.name));
    info!("Emergent property {} in {}", rule.name, city.name);
    city.emergent_properties.push(property);
}
