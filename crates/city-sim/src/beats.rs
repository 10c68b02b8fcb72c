//! Story beat evaluation.
//!
//! Beats are checked against the city after every evaluation pass. A one-time
//! beat counts as occurred once its id is in the city's triggered set. The
//! engine's authored beats are shared by every city it runs and are never
//! marked themselves.

use city_model::{BeatTrigger, City, RelationKind, StoryBeat, Thought};
use tracing::info;

/// A beat that fired, with the thought it offers, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredBeat {
    pub id: String,
    pub name: String,
    pub thought: Option<Thought>,
}

/// Holds authored beats and fires them against cities.
#[derive(Debug, Clone, Default)]
pub struct StoryBeatEngine {
    beats: Vec<StoryBeat>,
}

impl StoryBeatEngine {
    pub fn new(beats: Vec<StoryBeat>) -> Self {
        Self { beats }
    }

    pub fn beats(&self) -> &[StoryBeat] {
        &self.beats
    }

    pub fn get(&self, id: &str) -> Option<&StoryBeat> {
        self.beats.iter().find(|b| b.id == id)
    }

    /// The authored beats with `has_occurred` filled in for this city.
    pub fn beats_for(&self, city: &City) -> Vec<StoryBeat> {
        self.beats
            .iter()
            .map(|beat| StoryBeat {
                has_occurred: city.has_triggered(&beat.id),
                ..beat.clone()
            })
            .collect()
    }

    /// Fires every eligible beat whose trigger holds, in authored order.
    pub fn evaluate(&self, city: &mut City) -> Vec<FiredBeat> {
        let mut fired = Vec::new();
        for beat in &self.beats {
            if is_spent(beat, city) || !trigger_met(&beat.trigger, city) {
                continue;
            }
            fired.push(fire(beat, city));
        }
        fired
    }

    /// Fires a beat by id, regardless of its trigger. Spent one-time beats
    /// and unknown ids yield `None`.
    pub fn fire_by_id(&self, id: &str, city: &mut City) -> Option<FiredBeat> {
        let beat = self.get(id)?;
        if is_spent(beat, city) {
            return None;
        }
        Some(fire(beat, city))
    }
}

fn is_spent(beat: &StoryBeat, city: &City) -> bool {
    beat.one_time_only && city.has_triggered(&beat.id)
}

/// Whether the trigger condition holds for the city right now.
pub fn trigger_met(trigger: &BeatTrigger, city: &City) -> bool {
    let threads = &city.threads;
    match trigger {
        BeatTrigger::ThreadCreated { count } => threads.len() >= *count,
        BeatTrigger::ThreadTypeCreated { thread_type, count } => {
            threads.count_of(*thread_type) >= *count
        }
        BeatTrigger::RelationshipFormed { between: [a, b] } => {
            !threads.relationships_between(*a, *b).is_empty()
        }
        BeatTrigger::EmergentPropertyAppeared { name } => city.has_emergent_property(name),
        BeatTrigger::SynergyAbove {
            between: [a, b],
            threshold,
        } => threads
            .relationships_between(*a, *b)
            .iter()
            .any(|r| r.synergy() > *threshold),
        BeatTrigger::TensionAbove {
            between: [a, b],
            threshold,
        } => threads
            .relationships_between(*a, *b)
            .iter()
            .any(|r| r.kind == RelationKind::Tension && r.strength() > *threshold),
        BeatTrigger::CityCoherenceAbove { threshold } => city.resources.coherence() > *threshold,
        BeatTrigger::ThreadComplexityAbove {
            thread_type,
            threshold,
        } => threads
            .of_category(*thread_type)
            .any(|t| t.complexity() > *threshold),
    }
}

fn fire(beat: &StoryBeat, city: &mut City) -> FiredBeat {
    city.triggered_story_beats.insert(beat.id.clone());
    for line in &beat.dialogue {
        city.push_log(line.clone());
    }

    if let Some(effects) = &beat.effects {
        for (kind, delta) in &effects.resources {
            city.adjust(*kind, *delta);
        }
        for (category, delta) in &effects.thread_complexity {
            let ids: Vec<String> = city
                .threads
                .of_category(*category)
                .map(|t| t.id.clone())
                .collect();
            for id in ids {
                if let Some(thread) = city.threads.get_mut(&id) {
                    thread.adjust_complexity(*delta);
                }
            }
        }
    }

    info!("Story beat {} ({}) fired in {}", beat.id, beat.trigger.tag(), city.name);
    FiredBeat {
        id: beat.id.clone(),
        name: beat.name.clone(),
        thought: beat.thought.clone(),
    }
}
