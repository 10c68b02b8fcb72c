//! Moment selection and resolution.
//!
//! A [`MomentDeck`] holds every loaded moment with its session flags. Draws
//! are weighted by how well a moment's type suits the player's dominant
//! choice pattern; once revealed, a moment is settled by a fragility roll
//! that either destroys or preserves it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use city_model::{ChoicePattern, CityMoment, GameState, MomentLibrary, MomentType};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::IteratorRandom;
use rand::Rng;

use crate::config::MomentConfig;

/// Authored affinity between a moment type and a choice pattern.
/// Pairs not listed are neutral.
pub fn affinity(moment_type: MomentType, pattern: ChoicePattern) -> f32 {
    use ChoicePattern as P;
    use MomentType as M;

    match (moment_type, pattern) {
        (M::Personal, P::Story) => 1.5,
        (M::Historical, P::Story) => 1.4,
        (M::Cultural, P::Story) => 1.3,
        (M::Architectural, P::Efficiency) => 1.4,
        (M::Ephemeral, P::Efficiency) => 0.6,
        (M::Community, P::Autonomy) => 1.4,
        (M::Natural, P::Autonomy) => 1.3,
        (M::Architectural, P::Control) => 1.3,
        (M::Sensory, P::Control) => 0.7,
        (M::Community, P::Control) => 0.6,
        _ => 1.0,
    }
}

impl MomentConfig {
    /// Chance that settling a moment of this fragility destroys it.
    pub fn destruction_probability(&self, fragility: u8) -> f32 {
        if fragility >= self.high_fragility {
            self.high_destruction
        } else if fragility >= self.moderate_fragility {
            self.moderate_destruction
        } else {
            self.low_destruction
        }
    }

    /// Affinity with configured overrides applied.
    pub fn affinity(&self, moment_type: MomentType, pattern: ChoicePattern) -> f32 {
        let key = format!("{}.{}", moment_type.as_str(), pattern);
        self.affinity_overrides
            .get(&key)
            .copied()
            .unwrap_or_else(|| affinity(moment_type, pattern))
    }

    /// Draw weight for a moment type. Without a dominant pattern every type
    /// weighs the base weight.
    pub fn selection_weight(&self, moment_type: MomentType, pattern: Option<ChoicePattern>) -> f32 {
        let affinity = pattern.map_or(1.0, |p| self.affinity(moment_type, p));
        (self.base_weight * affinity).max(0.0)
    }
}

/// How a revealed moment settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MomentOutcome {
    Destroyed(String),
    Preserved(String),
}

impl MomentOutcome {
    pub fn text(&self) -> &str {
        match self {
            MomentOutcome::Destroyed(text) | MomentOutcome::Preserved(text) => text,
        }
    }
}

/// All moments of a session.
#[derive(Debug, Clone, Default)]
pub struct MomentDeck {
    moments: Vec<CityMoment>,
    settled: BTreeSet<String>,
    config: MomentConfig,
}

impl MomentDeck {
    pub fn new(moments: impl IntoIterator<Item = CityMoment>, config: MomentConfig) -> Self {
        Self {
            moments: moments.into_iter().collect(),
            settled: BTreeSet::new(),
            config,
        }
    }

    pub fn from_library(library: &MomentLibrary, config: MomentConfig) -> Self {
        Self::new(library.moments.iter().cloned().map(CityMoment::from), config)
    }

    /// Rebuilds every moment's session flags from a restored game state.
    /// Reveal times are not saved, so they are cleared.
    pub fn sync_with(&mut self, state: &GameState) {
        self.settled.clear();
        for moment in &mut self.moments {
            moment.revealed = state.revealed_moments.contains(&moment.id);
            moment.destroyed = state.destroyed_moments.contains(&moment.id);
            moment.remembered = state.remembered_moments.contains(&moment.id);
            moment.revealed_at = None;
            if state.is_settled(&moment.id) {
                self.settled.insert(moment.id.clone());
            }
        }
    }

    pub fn config(&self) -> &MomentConfig {
        &self.config
    }

    pub fn get(&self, id: &str) -> Option<&CityMoment> {
        self.moments.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut CityMoment> {
        self.moments.iter_mut().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.moments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityMoment> {
        self.moments.iter()
    }

    pub fn is_settled(&self, id: &str) -> bool {
        self.settled.contains(id)
    }

    /// Picks an unrevealed moment available in the current act.
    pub fn draw(&self, state: &GameState, rng: &mut impl Rng) -> Option<String> {
        let pattern = state.dominant_pattern();
        let candidates: Vec<&CityMoment> = self
            .moments
            .iter()
            .filter(|m| !m.revealed && !m.destroyed && m.associated_act <= state.act)
            .collect();

        let weights: Vec<f32> = candidates
            .iter()
            .map(|m| self.config.selection_weight(m.moment_type, pattern))
            .collect();

        // All-zero weights leave nothing to draw.
        let index = WeightedIndex::new(&weights).ok()?;
        Some(candidates[index.sample(rng)].id.clone())
    }

    /// Marks a moment revealed and returns its first-mention text.
    pub fn reveal(
        &mut self,
        id: &str,
        state: &mut GameState,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let moment = self.get_mut(id)?;
        moment.revealed = true;
        moment.revealed_at = Some(now);
        let text = moment.first_mention.clone();
        state.mark_revealed(id);
        Some(text)
    }

    /// A revealed moment that has not yet been settled.
    pub fn pending(&self, rng: &mut impl Rng) -> Option<String> {
        self.moments
            .iter()
            .filter(|m| m.revealed && !self.settled.contains(&m.id))
            .choose(rng)
            .map(|m| m.id.clone())
    }

    /// Rolls fragility for a revealed moment. Each moment settles once.
    pub fn resolve(
        &mut self,
        id: &str,
        state: &mut GameState,
        rng: &mut impl Rng,
    ) -> Option<MomentOutcome> {
        if self.settled.contains(id) {
            return None;
        }
        let probability = self
            .get(id)
            .filter(|m| m.revealed)
            .map(|m| self.config.destruction_probability(m.fragility()))?;

        let destroyed = rng.gen::<f32>() < probability;
        let moment = self.get_mut(id)?;
        let outcome = if destroyed {
            moment.destroyed = true;
            state.mark_destroyed(id);
            MomentOutcome::Destroyed(moment.if_destroyed.clone())
        } else {
            state.mark_preserved(id);
            MomentOutcome::Preserved(moment.if_preserved.clone())
        };
        self.settled.insert(id.to_string());
        Some(outcome)
    }

    /// Flags a moment remembered and returns its remembered text.
    pub fn remember(&mut self, id: &str, state: &mut GameState) -> Option<String> {
        let moment = self.get_mut(id)?;
        moment.remembered = true;
        let text = moment.if_remembered.clone();
        state.mark_remembered(id);
        Some(text)
    }
}
