//! Mood-driven narrative selection.
//!
//! Each narrative tick the selector picks one mood line (one uniform draw
//! decides between same-mood candidates) and then appends any resource events
//! whose thresholds are crossed. Waiting and awakening cities may also ask the
//! player a question.

use chrono::{DateTime, Utc};
use city_model::{City, Mood};
use rand::Rng;

use crate::config::SelectionConfig;
use crate::templates::{
    conclusion_keys, default_templates, fill, resource_keys, NarrativeTemplates, TemplateVars,
};

/// Conclusion thresholds. A run ends on the first branch that matches.
const CONCLUDE_AUTONOMY: f32 = 0.7;
const CONCLUDE_TRUST: f32 = 0.7;
const CONCLUDE_FRAYING_COHERENCE: f32 = 0.3;

/// Unanswered count above which an anxious city dwells on its questions.
const ANXIOUS_UNANSWERED: usize = 7;
/// Coherence below which an anxious city loses its map.
const ANXIOUS_COHERENCE: f32 = 0.3;

/// Everything the selector reads from a city, captured at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeContext {
    pub city_name: String,
    pub mood: Mood,
    pub coherence: f32,
    pub trust: f32,
    pub autonomy: f32,
    pub attention: f32,
    pub progress: f32,
    pub abandonment_hours: f32,
    pub unanswered: usize,
    pub growth_rate: f32,
}

impl NarrativeContext {
    pub fn from_city(city: &City, now: DateTime<Utc>) -> Self {
        Self {
            city_name: city.name.clone(),
            mood: city.mood,
            coherence: city.resources.coherence(),
            trust: city.resources.trust(),
            autonomy: city.resources.autonomy(),
            attention: city.attention_level(),
            progress: city.progress(),
            abandonment_hours: city.abandonment_hours(now),
            unanswered: city.unanswered_requests(),
            growth_rate: city.growth_rate(),
        }
    }

    fn vars(&self) -> TemplateVars<'_> {
        TemplateVars {
            city: &self.city_name,
            hours: self.abandonment_hours,
            unanswered: self.unanswered,
        }
    }
}

/// One piece of selector output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeLine {
    /// Appended to the city log
    Log(String),
    /// A question for the player
    Request(String),
}

impl NarrativeLine {
    pub fn text(&self) -> &str {
        match self {
            NarrativeLine::Log(text) | NarrativeLine::Request(text) => text,
        }
    }
}

/// Picks narrative lines for a city's current state.
#[derive(Debug, Clone)]
pub struct NarrativeSelector {
    templates: NarrativeTemplates,
    config: SelectionConfig,
}

impl NarrativeSelector {
    pub fn new(templates: NarrativeTemplates, config: SelectionConfig) -> Self {
        Self { templates, config }
    }

    /// Selector over the bundled templates.
    pub fn with_defaults() -> Self {
        Self::new(default_templates(), SelectionConfig::default())
    }

    pub fn templates(&self) -> &NarrativeTemplates {
        &self.templates
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Template key for the mood line, given one uniform draw `roll` in [0, 1).
    pub fn mood_key(&self, ctx: &NarrativeContext, roll: f32) -> &'static str {
        match ctx.mood {
            Mood::Awakening => {
                if ctx.progress < self.config.first_stirrings_below {
                    "awakening.first_stirrings"
                } else if roll < 0.5 {
                    "awakening.learning"
                } else {
                    "awakening.listening"
                }
            }
            Mood::Waiting => {
                if ctx.unanswered > self.config.repeat_questions_above {
                    "waiting.repeating"
                } else {
                    "waiting.idle"
                }
            }
            Mood::Anxious => {
                if ctx.unanswered > ANXIOUS_UNANSWERED {
                    "anxious.unanswered"
                } else if ctx.coherence < ANXIOUS_COHERENCE {
                    "anxious.incoherent"
                } else {
                    "anxious.restless"
                }
            }
            Mood::Content => "content.calm",
            Mood::Forgotten => {
                if ctx.abandonment_hours > self.config.overgrown_after_hours {
                    "forgotten.overgrown"
                } else {
                    "forgotten.lonely"
                }
            }
            Mood::Transcendent => "transcendent.dreaming",
        }
    }

    /// Resource-event keys whose thresholds are crossed, in a fixed order.
    pub fn resource_keys(&self, ctx: &NarrativeContext) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if ctx.coherence < self.config.low_coherence {
            keys.push(resource_keys::LOW_COHERENCE);
        }
        if ctx.trust > self.config.high_trust {
            keys.push(resource_keys::HIGH_TRUST);
        } else if ctx.trust < self.config.low_trust {
            keys.push(resource_keys::LOW_TRUST);
        }
        if ctx.growth_rate > self.config.growth_rate_threshold {
            keys.push(resource_keys::RAPID_GROWTH);
        }
        keys
    }

    /// Lines for one narrative tick: a mood line, resource events, and
    /// possibly a request.
    pub fn evolve(&self, ctx: &NarrativeContext, rng: &mut impl Rng) -> Vec<NarrativeLine> {
        let vars = ctx.vars();
        let roll: f32 = rng.gen();
        let mut lines = Vec::new();

        let key = self.mood_key(ctx, roll);
        match self.templates.mood_line(key, rng) {
            Some(template) => lines.push(NarrativeLine::Log(fill(template, &vars))),
            None => tracing::debug!("No narrative template for {}", key),
        }

        for key in self.resource_keys(ctx) {
            if let Some(template) = self.templates.resource_line(key, rng) {
                lines.push(NarrativeLine::Log(fill(template, &vars)));
            }
        }

        let asks = matches!(ctx.mood, Mood::Waiting | Mood::Awakening);
        if asks && roll < self.config.request_chance {
            if let Some(question) = self.templates.request(rng) {
                lines.push(NarrativeLine::Request(fill(question, &vars)));
            }
        }

        lines
    }

    /// Conclusion key for a finished run.
    pub fn conclusion_key(ctx: &NarrativeContext) -> &'static str {
        if ctx.autonomy > CONCLUDE_AUTONOMY {
            conclusion_keys::AUTONOMOUS
        } else if ctx.trust > CONCLUDE_TRUST {
            conclusion_keys::TRUSTING
        } else if ctx.coherence < CONCLUDE_FRAYING_COHERENCE {
            conclusion_keys::FRAYING
        } else {
            conclusion_keys::UNCERTAIN
        }
    }

    /// The single concluding line for a finished run.
    pub fn conclude(&self, ctx: &NarrativeContext) -> String {
        let key = Self::conclusion_key(ctx);
        match self.templates.conclusion(key) {
            Some(template) => fill(template, &ctx.vars()),
            None => format!("{} falls quiet.", ctx.city_name),
        }
    }
}

impl Default for NarrativeSelector {
    fn default() -> Self {
        Self::with_defaults()
    }
}
