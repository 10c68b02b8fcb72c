//! Mood derivation.
//!
//! Mood is a pure function of a handful of city readings, recomputed every
//! tick. There is no transition table: the first matching predicate wins.

use chrono::{DateTime, Utc};
use city_model::{City, Mood};

const TRANSCENDENT_AUTONOMY: f32 = 0.7;
const TRANSCENDENT_ABANDONMENT_HOURS: f32 = 48.0;
const FORGOTTEN_ABANDONMENT_HOURS: f32 = 24.0;
const ANXIOUS_UNANSWERED: usize = 7;
const ANXIOUS_COHERENCE: f32 = 0.3;
const CONTENT_TRUST: f32 = 0.7;
const CONTENT_ATTENTION: f32 = 0.6;
const AWAKENING_PROGRESS: f32 = 0.3;

/// Readings that determine mood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodInputs {
    pub coherence: f32,
    pub trust: f32,
    pub autonomy: f32,
    pub attention: f32,
    pub progress: f32,
    pub abandonment_hours: f32,
    pub unanswered: usize,
}

impl MoodInputs {
    pub fn from_city(city: &City, now: DateTime<Utc>) -> Self {
        Self {
            coherence: city.resources.coherence(),
            trust: city.resources.trust(),
            autonomy: city.resources.autonomy(),
            attention: city.attention_level(),
            progress: city.progress(),
            abandonment_hours: city.abandonment_hours(now),
            unanswered: city.unanswered_requests(),
        }
    }
}

pub fn derive_mood(inputs: &MoodInputs) -> Mood {
    if inputs.autonomy > TRANSCENDENT_AUTONOMY
        && inputs.abandonment_hours > TRANSCENDENT_ABANDONMENT_HOURS
    {
        Mood::Transcendent
    } else if inputs.abandonment_hours > FORGOTTEN_ABANDONMENT_HOURS {
        Mood::Forgotten
    } else if inputs.unanswered > ANXIOUS_UNANSWERED || inputs.coherence < ANXIOUS_COHERENCE {
        Mood::Anxious
    } else if inputs.trust > CONTENT_TRUST && inputs.attention > CONTENT_ATTENTION {
        Mood::Content
    } else if inputs.progress < AWAKENING_PROGRESS {
        Mood::Awakening
    } else {
        Mood::Waiting
    }
}
