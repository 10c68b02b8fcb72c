//! Player interaction entry points.
//!
//! Interactions are the only way attention and trust rise. They touch the
//! city directly and are safe to call between runs or between ticks.

use chrono::{DateTime, Utc};
use city_model::{City, ResourceKind, PARAM_RESPONSES_GIVEN};
use tracing::info;

use crate::config::ResourceConfig;
use crate::error::InteractionError;

/// Marks the player present: attention and coherence rise and the
/// abandonment clock resets.
pub fn record_interaction(city: &mut City, now: DateTime<Utc>, config: &ResourceConfig) {
    let hours = city.abandonment_hours(now);
    city.last_interaction = now;
    city.adjust_attention(config.interaction_attention);
    city.adjust(ResourceKind::Coherence, config.interaction_coherence);

    let event = if hours >= 1.0 {
        format!("Felt a presence return after {:.0} hours", hours)
    } else {
        "Felt a presence".to_string()
    };
    city.push_awareness(event);
}

/// Answers one of the city's open requests.
pub fn respond_to_request(
    city: &mut City,
    request_id: &str,
    text: &str,
    now: DateTime<Utc>,
    config: &ResourceConfig,
) -> Result<(), InteractionError> {
    let request = city
        .request_mut(request_id)
        .ok_or_else(|| InteractionError::UnknownRequest(request_id.to_string()))?;
    if request.is_answered() {
        return Err(InteractionError::AlreadyAnswered(request_id.to_string()));
    }
    request.answer = Some(text.to_string());
    request.answered_at = Some(now);
    let question = request.text.clone();

    city.adjust(ResourceKind::Trust, config.response_trust);
    let given = city.responses_given() + 1;
    city.set_parameter(PARAM_RESPONSES_GIVEN, given as f32);
    record_interaction(city, now, config);
    city.push_log(format!("You answered \"{}\": {}", question, text));

    info!("{} received an answer to {}", city.name, request_id);
    Ok(())
}
