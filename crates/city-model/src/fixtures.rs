//! Sample data fixtures for testing.
//!
//! Enable the `test-fixtures` feature to use these helpers from other crates:
//!
//! ```ignore
//! // [dev-dependencies]
//! // city-model = { workspace = true, features = ["test-fixtures"] }
//!
//! use city_model::fixtures;
//!
//! let city = fixtures::city_with_threads(&[ThreadCategory::Water]);
//! ```

use chrono::{DateTime, Utc};

use crate::{
    City, CityMoment, CityMomentData, ConsciousnessExpansion, EmergenceConditions, EmergenceRule,
    MomentType, RelationshipRules, ThreadCategory,
};

/// A fixed instant so fixtures are reproducible.
pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

/// A fresh city created at [`epoch`].
pub fn sample_city() -> City {
    City::new("Fixture City", epoch()).with_id("city_fixture")
}

/// A fresh city with the given threads woven in order.
pub fn city_with_threads(categories: &[ThreadCategory]) -> City {
    let rules = RelationshipRules::standard();
    let mut city = sample_city();
    for category in categories {
        let id = city.id.clone();
        city.threads.weave(*category, &id, epoch(), &rules);
    }
    city
}

/// A moment of the given type and fragility, available from act 1.
pub fn sample_moment(id: &str, moment_type: MomentType, fragility: i32) -> CityMoment {
    CityMomentData {
        moment_id: id.to_string(),
        text: format!("{id} text"),
        moment_type,
        district: 1,
        fragility,
        associated_act: 1,
        first_mention: format!("{id} first"),
        if_preserved: format!("{id} preserved"),
        if_destroyed: format!("{id} destroyed"),
        if_remembered: format!("{id} remembered"),
        tags: Vec::new(),
        author_notes: None,
    }
    .into()
}

/// A rule requiring only the given categories.
pub fn bare_rule(name: &str, categories: &[ThreadCategory]) -> EmergenceRule {
    EmergenceRule {
        name: name.to_string(),
        conditions: EmergenceConditions::requiring(categories.iter().copied()),
        consciousness_expansion: ConsciousnessExpansion {
            new_perceptions: vec![format!("{name} perception")],
            expanded_self_awareness: format!("{name} awareness"),
            complexity_increase: 0.1,
            affected_thread_types: None,
            deepened_relationships: None,
        },
        story_beat_id: None,
    }
}
