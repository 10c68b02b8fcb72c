//! Emergence rule documents and emergent property records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::thread::ThreadCategory;

/// A relationship-deepening instruction carried by an expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepenedRelationship {
    pub thread_types: [ThreadCategory; 2],
    #[serde(default)]
    pub strength_increase: f32,
    #[serde(default)]
    pub synergy_increase: f32,
}

/// What a city gains when a property emerges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsciousnessExpansion {
    #[serde(default)]
    pub new_perceptions: Vec<String>,
    pub expanded_self_awareness: String,
    #[serde(default)]
    pub complexity_increase: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_thread_types: Option<Vec<ThreadCategory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepened_relationships: Option<Vec<DeepenedRelationship>>,
}

/// Conditions under which a rule fires. `None` fields are vacuous.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergenceConditions {
    pub required_thread_types: Vec<ThreadCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_relationship_strength: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_average_integration: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_thread_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_city_complexity: Option<f32>,
}

impl EmergenceConditions {
    pub fn requiring(types: impl IntoIterator<Item = ThreadCategory>) -> Self {
        Self {
            required_thread_types: types.into_iter().collect(),
            ..Self::default()
        }
    }
}

/// A declarative emergence rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergenceRule {
    pub name: String,
    pub conditions: EmergenceConditions,
    pub consciousness_expansion: ConsciousnessExpansion,
    #[serde(default, rename = "storyBeatID", skip_serializing_if = "Option::is_none")]
    pub story_beat_id: Option<String>,
}

/// Document shape for a set of emergence rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergenceRuleCollection {
    #[serde(default)]
    pub emergent_properties: Vec<EmergenceRule>,
}

/// A property that has emerged in a specific city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergentProperty {
    pub id: String,
    pub name: String,
    pub emerged_at: DateTime<Utc>,
    #[serde(default)]
    pub contributing_thread_ids: Vec<String>,
    pub expansion: ConsciousnessExpansion,
    /// Owning city, by id.
    pub city_id: String,
}

impl EmergentProperty {
    pub fn new(
        rule: &EmergenceRule,
        contributing_thread_ids: Vec<String>,
        city_id: impl Into<String>,
        emerged_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: rule.name.clone(),
            emerged_at,
            contributing_thread_ids,
            expansion: rule.consciousness_expansion.clone(),
            city_id: city_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expansion() -> ConsciousnessExpansion {
        ConsciousnessExpansion {
            new_perceptions: vec!["the rhythm of rush hour".to_string()],
            expanded_self_awareness: "I feel my own pulse in the rails.".to_string(),
            complexity_increase: 0.15,
            affected_thread_types: Some(vec![ThreadCategory::Transit, ThreadCategory::Power]),
            deepened_relationships: Some(vec![DeepenedRelationship {
                thread_types: [ThreadCategory::Transit, ThreadCategory::Power],
                strength_increase: 0.1,
                synergy_increase: 0.05,
            }]),
        }
    }

    #[test]
    fn test_expansion_roundtrip() {
        let original = expansion();
        let json = serde_json::to_string(&original).unwrap();
        let decoded: ConsciousnessExpansion = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_expansion_optional_fields_omitted() {
        let minimal = ConsciousnessExpansion {
            new_perceptions: vec![],
            expanded_self_awareness: "quiet".to_string(),
            complexity_increase: 0.0,
            affected_thread_types: None,
            deepened_relationships: None,
        };
        let json = serde_json::to_string(&minimal).unwrap();
        assert!(!json.contains("affectedThreadTypes"));
        assert_eq!(serde_json::from_str::<ConsciousnessExpansion>(&json).unwrap(), minimal);
    }

    #[test]
    fn test_rule_document_parses() {
        let json = r#"{
            "emergentProperties": [{
                "name": "Circulation",
                "conditions": {
                    "requiredThreadTypes": ["water", "sewage"],
                    "minimumRelationshipStrength": 0.8
                },
                "consciousnessExpansion": {
                    "newPerceptions": ["the cycle of water"],
                    "expandedSelfAwareness": "What leaves me returns.",
                    "complexityIncrease": 0.1
                },
                "storyBeatID": "circulation_beat"
            }]
        }"#;

        let collection: EmergenceRuleCollection = serde_json::from_str(json).unwrap();
        let rule = &collection.emergent_properties[0];
        assert_eq!(rule.name, "Circulation");
        assert_eq!(rule.conditions.required_thread_types.len(), 2);
        assert_eq!(rule.conditions.minimum_relationship_strength, Some(0.8));
        assert_eq!(rule.conditions.minimum_thread_count, None);
        assert_eq!(rule.story_beat_id.as_deref(), Some("circulation_beat"));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let json = r#"{"requiredThreadTypes": ["monorail"]}"#;
        assert!(serde_json::from_str::<EmergenceConditions>(json).is_err());
    }
}
