//! City Moments
//!
//! Static narrative fragments keyed by id. Library documents are loaded
//! leniently: an entry that does not decode (an unknown `type`, a missing
//! field) is dropped with a warning while the rest of the library loads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ContentError;

/// Lowest fragility a moment can carry.
pub const MIN_FRAGILITY: u8 = 1;
/// Highest fragility a moment can carry.
pub const MAX_FRAGILITY: u8 = 10;

/// Category of a moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentType {
    Personal,
    Architectural,
    Cultural,
    Natural,
    Historical,
    Sensory,
    Community,
    Ephemeral,
}

impl MomentType {
    pub fn all() -> &'static [MomentType] {
        &[
            MomentType::Personal,
            MomentType::Architectural,
            MomentType::Cultural,
            MomentType::Natural,
            MomentType::Historical,
            MomentType::Sensory,
            MomentType::Community,
            MomentType::Ephemeral,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MomentType::Personal => "personal",
            MomentType::Architectural => "architectural",
            MomentType::Cultural => "cultural",
            MomentType::Natural => "natural",
            MomentType::Historical => "historical",
            MomentType::Sensory => "sensory",
            MomentType::Community => "community",
            MomentType::Ephemeral => "ephemeral",
        }
    }
}

/// One entry as written in a library document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityMomentData {
    #[serde(rename = "momentID")]
    pub moment_id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub moment_type: MomentType,
    pub district: i32,
    pub fragility: i32,
    pub associated_act: u32,
    pub first_mention: String,
    pub if_preserved: String,
    pub if_destroyed: String,
    pub if_remembered: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_notes: Option<String>,
}

/// Document shape for a moment library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentLibrary {
    pub moments: Vec<CityMomentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct RawMomentLibrary {
    #[serde(default)]
    moments: Vec<serde_json::Value>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl MomentLibrary {
    /// Parses a library, skipping entries that fail to decode.
    ///
    /// Only a malformed outer document is an error.
    pub fn from_json(document: &str, content: &str) -> Result<Self, ContentError> {
        let raw: RawMomentLibrary =
            serde_json::from_str(content).map_err(|source| ContentError::Json {
                document: document.to_string(),
                source,
            })?;

        let mut moments = Vec::with_capacity(raw.moments.len());
        for (index, value) in raw.moments.into_iter().enumerate() {
            let id = value
                .get("momentID")
                .and_then(|v| v.as_str())
                .unwrap_or("<unnamed>")
                .to_string();
            match serde_json::from_value::<CityMomentData>(value) {
                Ok(moment) => moments.push(moment),
                Err(e) => {
                    tracing::warn!(
                        "Skipping moment {} (entry {}) in {}: {}",
                        id,
                        index,
                        document,
                        e
                    );
                }
            }
        }

        Ok(Self {
            moments,
            version: raw.version,
            description: raw.description,
        })
    }
}

/// A moment with its per-session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityMoment {
    pub id: String,
    pub text: String,
    pub moment_type: MomentType,
    pub district: i32,
    #[serde(deserialize_with = "deserialize_fragility")]
    fragility: u8,
    pub associated_act: u32,
    pub first_mention: String,
    pub if_preserved: String,
    pub if_destroyed: String,
    pub if_remembered: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub remembered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_at: Option<DateTime<Utc>>,
}

impl CityMoment {
    pub fn fragility(&self) -> u8 {
        self.fragility
    }

    /// Text for the moment's current state.
    pub fn current_text(&self) -> &str {
        if self.destroyed {
            &self.if_destroyed
        } else if self.remembered {
            &self.if_remembered
        } else if self.revealed {
            &self.if_preserved
        } else {
            &self.text
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.destroyed || self.remembered
    }
}

fn clamp_fragility(fragility: i32) -> u8 {
    fragility.clamp(MIN_FRAGILITY as i32, MAX_FRAGILITY as i32) as u8
}

fn deserialize_fragility<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    i32::deserialize(deserializer).map(clamp_fragility)
}

impl From<CityMomentData> for CityMoment {
    fn from(data: CityMomentData) -> Self {
        let fragility = clamp_fragility(data.fragility);
        Self {
            id: data.moment_id,
            text: data.text,
            moment_type: data.moment_type,
            district: data.district,
            fragility,
            associated_act: data.associated_act,
            first_mention: data.first_mention,
            if_preserved: data.if_preserved,
            if_destroyed: data.if_destroyed,
            if_remembered: data.if_remembered,
            tags: data.tags,
            revealed: false,
            destroyed: false,
            remembered: false,
            revealed_at: None,
        }
    }
}
