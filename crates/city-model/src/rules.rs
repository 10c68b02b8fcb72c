//! Relationship Rules
//!
//! Hand-authored compatibility table between thread categories. Lookups are
//! order-independent and always succeed: pairs without an authored entry get
//! the moderate-support fallback.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::thread::{RelationKind, ThreadCategory};

/// Strength used for pairs missing from the table.
pub const FALLBACK_STRENGTH: f32 = 0.4;
/// Synergy used for pairs missing from the table.
pub const FALLBACK_SYNERGY: f32 = 0.2;

/// Unordered pair of thread categories, normalized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadPair {
    first: ThreadCategory,
    second: ThreadCategory,
}

impl ThreadPair {
    pub fn new(a: ThreadCategory, b: ThreadCategory) -> Self {
        if a.as_str() <= b.as_str() {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> ThreadCategory {
        self.first
    }

    pub fn second(&self) -> ThreadCategory {
        self.second
    }

    pub fn is_same_type(&self) -> bool {
        self.first == self.second
    }

    pub fn contains(&self, category: ThreadCategory) -> bool {
        self.first == category || self.second == category
    }
}

/// Template a new relationship is created from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTemplate {
    pub kind: RelationKind,
    pub strength: f32,
    pub synergy: f32,
    pub description: String,
}

impl RelationshipTemplate {
    /// The fallback used when a pair has no authored entry.
    pub fn moderate_support() -> Self {
        Self {
            kind: RelationKind::Support,
            strength: FALLBACK_STRENGTH,
            synergy: FALLBACK_SYNERGY,
            description: "The two threads lean on each other in ordinary ways.".to_string(),
        }
    }
}

use RelationKind::*;
use ThreadCategory::*;

const AUTHORED: &[(ThreadCategory, ThreadCategory, RelationKind, f32, f32, &str)] = &[
    (Transit, Housing, Dependency, 0.7, 0.5, "People need a way home, and homes need to be reachable."),
    (Transit, Commerce, Support, 0.8, 0.6, "Every route is a market route."),
    (Transit, Parks, Tension, 0.5, -0.3, "Roads cut through green space."),
    (Transit, Power, Dependency, 0.6, 0.3, "The trains run on borrowed lightning."),
    (Transit, Culture, Harmony, 0.5, 0.4, "Crowds move toward the music."),
    (Housing, Parks, Harmony, 0.6, 0.5, "Windows that open onto trees."),
    (Housing, Water, Dependency, 0.8, 0.4, "No home without a tap."),
    (Housing, Sewage, Dependency, 0.7, 0.2, "What the home releases, the pipes must carry."),
    (Housing, Commerce, Tension, 0.5, -0.2, "Rent and shopfronts fight for the same street."),
    (Culture, Knowledge, Resonance, 0.8, 0.7, "Stories and libraries remember each other."),
    (Culture, Commerce, Tension, 0.4, -0.1, "Art priced by the square metre."),
    (Culture, Parks, Harmony, 0.6, 0.5, "Festivals spill onto the lawns."),
    (Commerce, Power, Dependency, 0.7, 0.3, "Every till is plugged into the grid."),
    (Commerce, Knowledge, Support, 0.5, 0.4, "Ledgers become archives."),
    (Parks, Water, Harmony, 0.7, 0.6, "Fountains and ponds share a pulse."),
    (Parks, Sewage, Tension, 0.4, -0.4, "Runoff where the children play."),
    (Water, Sewage, Resonance, 0.9, 0.5, "The same water, before and after."),
    (Water, Power, Tension, 0.6, -0.2, "Turbines and reservoirs argue over every litre."),
    (Power, Knowledge, Support, 0.6, 0.5, "Servers hum through the night."),
    (Knowledge, Housing, Support, 0.4, 0.3, "Bookshelves in every flat."),
];

/// Static compatibility table between thread categories.
#[derive(Debug, Clone)]
pub struct RelationshipRules {
    table: HashMap<ThreadPair, RelationshipTemplate>,
}

impl RelationshipRules {
    /// Builds the hand-authored standard table.
    pub fn standard() -> Self {
        let table = AUTHORED
            .iter()
            .map(|(a, b, kind, strength, synergy, description)| {
                (
                    ThreadPair::new(*a, *b),
                    RelationshipTemplate {
                        kind: *kind,
                        strength: *strength,
                        synergy: *synergy,
                        description: (*description).to_string(),
                    },
                )
            })
            .collect();
        Self { table }
    }

    /// Looks up the template for two categories, in either order.
    pub fn relationship(&self, a: ThreadCategory, b: ThreadCategory) -> RelationshipTemplate {
        self.table
            .get(&ThreadPair::new(a, b))
            .cloned()
            .unwrap_or_else(RelationshipTemplate::moderate_support)
    }

    /// Returns true if the pair has an authored entry.
    pub fn is_authored(&self, a: ThreadCategory, b: ThreadCategory) -> bool {
        self.table.contains_key(&ThreadPair::new(a, b))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for RelationshipRules {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::RelationKind::{Resonance, Support};
    use crate::thread::ThreadCategory::{Commerce, Knowledge, Parks, Sewage, Water};

    #[test]
    fn test_thread_pair_symmetry() {
        for a in ThreadCategory::all() {
            for b in ThreadCategory::all() {
                assert_eq!(ThreadPair::new(*a, *b), ThreadPair::new(*b, *a));
            }
        }
    }

    #[test]
    fn test_thread_pair_normalizes_by_name() {
        let pair = ThreadPair::new(Water, Commerce);
        assert_eq!(pair.first(), Commerce);
        assert_eq!(pair.second(), Water);
        assert!(!pair.is_same_type());
        assert!(ThreadPair::new(Parks, Parks).is_same_type());
    }

    #[test]
    fn test_lookup_is_order_independent() {
        let rules = RelationshipRules::standard();

        for a in ThreadCategory::all() {
            for b in ThreadCategory::all() {
                assert_eq!(rules.relationship(*a, *b), rules.relationship(*b, *a));
            }
        }
    }

    #[test]
    fn test_authored_entry() {
        let rules = RelationshipRules::standard();
        let template = rules.relationship(Sewage, Water);

        assert_eq!(template.kind, Resonance);
        assert_eq!(template.strength, 0.9);
        assert!(rules.is_authored(Water, Sewage));
    }

    #[test]
    fn test_missing_pair_falls_back_to_moderate_support() {
        let rules = RelationshipRules::standard();
        assert!(!rules.is_authored(Sewage, Knowledge));

        let template = rules.relationship(Sewage, Knowledge);
        assert_eq!(template.kind, Support);
        assert_eq!(template.strength, FALLBACK_STRENGTH);
        assert_eq!(template.synergy, FALLBACK_SYNERGY);
    }

    #[test]
    fn test_authored_values_in_range() {
        for (_, _, _, strength, synergy, _) in AUTHORED {
            assert!((0.0..=1.0).contains(strength));
            assert!((-1.0..=1.0).contains(synergy));
        }
        assert_eq!(RelationshipRules::standard().len(), AUTHORED.len());
    }
}
