//! Resource Model
//!
//! Bounded city attributes. Every write goes through [`clamp_unit`], so no
//! caller can push a resource outside `[0, 1]`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Clamps a value into `[0, 1]`. NaN collapses to `0.0`.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Clamps a value into `[-1, 1]`. NaN collapses to `0.0`.
pub fn clamp_signed(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

/// Decodes a number clamped into `[0, 1]`.
pub fn deserialize_unit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    f32::deserialize(deserializer).map(clamp_unit)
}

/// Decodes a number clamped into `[-1, 1]`.
pub fn deserialize_signed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    f32::deserialize(deserializer).map(clamp_signed)
}

/// Decodes an optional number clamped into `[0, 1]`.
pub fn deserialize_unit_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f32>, D::Error> {
    Option::<f32>::deserialize(deserializer).map(|v| v.map(clamp_unit))
}

/// The five resources a city carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Coherence,
    Memory,
    Trust,
    Autonomy,
    Complexity,
}

impl ResourceKind {
    /// Value reported when the resource has never been written.
    pub fn default_value(self) -> f32 {
        match self {
            ResourceKind::Coherence => 1.0,
            ResourceKind::Trust => 0.5,
            ResourceKind::Memory | ResourceKind::Autonomy | ResourceKind::Complexity => 0.0,
        }
    }

    /// Returns all resource kinds.
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Coherence,
            ResourceKind::Memory,
            ResourceKind::Trust,
            ResourceKind::Autonomy,
            ResourceKind::Complexity,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Coherence => "coherence",
            ResourceKind::Memory => "memory",
            ResourceKind::Trust => "trust",
            ResourceKind::Autonomy => "autonomy",
            ResourceKind::Complexity => "complexity",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource map for a city.
///
/// Stored sparsely; a missing key reads as [`ResourceKind::default_value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Resources {
    values: BTreeMap<ResourceKind, f32>,
}

impl<'de> Deserialize<'de> for Resources {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<ResourceKind, f32>::deserialize(deserializer)?;
        let mut resources = Resources::default();
        for (kind, value) in raw {
            resources.set(kind, value);
        }
        Ok(resources)
    }
}

impl Resources {
    /// Creates a resource map with every key at its default.
    pub fn new() -> Self {
        let mut resources = Self::default();
        for kind in ResourceKind::all() {
            resources.set(*kind, kind.default_value());
        }
        resources
    }

    /// Reads a resource, falling back to its documented default.
    pub fn get(&self, kind: ResourceKind) -> f32 {
        self.values
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_value())
    }

    /// Sets a resource, clamped into `[0, 1]`.
    pub fn set(&mut self, kind: ResourceKind, value: f32) -> f32 {
        let clamped = clamp_unit(value);
        self.values.insert(kind, clamped);
        clamped
    }

    /// Adds `delta` to a resource and clamps. Returns the new value.
    pub fn adjust(&mut self, kind: ResourceKind, delta: f32) -> f32 {
        let current = self.get(kind);
        self.set(kind, current + delta)
    }

    pub fn coherence(&self) -> f32 {
        self.get(ResourceKind::Coherence)
    }

    pub fn memory(&self) -> f32 {
        self.get(ResourceKind::Memory)
    }

    pub fn trust(&self) -> f32 {
        self.get(ResourceKind::Trust)
    }

    pub fn autonomy(&self) -> f32 {
        self.get(ResourceKind::Autonomy)
    }

    pub fn complexity(&self) -> f32 {
        self.get(ResourceKind::Complexity)
    }

    /// Iterates over every resource with its effective value.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f32)> + '_ {
        ResourceKind::all().iter().map(move |k| (*k, self.get(*k)))
    }
}
