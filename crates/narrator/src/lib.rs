//! Narrator: text selection for city consciousness.
//!
//! The narrator decides what a city says. It never mutates a city; callers
//! pass in a [`NarrativeContext`] snapshot and apply the returned lines.
//!
//! # Modules
//!
//! - [`selector`]: Mood and resource-threshold narrative lines, conclusions
//! - [`moments`]: Weighted moment draws and fragility rolls
//! - [`dialogue`]: Speaker dialogue lookup
//! - [`templates`]: TOML narrative templates
//! - [`config`]: Selection and moment tuning

pub mod config;
pub mod dialogue;
pub mod moments;
pub mod selector;
pub mod templates;

pub use config::{ConfigError, MomentConfig, NarratorConfig, SelectionConfig};
pub use dialogue::DialogueLibrary;
pub use moments::{affinity, MomentDeck, MomentOutcome};
pub use selector::{NarrativeContext, NarrativeLine, NarrativeSelector};
pub use templates::{default_templates, fill, NarrativeTemplates, TemplateVars};
