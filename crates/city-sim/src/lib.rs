//! City consciousness simulation engine.
//!
//! A city wakes up, weaves threads of infrastructure into a relationship
//! graph, and drifts through moods as the player attends to it or leaves it
//! alone. This crate owns the tick loop and everything it drives; the data
//! model lives in `city-model` and text selection in `narrator`.

pub mod beats;
pub mod config;
pub mod content;
pub mod emergence;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod mood;
pub mod services;
pub mod store;

pub use beats::{FiredBeat, StoryBeatEngine};
pub use config::{default_config_toml, ResourceConfig, SimConfig, SimulationConfig};
pub use content::ContentLibrary;
pub use emergence::{Emergence, EmergenceEvaluator};
pub use engine::{Evaluation, RunOutcome, SimulationEngine};
pub use error::{InteractionError, SimError};
pub use mood::{derive_mood, MoodInputs};
pub use services::{
    CityNotification, Clock, ManualClock, Notifier, RecordingNotifier, SystemClock,
    TracingNotifier,
};
pub use store::{CityStore, JsonDirStore, MemoryStore, SavedCity, StoreError, SAVE_VERSION};
