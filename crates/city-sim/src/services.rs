//! Platform services injected into the engine.
//!
//! The engine never reads the wall clock or talks to the host directly; it
//! goes through a [`Clock`] and a [`Notifier`] so hosts and tests can swap
//! them out.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use city_model::Mood;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Something the host may want to surface to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CityNotification {
    MoodChanged {
        city_id: String,
        from: Mood,
        to: Mood,
    },
    RequestAsked {
        city_id: String,
        request_id: String,
        text: String,
    },
    StoryBeat {
        city_id: String,
        beat_id: String,
        name: String,
    },
    Emergence {
        city_id: String,
        name: String,
    },
    MomentRevealed {
        city_id: String,
        moment_id: String,
        text: String,
    },
    RunFinished {
        city_id: String,
        conclusion: String,
    },
}

/// Receives notifications as the engine produces them.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &CityNotification);
}

/// Logs notifications through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &CityNotification) {
        match notification {
            CityNotification::MoodChanged { city_id, from, to } => {
                info!("City {} mood: {} -> {}", city_id, from, to)
            }
            CityNotification::RequestAsked { city_id, text, .. } => {
                info!("City {} asks: {}", city_id, text)
            }
            CityNotification::StoryBeat { city_id, name, .. } => {
                info!("City {} story beat: {}", city_id, name)
            }
            CityNotification::Emergence { city_id, name } => {
                info!("City {} emergence: {}", city_id, name)
            }
            CityNotification::MomentRevealed { city_id, moment_id, .. } => {
                info!("City {} revealed moment {}", city_id, moment_id)
            }
            CityNotification::RunFinished { city_id, conclusion } => {
                info!("City {} finished: {}", city_id, conclusion)
            }
        }
    }
}

/// Keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<CityNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<CityNotification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &CityNotification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
    }
}
