//! Error types for the simulation crate.

use city_model::ContentError;
use narrator::ConfigError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors from player-facing interaction entry points.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InteractionError {
    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    #[error("Request already answered: {0}")]
    AlreadyAnswered(String),

    #[error("Unknown moment: {0}")]
    UnknownMoment(String),
}

/// Any error the simulation can surface.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Interaction error: {0}")]
    Interaction(#[from] InteractionError),
}
