//! Content errors.

use thiserror::Error;

/// Errors raised while decoding or validating declarative content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {document}: {source}")]
    Json {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid content in {document}: {reason}")]
    Invalid { document: String, reason: String },
}

impl ContentError {
    pub fn invalid(document: impl Into<String>, reason: impl Into<String>) -> Self {
        ContentError::Invalid {
            document: document.into(),
            reason: reason.into(),
        }
    }
}
