//! Error types for suite loading and event delivery.

use std::path::PathBuf;

use iglu_core::LayoutError;

/// Errors raised while assembling test suites.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("invalid suite file {path:?}: {source}")]
    InvalidSuite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate case \"{case}\" in suite {suite}")]
    DuplicateCase { suite: String, case: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A tracked event could not be delivered to the collector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("collector transport error: {0}")]
    Transport(String),

    #[error("collector url is invalid: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for EmitError {
    fn from(err: reqwest::Error) -> Self {
        EmitError::Transport(err.to_string())
    }
}
