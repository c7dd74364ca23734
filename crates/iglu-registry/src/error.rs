//! Error types for the registry client

use thiserror::Error;

/// Errors that can occur talking to the schema registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Token exchange was refused; fatal for the whole run.
    #[error("failed to get access token (status {status})")]
    Auth { status: u16 },

    /// The request never produced a response.
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The existence lookup answered with something other than 200 or 404.
    #[error("schema lookup failed with status {status}: {body}")]
    Lookup { status: u16, body: String },

    /// Schema file could not be read for a validation request.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::Transport(err.to_string())
    }
}

impl RegistryError {
    /// Whether the error must abort the run rather than count against one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RegistryError::Auth { .. })
    }
}
