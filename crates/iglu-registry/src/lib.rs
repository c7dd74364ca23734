//! Iglu Registry: client for the schema registry console.
//!
//! Covers the registry side of the schema workflow:
//! - access-token exchange
//! - content-addressed deployment lookup
//! - validation requests
//! - promotion along VALIDATED -> DEV -> PROD
//!
//! Batch helpers in [`batch`] run these per schema with per-item error
//! isolation.

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod hash;
pub mod reply;
pub mod request;

pub use batch::{
    publish_all, publish_schema, validate_all, validate_schema, PublishOutcome, ValidateOutcome,
};
pub use client::{AccessToken, RegistryClient};
pub use config::{
    RegistryConfig, CONSOLE_URL_ENV, DEFAULT_CONSOLE_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
pub use error::RegistryError;
pub use hash::SchemaHash;
pub use reply::{ItemFailure, RegistryReply, ACCEPTED_STATUSES};
pub use request::{DeployTarget, Environment, InvalidTarget, PublishRequest, ValidationRequest};

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
