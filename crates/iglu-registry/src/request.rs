//! Request bodies for the promotion pipeline.
//!
//! Schemas move strictly VALIDATED -> DEV -> PROD. A publish request names
//! its target and the source is always the stage directly before it.

use iglu_core::SchemaIdentifier;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;

/// Registry environments, in promotion order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
    Validated,
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Validated => "VALIDATED",
            Environment::Dev => "DEV",
            Environment::Prod => "PROD",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environments a publish may target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeployTarget {
    Dev,
    Prod,
}

impl DeployTarget {
    pub fn environment(&self) -> Environment {
        match self {
            DeployTarget::Dev => Environment::Dev,
            DeployTarget::Prod => Environment::Prod,
        }
    }

    /// The environment a promotion to this target starts from.
    pub fn source(&self) -> Environment {
        match self {
            DeployTarget::Dev => Environment::Validated,
            DeployTarget::Prod => Environment::Dev,
        }
    }
}

impl fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.environment().as_str())
    }
}

/// Error for target strings outside `DEV`/`PROD`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid target '{0}', expected DEV or PROD")]
pub struct InvalidTarget(pub String);

impl FromStr for DeployTarget {
    type Err = InvalidTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEV" => Ok(DeployTarget::Dev),
            "PROD" => Ok(DeployTarget::Prod),
            other => Err(InvalidTarget(other.to_string())),
        }
    }
}

/// Body of `POST .../deployment-requests`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishRequest {
    pub message: String,
    pub source: Environment,
    pub target: DeployTarget,
    pub vendor: String,
    pub name: String,
    pub format: String,
    pub version: String,
}

impl PublishRequest {
    pub fn new(id: &SchemaIdentifier, target: DeployTarget) -> Self {
        PublishRequest {
            message: String::new(),
            source: target.source(),
            target,
            vendor: id.vendor.clone(),
            name: id.name.clone(),
            format: id.format.clone(),
            version: id.version.clone(),
        }
    }
}

/// Body of `POST .../validation-requests`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationRequest {
    pub meta: Value,
    pub data: Value,
}

impl ValidationRequest {
    /// Wrap an already parsed schema document.
    pub fn new(id: &SchemaIdentifier, data: Value) -> Self {
        ValidationRequest {
            meta: json!({
                "hidden": false,
                "schemaType": id.schema_type,
                "customData": {},
            }),
            data,
        }
    }

    /// Read and parse the schema document at `id.path`.
    pub fn from_schema(id: &SchemaIdentifier) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(&id.path)?;
        let data: Value = serde_json::from_str(&content)?;
        Ok(Self::new(id, data))
    }
}
