//! Schema identity as derived from the iglu directory layout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::LayoutError;

/// Whether a schema describes an event or an entity (context).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Event,
    Entity,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::Event => "event",
            SchemaType::Entity => "entity",
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the schema type from the last dot-separated segment of a vendor.
///
/// Vendors are grouped by type, e.g. `com.example.events` or
/// `com.example.entities`.
pub fn type_of_vendor(vendor: &str) -> Result<SchemaType, LayoutError> {
    let suffix = vendor.rsplit('.').next().unwrap_or(vendor);
    match suffix {
        "entities" | "entity" => Ok(SchemaType::Entity),
        "events" | "event" => Ok(SchemaType::Event),
        other => Err(LayoutError::UnrecognizedType {
            vendor: vendor.to_string(),
            suffix: other.to_string(),
        }),
    }
}

/// The `self` tuple of an iglu schema plus where it was found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaIdentifier {
    pub vendor: String,
    pub name: String,
    pub format: String,
    pub version: String,
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub path: PathBuf,
}

impl SchemaIdentifier {
    /// Build an identifier, deriving the type from the vendor suffix.
    pub fn new(
        vendor: impl Into<String>,
        name: impl Into<String>,
        format: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self, LayoutError> {
        let vendor = vendor.into();
        let schema_type = type_of_vendor(&vendor)?;
        Ok(Self {
            vendor,
            name: name.into(),
            format: format.into(),
            version: version.into(),
            schema_type,
            path: path.into(),
        })
    }

    /// `vendor/name/format/version`
    pub fn to_iglu_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.vendor, self.name, self.format, self.version
        )
    }

    /// `iglu:vendor/name/format/version`
    pub fn to_iglu_uri(&self) -> String {
        format!("iglu:{}", self.to_iglu_path())
    }
}

impl fmt::Display for SchemaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iglu_path())
    }
}
