//! Static cross-checks between a schema document and its directory location.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::identifier::SchemaIdentifier;

/// A single failed cross-check. Failures are reported individually and never
/// stop the remaining checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    /// The schema document could not be read or parsed.
    Unreadable { reason: String },
    /// A field of the embedded `self` block disagrees with the directory.
    SelfMismatch {
        field: &'static str,
        expected: String,
        found: Option<String>,
    },
    /// A `required` entry has no matching key in `properties`.
    MissingRequired { property: String },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::Unreadable { reason } => write!(f, "unreadable schema: {reason}"),
            CheckFailure::SelfMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "{field} mismatch between directory layout and self (directory: {expected}, self: {})",
                found.as_deref().unwrap_or("<missing>")
            ),
            CheckFailure::MissingRequired { property } => {
                write!(f, "required property \"{property}\" is not defined!")
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SelfBlock {
    vendor: Option<String>,
    name: Option<String>,
    format: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaDocument {
    #[serde(rename = "self")]
    self_block: Option<SelfBlock>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    required: Option<Vec<String>>,
}

/// Read the schema at `id.path` and run every cross-check against it.
pub fn check_schema(id: &SchemaIdentifier) -> Vec<CheckFailure> {
    let content = match std::fs::read_to_string(&id.path) {
        Ok(c) => c,
        Err(e) => {
            return vec![CheckFailure::Unreadable {
                reason: e.to_string(),
            }]
        }
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(doc) => check_document(id, &doc),
        Err(e) => vec![CheckFailure::Unreadable {
            reason: e.to_string(),
        }],
    }
}

/// Run the cross-checks on an already parsed schema document.
pub fn check_document(id: &SchemaIdentifier, doc: &Value) -> Vec<CheckFailure> {
    let parsed: SchemaDocument = match serde_json::from_value(doc.clone()) {
        Ok(p) => p,
        Err(e) => {
            return vec![CheckFailure::Unreadable {
                reason: e.to_string(),
            }]
        }
    };

    let mut failures = Vec::new();

    let declared = parsed.self_block.unwrap_or_default();
    let pairs = [
        ("vendor", &id.vendor, declared.vendor),
        ("name", &id.name, declared.name),
        ("format", &id.format, declared.format),
        ("version", &id.version, declared.version),
    ];
    for (field, expected, found) in pairs {
        if found.as_deref() != Some(expected.as_str()) {
            failures.push(CheckFailure::SelfMismatch {
                field,
                expected: expected.clone(),
                found,
            });
        }
    }

    let properties = parsed.properties.unwrap_or_default();
    for property in parsed.required.unwrap_or_default() {
        if !properties.contains_key(&property) {
            failures.push(CheckFailure::MissingRequired { property });
        }
    }

    failures
}
