//! Content-addressed data-structure keys.

use iglu_core::SchemaIdentifier;
use sha2::{Digest, Sha256};
use std::fmt;

/// Registry lookup key for a schema identity.
///
/// The key covers organization, vendor, name and format only, so every
/// version of a schema shares one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaHash(String);

impl SchemaHash {
    /// hex(sha256("{org_id}-{vendor}-{name}-{format}"))
    pub fn compute(org_id: &str, id: &SchemaIdentifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}-{}-{}-{}", org_id, id.vendor, id.name, id.format).as_bytes());
        SchemaHash(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
