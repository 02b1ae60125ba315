//! Alias documents.

use crate::coordinate::{Coordinate, PackageType};
use crate::manifest::Author;
use serde::{Deserialize, Serialize};

/// A mutable pointer from an alias key to a published version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub org: String,
    #[serde(rename = "type")]
    pub kind: PackageType,
    pub alias: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    /// Epoch milliseconds of the last create or update.
    pub updated: i64,
}

impl Alias {
    pub fn new(
        org: &str,
        coord: &Coordinate,
        alias: &str,
        version: &str,
        author: Option<Author>,
        updated: i64,
    ) -> Self {
        Self {
            name: coord.full_name(),
            org: org.to_string(),
            kind: coord.kind(),
            alias: alias.to_string(),
            version: version.to_string(),
            author,
            updated,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| crate::Error::Serialization(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(json).map_err(|e| crate::Error::Serialization(e.to_string()))
    }
}
