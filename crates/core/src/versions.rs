//! The per-package versions index.

use crate::coordinate::{Coordinate, PackageType};
use crate::integrity::Integrity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Summary of one published version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub integrity: Integrity,
    pub version: String,
}

/// Versions index for a package family.
///
/// Serialized as `[[major, {integrity, version}], ...]`, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionsDocument {
    pub name: String,
    pub org: String,
    #[serde(rename = "type")]
    pub kind: PackageType,
    versions: Vec<(u64, VersionSummary)>,
}

/// Major component of a version string.
///
/// Uses SemVer when the string parses, otherwise the leading digits, otherwise 0.
pub fn major_of(version: &str) -> u64 {
    if let Ok(parsed) = semver::Version::parse(version) {
        return parsed.major;
    }
    let digits: String = version.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Newest-first ordering for versions sharing a major.
fn newest_first(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    }
}

impl VersionsDocument {
    /// Empty index for a coordinate.
    pub fn new(org: &str, coord: &Coordinate) -> Self {
        Self {
            name: coord.full_name(),
            org: org.to_string(),
            kind: coord.kind(),
            versions: Vec::new(),
        }
    }

    /// Insert or replace a version.
    pub fn upsert(&mut self, version: &str, integrity: Integrity) {
        self.versions.retain(|(_, v)| v.version != version);
        self.versions.push((
            major_of(version),
            VersionSummary {
                integrity,
                version: version.to_string(),
            },
        ));
        self.versions
            .sort_by(|(ma, a), (mb, b)| mb.cmp(ma).then_with(|| newest_first(&a.version, &b.version)));
    }

    /// Look up a version.
    pub fn get(&self, version: &str) -> Option<&VersionSummary> {
        self.versions
            .iter()
            .map(|(_, v)| v)
            .find(|v| v.version == version)
    }

    /// Newest published version with the given major.
    pub fn latest_in_major(&self, major: u64) -> Option<&VersionSummary> {
        self.versions
            .iter()
            .find(|(m, _)| *m == major)
            .map(|(_, v)| v)
    }

    /// Iterate `(major, summary)` pairs, newest first.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &VersionSummary)> {
        self.versions.iter().map(|(m, v)| (*m, v))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
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
