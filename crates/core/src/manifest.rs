//! Version manifests.

use crate::coordinate::{Coordinate, PackageType};
use crate::integrity::{self, Integrity};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Milliseconds since the Unix epoch for a timestamp.
pub fn epoch_millis(at: OffsetDateTime) -> i64 {
    i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    epoch_millis(OffsetDateTime::now_utc())
}

/// The identity that published a version or changed an alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub user: String,
}

/// One file inside a published version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path inside the package, always starting with `/`.
    pub pathname: String,
    pub mime_type: String,
    pub size: u64,
    pub integrity: Integrity,
}

/// The immutable document describing one published version.
///
/// Files are kept sorted by pathname.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub org: String,
    #[serde(rename = "type")]
    pub kind: PackageType,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    /// Epoch milliseconds.
    pub created: i64,
    pub files: Vec<FileEntry>,
    pub integrity: Integrity,
    /// Storage prefix of this file set, derived from `integrity`.
    pub revision: String,
    #[serde(default)]
    pub meta: Vec<serde_json::Value>,
}

impl Manifest {
    /// Build a manifest for a set of uploaded files, computing the aggregate integrity.
    pub fn new(
        org: &str,
        coord: &Coordinate,
        version: &str,
        author: Option<Author>,
        created: i64,
        mut files: Vec<FileEntry>,
    ) -> Self {
        files.sort_by(|a, b| a.pathname.cmp(&b.pathname));
        let integrity = Self::compute_integrity(&files);
        Self {
            name: coord.full_name(),
            org: org.to_string(),
            kind: coord.kind(),
            version: version.to_string(),
            author,
            created,
            files,
            revision: integrity.revision(),
            integrity,
            meta: Vec::new(),
        }
    }

    /// Aggregate integrity over file entries, independent of their order.
    pub fn compute_integrity(files: &[FileEntry]) -> Integrity {
        integrity::aggregate(files.iter().map(|f| (f.pathname.as_str(), &f.integrity)))
    }

    /// Verify the stored integrity matches the file entries.
    pub fn verify_integrity(&self) -> crate::Result<()> {
        let computed = Self::compute_integrity(&self.files);
        if computed != self.integrity {
            return Err(crate::Error::ManifestIntegrity(format!(
                "expected {}, computed {}",
                self.integrity, computed
            )));
        }
        if self.revision != computed.revision() {
            return Err(crate::Error::ManifestIntegrity(format!(
                "revision {} does not match integrity {computed}",
                self.revision
            )));
        }
        Ok(())
    }

    /// Look up a file entry by pathname (with or without the leading `/`).
    pub fn file(&self, pathname: &str) -> Option<&FileEntry> {
        let wanted = pathname.trim_start_matches('/');
        self.files
            .iter()
            .find(|f| f.pathname.trim_start_matches('/') == wanted)
    }

    /// Total size of all files in bytes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
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
