//! Content integrity hashes.
//!
//! Integrity strings use the SRI form `sha512-<base64>`. The aggregate hash of
//! a version is computed over its file hashes ordered by pathname, so the
//! result does not depend on upload order.

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};
use std::fmt;

const SRI_PREFIX: &str = "sha512-";

/// Digest bytes kept in a revision id.
const REVISION_BYTES: usize = 12;

/// A SHA-512 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Integrity([u8; 64]);

impl Integrity {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Hash a complete buffer.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Self::hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Create an incremental hasher.
    pub fn hasher() -> IntegrityHasher {
        IntegrityHasher(Sha512::new())
    }

    /// Parse from SRI format (`sha512-<base64>`).
    pub fn from_sri(s: &str) -> crate::Result<Self> {
        let b64 = s.strip_prefix(SRI_PREFIX).ok_or_else(|| {
            crate::Error::InvalidHash(format!("expected {SRI_PREFIX} prefix, got: {s}"))
        })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| crate::Error::InvalidHash(e.to_string()))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            crate::Error::InvalidHash(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Short URL-safe id derived from the digest, usable as a path segment.
    pub fn revision(&self) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&self.0[..REVISION_BYTES])
    }

    /// Encode as SRI format.
    pub fn to_sri(&self) -> String {
        format!(
            "{SRI_PREFIX}{}",
            base64::engine::general_purpose::STANDARD.encode(self.0)
        )
    }
}

impl fmt::Debug for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Integrity({}...)", &self.to_sri()[..20])
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sri())
    }
}

impl Serialize for Integrity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_sri())
    }
}

impl<'de> Deserialize<'de> for Integrity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_sri(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental SHA-512 hasher.
pub struct IntegrityHasher(Sha512);

impl IntegrityHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Integrity {
        Integrity(self.0.finalize().into())
    }
}

/// Compute the aggregate hash over `(pathname, integrity)` pairs.
///
/// Entries are sorted by pathname before their SRI strings are concatenated
/// and hashed.
pub fn aggregate<'a, I>(entries: I) -> Integrity
where
    I: IntoIterator<Item = (&'a str, &'a Integrity)>,
{
    let mut entries: Vec<_> = entries.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Integrity::hasher();
    for (_, integrity) in entries {
        hasher.update(integrity.to_sri().as_bytes());
    }
    hasher.finalize()
}
