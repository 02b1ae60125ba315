//! Package types and coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content a package coordinate refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    /// Generic file bundle.
    Pkg,
    /// npm-style package.
    Npm,
    /// Import map.
    Map,
    /// Image bundle.
    Img,
}

impl PackageType {
    /// All package types, in routing order.
    pub const ALL: [PackageType; 4] = [Self::Pkg, Self::Npm, Self::Map, Self::Img];

    /// Parse from string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        match s {
            "pkg" => Ok(Self::Pkg),
            "npm" => Ok(Self::Npm),
            "map" => Ok(Self::Map),
            "img" => Ok(Self::Img),
            _ => Err(crate::Error::InvalidPackageType(s.to_string())),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pkg => "pkg",
            Self::Npm => "npm",
            Self::Map => "map",
            Self::Img => "img",
        }
    }

    /// Whether versions of this type are file bundles (as opposed to a single import map).
    pub fn is_bundle(&self) -> bool {
        !matches!(self, Self::Map)
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Suffix reserved for documents stored next to version directories.
const RESERVED_SUFFIX: &str = ".json";

/// Validate a single path segment supplied by a client.
///
/// Rejects empty segments, `.` and `..`, separators and control characters.
pub(crate) fn validate_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("segment cannot be empty".to_string());
    }
    if segment == "." || segment == ".." {
        return Err(format!("relative segment not allowed: {segment}"));
    }
    if segment.contains("..") {
        return Err(format!("path traversal not allowed: {segment}"));
    }
    for c in segment.chars() {
        if c == '/' || c == '\\' {
            return Err(format!("separator not allowed in segment: {segment}"));
        }
        if c.is_control() {
            return Err("control character in segment".to_string());
        }
    }
    Ok(())
}

/// Validate a version string.
pub fn validate_version(version: &str) -> crate::Result<()> {
    validate_segment(version).map_err(crate::Error::InvalidVersion)?;
    if version.ends_with(RESERVED_SUFFIX) {
        return Err(crate::Error::InvalidVersion(format!(
            "version cannot end with {RESERVED_SUFFIX}: {version}"
        )));
    }
    Ok(())
}

/// Validate an alias key (the part after the `v` or `~` prefix).
pub fn validate_alias(alias: &str) -> crate::Result<()> {
    validate_segment(alias).map_err(crate::Error::InvalidAlias)?;
    if alias.ends_with(RESERVED_SUFFIX) {
        return Err(crate::Error::InvalidAlias(format!(
            "alias cannot end with {RESERVED_SUFFIX}: {alias}"
        )));
    }
    Ok(())
}

/// Identifies a package family independently of version: `(type, scope, name)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    kind: PackageType,
    scope: Option<String>,
    name: String,
}

impl Coordinate {
    /// Create a coordinate, validating scope and name.
    ///
    /// `scope` must include its leading `@`.
    pub fn new(kind: PackageType, scope: Option<&str>, name: &str) -> crate::Result<Self> {
        if let Some(scope) = scope {
            validate_segment(scope).map_err(crate::Error::InvalidName)?;
            if !scope.starts_with('@') || scope.len() < 2 {
                return Err(crate::Error::InvalidName(format!(
                    "scope must be @-prefixed: {scope}"
                )));
            }
        }
        validate_segment(name).map_err(crate::Error::InvalidName)?;
        if name.starts_with('@') {
            return Err(crate::Error::InvalidName(format!(
                "unscoped name cannot start with @: {name}"
            )));
        }
        Ok(Self {
            kind,
            scope: scope.map(str::to_string),
            name: name.to_string(),
        })
    }

    /// Parse a full name, either `name` or `@scope/name`.
    pub fn parse(kind: PackageType, full_name: &str) -> crate::Result<Self> {
        match full_name.split_once('/') {
            Some((scope, name)) if full_name.starts_with('@') => {
                Self::new(kind, Some(scope), name)
            }
            Some(_) => Err(crate::Error::InvalidName(format!(
                "only scoped names may contain '/': {full_name}"
            ))),
            None => Self::new(kind, None, full_name),
        }
    }

    pub fn kind(&self) -> PackageType {
        self.kind
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full name as it appears on the wire and in documents: `@scope/name` or `name`.
    pub fn full_name(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{scope}/{}", self.name),
            None => self.name.clone(),
        }
    }

    /// URL path of the package family: `/<type>/<full name>`.
    pub fn url_path(&self) -> String {
        format!("/{}/{}", self.kind, self.full_name())
    }

    /// URL path of a published version.
    pub fn version_url(&self, version: &str) -> String {
        format!("{}/{version}", self.url_path())
    }

    /// URL path of a file inside a published version.
    pub fn file_url(&self, version: &str, subpath: &str) -> String {
        format!("{}/{version}/{subpath}", self.url_path())
    }

    /// URL path of an alias (always the `v` form).
    pub fn alias_url(&self, alias: &str) -> String {
        format!("{}/v{alias}", self.url_path())
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coordinate({self})")
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.full_name())
    }
}
