//! Storage path derivation and request path parsing.
//!
//! Sink keys are relative (no leading `/`) and laid out per organization:
//!
//! ```text
//! <org>/<type>/<name>/versions.json
//! <org>/<type>/<name>/<version>.package.json
//! <org>/<type>/<name>/<version>.import-map.json
//! <org>/<type>/<name>/<alias>.alias.json
//! <org>/<type>/<name>/<version>/<revision>/<subpath>
//! ```
//!
//! `<revision>` is derived from the version's aggregate integrity and recorded
//! in its manifest. Each distinct file set of a version gets its own prefix,
//! so writing a new file set never touches the files of the committed one.
//!
//! `<name>` is `@scope/name` for scoped packages. Unscoped names may not start
//! with `@` and versions/aliases may not end in `.json`, so no two entries can
//! map to the same key.

use crate::coordinate::{
    Coordinate, PackageType, validate_alias, validate_segment, validate_version,
};

const VERSIONS_FILE: &str = "versions.json";
const MANIFEST_SUFFIX: &str = ".package.json";
const IMPORT_MAP_SUFFIX: &str = ".import-map.json";
const ALIAS_SUFFIX: &str = ".alias.json";

fn validate_org(org: &str) -> crate::Result<()> {
    validate_segment(org).map_err(crate::Error::InvalidPath)
}

/// Normalize an in-package sub-path.
///
/// Leading slashes and empty segments are dropped; every remaining segment is
/// validated. Returns an error for empty results and traversal attempts.
pub fn normalize_subpath(subpath: &str) -> crate::Result<String> {
    if subpath.contains('\\') {
        return Err(crate::Error::InvalidPath(format!(
            "backslash not allowed: {subpath}"
        )));
    }
    let mut parts = Vec::new();
    for segment in subpath.split('/').filter(|s| !s.is_empty()) {
        validate_segment(segment).map_err(crate::Error::InvalidPath)?;
        parts.push(segment);
    }
    if parts.is_empty() {
        return Err(crate::Error::InvalidPath("sub-path cannot be empty".to_string()));
    }
    Ok(parts.join("/"))
}

/// Resolve the sink key for a coordinate.
///
/// Without a version this is the package root (listing level). Without a
/// sub-path it is the version directory.
pub fn resolve_storage_path(
    org: &str,
    coord: &Coordinate,
    version: Option<&str>,
    subpath: Option<&str>,
) -> crate::Result<String> {
    validate_org(org)?;
    let root = format!("{org}/{}/{}", coord.kind(), coord.full_name());
    let Some(version) = version else {
        if subpath.is_some() {
            return Err(crate::Error::InvalidPath(
                "sub-path requires a version".to_string(),
            ));
        }
        return Ok(root);
    };
    validate_version(version)?;
    match subpath {
        Some(subpath) => Ok(format!("{root}/{version}/{}", normalize_subpath(subpath)?)),
        None => Ok(format!("{root}/{version}")),
    }
}

/// Key of a file inside one revision of a version.
pub fn file_path(
    org: &str,
    coord: &Coordinate,
    version: &str,
    revision: &str,
    subpath: &str,
) -> crate::Result<String> {
    validate_segment(revision).map_err(crate::Error::InvalidPath)?;
    let subpath = normalize_subpath(subpath)?;
    resolve_storage_path(org, coord, Some(version), Some(&format!("{revision}/{subpath}")))
}

/// Key of the document that commits a version: the package manifest, or the
/// import map itself for `map` coordinates.
pub fn manifest_path(org: &str, coord: &Coordinate, version: &str) -> crate::Result<String> {
    let base = resolve_storage_path(org, coord, Some(version), None)?;
    let suffix = match coord.kind() {
        PackageType::Map => IMPORT_MAP_SUFFIX,
        _ => MANIFEST_SUFFIX,
    };
    Ok(format!("{base}{suffix}"))
}

/// Key of an alias document.
pub fn alias_path(org: &str, coord: &Coordinate, alias: &str) -> crate::Result<String> {
    validate_alias(alias)?;
    let root = resolve_storage_path(org, coord, None, None)?;
    Ok(format!("{root}/{alias}{ALIAS_SUFFIX}"))
}

/// Key of the versions index for a package family.
pub fn versions_path(org: &str, coord: &Coordinate) -> crate::Result<String> {
    let root = resolve_storage_path(org, coord, None, None)?;
    Ok(format!("{root}/{VERSIONS_FILE}"))
}

/// How an alias segment should be resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AliasMode {
    /// `v` prefix: answer with a redirect to the target version.
    Redirect,
    /// `~` prefix: serve the target bytes directly.
    StaleWhileRevalidate,
}

/// What a request path addresses below the package family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// No version segment: the versions listing.
    Listing,
    /// An exact version.
    Version(String),
    /// An alias, with the prefix stripped from the key.
    Alias { key: String, mode: AliasMode },
}

/// A parsed request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestPath {
    pub coordinate: Coordinate,
    pub target: Target,
    /// In-package sub-path, normalized, when present.
    pub extras: Option<String>,
}

/// Parse a request path such as `/pkg/@cuz/fuzz/v8/main/index.js`.
///
/// Query strings and fragments are ignored.
pub fn parse_request_path(raw: &str) -> crate::Result<RequestPath> {
    let path = raw.split(['?', '#']).next().unwrap_or_default();
    let mut segments = path.split('/');

    if segments.next() != Some("") {
        return Err(crate::Error::InvalidPath(format!(
            "request path must be absolute: {path}"
        )));
    }

    let kind = PackageType::parse(segments.next().unwrap_or_default())?;

    let first = segments.next().unwrap_or_default();
    let coordinate = if first.starts_with('@') {
        let name = segments.next().unwrap_or_default();
        Coordinate::new(kind, Some(first), name)?
    } else {
        Coordinate::new(kind, None, first)?
    };

    let target_segment = segments.next().unwrap_or_default();
    let rest: Vec<&str> = segments.collect();
    let extras = if rest.iter().all(|s| s.is_empty()) {
        None
    } else {
        Some(normalize_subpath(&rest.join("/"))?)
    };

    let target = if target_segment.is_empty() {
        if extras.is_some() {
            return Err(crate::Error::InvalidPath(format!(
                "empty version segment: {path}"
            )));
        }
        Target::Listing
    } else if let Some(key) = target_segment.strip_prefix('v') {
        validate_alias(key)?;
        Target::Alias {
            key: key.to_string(),
            mode: AliasMode::Redirect,
        }
    } else if let Some(key) = target_segment.strip_prefix('~') {
        validate_alias(key)?;
        Target::Alias {
            key: key.to_string(),
            mode: AliasMode::StaleWhileRevalidate,
        }
    } else {
        validate_version(target_segment)?;
        Target::Version(target_segment.to_string())
    };

    Ok(RequestPath {
        coordinate,
        target,
        extras,
    })
}
