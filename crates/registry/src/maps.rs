//! Import map publishing and reads.

use crate::error::{RegistryError, RegistryResult};
use crate::events::OperationKind;
use crate::packages::Published;
use crate::Registry;
use bytes::Bytes;
use depot_core::path::manifest_path;
use depot_core::{Coordinate, Integrity, PackageType};
use serde_json::Value;
use tracing::{debug, instrument};

/// A stored import map.
#[derive(Clone, Debug)]
pub struct ImportMap {
    pub body: Bytes,
    /// SRI integrity of the body, used as its ETag.
    pub etag: String,
}

fn check_specifier_map(value: &Value, field: &str) -> RegistryResult<()> {
    let Value::Object(entries) = value else {
        return Err(RegistryError::BadRequest(format!(
            "import map `{field}` must be an object"
        )));
    };
    if let Some((specifier, _)) = entries.iter().find(|(_, target)| !target.is_string()) {
        return Err(RegistryError::BadRequest(format!(
            "import map `{field}` entry {specifier:?} must be a string"
        )));
    }
    Ok(())
}

/// Check that a body is a structurally valid import map.
///
/// The body must be a JSON object. `imports`, when present, maps specifiers
/// to URL strings. `scopes`, when present, maps scope prefixes to such maps.
pub fn validate_import_map(body: &[u8]) -> RegistryResult<()> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RegistryError::BadRequest(format!("import map is not valid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(RegistryError::BadRequest(
            "import map must be a JSON object".to_string(),
        ));
    };

    if let Some(imports) = map.get("imports") {
        check_specifier_map(imports, "imports")?;
    }
    if let Some(scopes) = map.get("scopes") {
        let Value::Object(scopes) = scopes else {
            return Err(RegistryError::BadRequest(
                "import map `scopes` must be an object".to_string(),
            ));
        };
        for (prefix, scoped) in scopes {
            check_specifier_map(scoped, &format!("scopes.{prefix}"))?;
        }
    }
    Ok(())
}

fn ensure_map(coord: &Coordinate) -> RegistryResult<()> {
    if coord.kind() == PackageType::Map {
        Ok(())
    } else {
        Err(RegistryError::BadRequest(format!(
            "{coord} is not an import map"
        )))
    }
}

impl Registry {
    /// Publish a version of an import map.
    #[instrument(skip(self, body), fields(org = %org, coordinate = %coord, size = body.len()))]
    pub async fn put_map(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
        body: Bytes,
    ) -> RegistryResult<Published> {
        self.observe(OperationKind::MapPut, async {
            ensure_map(coord)?;
            let key = manifest_path(org, coord, version)?;

            let limit = self.limits.max_file_size(PackageType::Map);
            if body.len() as u64 > limit {
                return Err(RegistryError::PayloadTooLarge {
                    what: "import map".to_string(),
                    limit,
                });
            }
            validate_import_map(&body)?;

            let integrity = Integrity::compute(&body);
            self.sink.put(&key, "application/json", body).await?;
            debug!(integrity = %integrity, "Import map committed");

            self.record_version(org, coord, version, integrity).await;
            Ok(Published {
                location: coord.version_url(version),
                integrity,
            })
        })
        .await
    }

    /// Read a published import map.
    #[instrument(skip(self), fields(org = %org, coordinate = %coord))]
    pub async fn get_map(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
    ) -> RegistryResult<ImportMap> {
        self.observe(OperationKind::MapGet, async {
            ensure_map(coord)?;
            let key = manifest_path(org, coord, version)?;
            let body = self
                .read_document(&key, || format!("{coord} version {version}"))
                .await?;
            Ok(ImportMap {
                etag: Integrity::compute(&body).to_sri(),
                body,
            })
        })
        .await
    }
}
