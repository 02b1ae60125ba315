//! The alias state machine.
//!
//! Each `(coordinate, key)` pair is either absent or points at a published
//! version:
//!
//! | Operation | Absent | Present |
//! |---|---|---|
//! | create | Present | `Conflict` |
//! | update | `NotFound` | Present (new target) |
//! | delete | Absent | Absent |
//! | resolve | `NotFound` | target location |
//!
//! Targets are validated against the committed manifest (or import map) of
//! the version. A key is never advanced automatically: `8` points wherever it
//! was last set, not at the newest 8.x release.
//!
//! Concurrent create/update calls on one key are last-write-wins.

use crate::error::{RegistryError, RegistryResult};
use crate::events::OperationKind;
use crate::Registry;
use bytes::Bytes;
use depot_core::manifest::now_millis;
use depot_core::path::{alias_path, manifest_path, normalize_subpath};
use depot_core::{Alias, Author, Coordinate, PackageType};
use depot_storage::StorageError;
use tracing::{debug, instrument};

/// Where an alias currently points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub alias: Alias,
    /// URL path of the target version, or of the file inside it.
    pub location: String,
    /// Normalized sub-path inside the target, when one was requested.
    pub subpath: Option<String>,
}

impl Registry {
    /// Create an alias. Fails with `Conflict` when the key is taken.
    #[instrument(skip(self, author), fields(org = %org, coordinate = %coord))]
    pub async fn create_alias(
        &self,
        org: &str,
        coord: &Coordinate,
        key: &str,
        version: &str,
        author: Option<Author>,
    ) -> RegistryResult<Alias> {
        self.observe(OperationKind::AliasCreate, async {
            let path = alias_path(org, coord, key)?;
            if self.sink.exists(&path).await? {
                return Err(RegistryError::Conflict(format!(
                    "alias {key} of {coord} already exists, update it instead"
                )));
            }
            self.store_alias(org, coord, key, version, author, &path)
                .await
        })
        .await
    }

    /// Point an existing alias at a new version. Fails with `NotFound` when
    /// the key is absent.
    #[instrument(skip(self, author), fields(org = %org, coordinate = %coord))]
    pub async fn update_alias(
        &self,
        org: &str,
        coord: &Coordinate,
        key: &str,
        version: &str,
        author: Option<Author>,
    ) -> RegistryResult<Alias> {
        self.observe(OperationKind::AliasUpdate, async {
            let path = alias_path(org, coord, key)?;
            if !self.sink.exists(&path).await? {
                return Err(RegistryError::NotFound(format!(
                    "alias {key} of {coord}"
                )));
            }
            self.store_alias(org, coord, key, version, author, &path)
                .await
        })
        .await
    }

    /// Delete an alias. Deleting an absent alias succeeds; the return value
    /// tells whether anything was removed.
    #[instrument(skip(self), fields(org = %org, coordinate = %coord))]
    pub async fn delete_alias(&self, org: &str, coord: &Coordinate, key: &str) -> RegistryResult<bool> {
        self.observe(OperationKind::AliasDelete, async {
            let path = alias_path(org, coord, key)?;
            match self.sink.delete(&path).await {
                Ok(()) => Ok(true),
                Err(StorageError::NotFound(_)) => {
                    debug!("Alias already absent");
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Resolve an alias to the location of its target, optionally a file
    /// inside the target version.
    #[instrument(skip(self), fields(org = %org, coordinate = %coord))]
    pub async fn resolve_alias(
        &self,
        org: &str,
        coord: &Coordinate,
        key: &str,
        subpath: Option<&str>,
    ) -> RegistryResult<Resolution> {
        self.observe(OperationKind::AliasGet, async {
            let subpath = subpath.map(normalize_subpath).transpose()?;
            if subpath.is_some() && coord.kind() == PackageType::Map {
                return Err(RegistryError::NotFound(format!(
                    "import map alias {key} of {coord} has no files"
                )));
            }

            let path = alias_path(org, coord, key)?;
            let json = self
                .read_document(&path, || format!("alias {key} of {coord}"))
                .await?;
            let alias = Alias::from_json(&json)?;

            let location = match &subpath {
                Some(subpath) => coord.file_url(&alias.version, subpath),
                None => coord.version_url(&alias.version),
            };
            Ok(Resolution {
                alias,
                location,
                subpath,
            })
        })
        .await
    }

    async fn store_alias(
        &self,
        org: &str,
        coord: &Coordinate,
        key: &str,
        version: &str,
        author: Option<Author>,
        path: &str,
    ) -> RegistryResult<Alias> {
        let target = manifest_path(org, coord, version)?;
        if !self.sink.exists(&target).await? {
            return Err(RegistryError::NotFound(format!(
                "{coord} version {version} is not published"
            )));
        }

        let alias = Alias::new(org, coord, key, version, author, now_millis());
        self.sink
            .put(path, "application/json", Bytes::from(alias.to_json()?))
            .await?;
        debug!(alias = %key, version = %version, "Alias stored");
        Ok(alias)
    }
}
