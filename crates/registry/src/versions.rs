//! Versions index reads and maintenance.

use crate::error::RegistryResult;
use crate::events::OperationKind;
use crate::Registry;
use bytes::Bytes;
use depot_core::path::versions_path;
use depot_core::{Coordinate, Integrity, VersionsDocument};
use depot_storage::StorageError;
use tracing::{instrument, warn};

impl Registry {
    /// List the published versions of a package family, newest first.
    #[instrument(skip(self), fields(org = %org, coordinate = %coord))]
    pub async fn get_versions(&self, org: &str, coord: &Coordinate) -> RegistryResult<VersionsDocument> {
        self.observe(OperationKind::VersionsGet, async {
            let key = versions_path(org, coord)?;
            let json = self
                .read_document(&key, || format!("no published versions of {coord}"))
                .await?;
            Ok(VersionsDocument::from_json(&json)?)
        })
        .await
    }

    /// Record a committed version in the versions index.
    ///
    /// The version is live once its document is committed, so a failed index
    /// update is logged rather than failing the publish.
    pub(crate) async fn record_version(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
        integrity: Integrity,
    ) {
        if let Err(e) = self.upsert_version(org, coord, version, integrity).await {
            warn!(
                org = %org,
                coordinate = %coord,
                version = %version,
                error = %e,
                "Version committed but the versions index was not updated"
            );
        }
    }

    async fn upsert_version(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
        integrity: Integrity,
    ) -> RegistryResult<()> {
        let key = versions_path(org, coord)?;
        let _guard = self.index_lock.lock().await;

        let mut document = match self.sink.get(&key).await {
            Ok(stored) => VersionsDocument::from_json(&stored.data)?,
            Err(StorageError::NotFound(_)) => VersionsDocument::new(org, coord),
            Err(e) => return Err(e.into()),
        };
        document.upsert(version, integrity);
        self.sink
            .put(&key, "application/json", Bytes::from(document.to_json()?))
            .await?;
        Ok(())
    }
}
