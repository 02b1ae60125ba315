//! Package publishing and reads.
//!
//! A publish hashes every file up front, streams the files into the sink
//! under the revision prefix of that file set, and only writes the version
//! manifest once all files have been committed. The manifest is the sole
//! signal that a version exists: if any file fails the manifest is never
//! written. Files of an already committed revision are never rewritten with
//! different bytes, so a failed re-publish leaves the old version intact.

use crate::error::{RegistryError, RegistryResult};
use crate::events::OperationKind;
use crate::Registry;
use bytes::Bytes;
use depot_core::manifest::now_millis;
use depot_core::path::{file_path, manifest_path, normalize_subpath};
use depot_core::{Author, Coordinate, FileEntry, Integrity, Manifest};
use depot_storage::{ByteStream, StorageError};
use futures::StreamExt;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Chunk size used when streaming a file into the sink.
const WRITE_CHUNK_SIZE: usize = 64 * 1024;

const JSON: &str = "application/json";

/// One file of an upload, already extracted from its archive.
#[derive(Clone, Debug)]
pub struct IncomingFile {
    /// Path inside the package. A leading `/` is optional.
    pub pathname: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl IncomingFile {
    pub fn new(pathname: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            pathname: pathname.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// Outcome of a successful publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Published {
    /// URL path of the published version.
    pub location: String,
    /// Integrity of the committed document.
    pub integrity: Integrity,
}

/// A file opened for serving.
pub struct FileContent {
    pub stream: ByteStream,
    pub mime_type: String,
    /// SRI integrity of the file, used as its ETag.
    pub etag: String,
    pub size: u64,
}

impl std::fmt::Debug for FileContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileContent")
            .field("mime_type", &self.mime_type)
            .field("etag", &self.etag)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A file checked and ready to be written.
struct PendingFile {
    key: String,
    mime_type: String,
    data: Bytes,
}

fn ensure_bundle(coord: &Coordinate) -> RegistryResult<()> {
    if coord.kind().is_bundle() {
        Ok(())
    } else {
        Err(RegistryError::BadRequest(format!(
            "{coord} is an import map, not a file bundle"
        )))
    }
}

impl Registry {
    /// Publish a version of a package.
    ///
    /// Re-publishing an existing version replaces its manifest once the new
    /// file set is fully written.
    #[instrument(skip(self, files, author), fields(org = %org, coordinate = %coord, version = %version))]
    pub async fn put_package(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
        files: Vec<IncomingFile>,
        author: Option<Author>,
    ) -> RegistryResult<Published> {
        self.observe(
            OperationKind::PackagePut,
            self.put_package_inner(org, coord, version, files, author),
        )
        .await
    }

    async fn put_package_inner(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
        files: Vec<IncomingFile>,
        author: Option<Author>,
    ) -> RegistryResult<Published> {
        ensure_bundle(coord)?;
        let manifest_key = manifest_path(org, coord, version)?;
        let prepared = self.prepare_files(coord, files)?;
        let file_count = prepared.len();

        let manifest = Manifest::new(
            org,
            coord,
            version,
            author,
            now_millis(),
            prepared.iter().map(|(entry, _)| entry.clone()).collect(),
        );
        let pending = prepared
            .into_iter()
            .map(|(entry, data)| -> RegistryResult<PendingFile> {
                Ok(PendingFile {
                    key: file_path(org, coord, version, &manifest.revision, &entry.pathname)?,
                    mime_type: entry.mime_type,
                    data,
                })
            })
            .collect::<RegistryResult<Vec<_>>>()?;

        // Every write runs to completion so each failed writer is aborted
        let results: Vec<RegistryResult<()>> = futures::stream::iter(
            pending.into_iter().map(|file| self.write_file(file)),
        )
        .buffer_unordered(self.max_concurrent_writes)
        .collect()
        .await;
        results.into_iter().collect::<RegistryResult<()>>()?;

        self.sink
            .put(&manifest_key, JSON, Bytes::from(manifest.to_json()?))
            .await?;
        debug!(
            files = file_count,
            integrity = %manifest.integrity,
            revision = %manifest.revision,
            "Manifest committed"
        );

        self.record_version(org, coord, version, manifest.integrity)
            .await;

        Ok(Published {
            location: coord.version_url(version),
            integrity: manifest.integrity,
        })
    }

    /// Validate pathnames and sizes and hash every file before anything is
    /// written.
    fn prepare_files(
        &self,
        coord: &Coordinate,
        files: Vec<IncomingFile>,
    ) -> RegistryResult<Vec<(FileEntry, Bytes)>> {
        if files.is_empty() {
            return Err(RegistryError::BadRequest(
                "package contains no files".to_string(),
            ));
        }

        let limit = self.limits.max_file_size(coord.kind());
        let mut seen = HashSet::with_capacity(files.len());
        let mut prepared = Vec::with_capacity(files.len());
        for file in files {
            let subpath = normalize_subpath(&file.pathname)?;
            if file.data.len() as u64 > limit {
                return Err(RegistryError::PayloadTooLarge {
                    what: format!("file /{subpath}"),
                    limit,
                });
            }
            if !seen.insert(subpath.clone()) {
                return Err(RegistryError::BadRequest(format!(
                    "duplicate file in package: /{subpath}"
                )));
            }
            let entry = FileEntry {
                pathname: format!("/{subpath}"),
                mime_type: file.mime_type,
                size: file.data.len() as u64,
                integrity: Integrity::compute(&file.data),
            };
            prepared.push((entry, file.data));
        }
        Ok(prepared)
    }

    /// Stream one file into the sink in chunks.
    async fn write_file(&self, file: PendingFile) -> RegistryResult<()> {
        let mut writer = self.sink.write(&file.key, &file.mime_type).await?;

        let mut offset = 0;
        while offset < file.data.len() {
            let end = (offset + WRITE_CHUNK_SIZE).min(file.data.len());
            let chunk = file.data.slice(offset..end);
            if let Err(e) = writer.write(chunk).await {
                warn!(key = %file.key, error = %e, "File write failed, aborting");
                if let Err(abort_err) = writer.abort().await {
                    warn!(key = %file.key, error = %abort_err, "Abort failed");
                }
                return Err(e.into());
            }
            offset = end;
        }

        writer.finish().await?;
        Ok(())
    }

    /// Read the manifest of a published version.
    #[instrument(skip(self), fields(org = %org, coordinate = %coord))]
    pub async fn get_manifest(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
    ) -> RegistryResult<Manifest> {
        self.observe(
            OperationKind::ManifestGet,
            self.load_manifest(org, coord, version),
        )
        .await
    }

    async fn load_manifest(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
    ) -> RegistryResult<Manifest> {
        ensure_bundle(coord)?;
        let key = manifest_path(org, coord, version)?;
        let json = self
            .read_document(&key, || format!("{coord} version {version}"))
            .await?;
        Ok(Manifest::from_json(&json)?)
    }

    /// Open a file of a published version for serving.
    ///
    /// Only files listed in the version's manifest are served.
    #[instrument(skip(self), fields(org = %org, coordinate = %coord))]
    pub async fn get_file(
        &self,
        org: &str,
        coord: &Coordinate,
        version: &str,
        subpath: &str,
    ) -> RegistryResult<FileContent> {
        self.observe(OperationKind::PackageGet, async {
            let manifest = self.load_manifest(org, coord, version).await?;
            let subpath = normalize_subpath(subpath)?;
            let entry = manifest.file(&subpath).ok_or_else(|| {
                RegistryError::NotFound(format!("/{subpath} in {coord} version {version}"))
            })?;

            let key = file_path(org, coord, version, &manifest.revision, &subpath)?;
            let stored = match self.sink.read(&key).await {
                Ok(stored) => stored,
                Err(StorageError::NotFound(_)) => {
                    warn!(key = %key, "File listed in manifest is missing from the sink");
                    return Err(RegistryError::NotFound(format!(
                        "/{subpath} in {coord} version {version}"
                    )));
                }
                Err(e) => return Err(e.into()),
            };

            Ok(FileContent {
                stream: stored.stream,
                mime_type: entry.mime_type.clone(),
                etag: entry.integrity.to_sri(),
                size: entry.size,
            })
        })
        .await
    }
}
