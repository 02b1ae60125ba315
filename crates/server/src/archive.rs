//! Package tarball extraction.

use crate::error::{ApiError, ApiResult};
use bytes::Bytes;
use depot_registry::IncomingFile;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;

/// Total extracted bytes allowed per archive, as a multiple of the per-file limit.
const MAX_EXPANSION: u64 = 4;

/// Turn an archive entry path into a package pathname with a leading `/`.
///
/// Returns `None` for entries that name the archive root itself.
fn package_pathname(path: &Path) -> ApiResult<Option<String>> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment.to_str().ok_or_else(|| {
                    ApiError::BadRequest(format!(
                        "archive entry is not valid UTF-8: {}",
                        path.display()
                    ))
                })?;
                segments.push(segment);
            }
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(ApiError::BadRequest(format!(
                    "archive entry escapes the package: {}",
                    path.display()
                )));
            }
        }
    }
    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("/{}", segments.join("/"))))
}

fn extract_blocking(data: &[u8], max_file_size: u64) -> ApiResult<Vec<IncomingFile>> {
    let corrupt = |e: std::io::Error| ApiError::BadRequest(format!("invalid package archive: {e}"));

    let max_total = max_file_size.saturating_mul(MAX_EXPANSION);
    let mut total: u64 = 0;
    let mut archive = Archive::new(GzDecoder::new(data));
    let mut files = Vec::new();
    for entry in archive.entries().map_err(corrupt)? {
        let mut entry = entry.map_err(corrupt)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(corrupt)?.into_owned();
        let Some(pathname) = package_pathname(&path)? else {
            continue;
        };

        let size = entry.header().size().map_err(corrupt)?;
        if size > max_file_size {
            return Err(ApiError::PayloadTooLarge(format!(
                "file {pathname} is {size} bytes, limit is {max_file_size}"
            )));
        }
        total = total.saturating_add(size);
        if total > max_total {
            return Err(ApiError::PayloadTooLarge(format!(
                "archive expands beyond {max_total} bytes"
            )));
        }

        let mut buf = Vec::with_capacity(size as usize);
        entry.read_to_end(&mut buf).map_err(corrupt)?;
        let mime_type = depot_core::mime::from_path(&pathname);
        files.push(IncomingFile::new(pathname, mime_type, buf));
    }
    Ok(files)
}

/// Extract the regular files of a gzip-compressed tarball.
///
/// Directories, links and other special entries are skipped. Runs on a
/// blocking thread.
pub async fn extract_tarball(data: Bytes, max_file_size: u64) -> ApiResult<Vec<IncomingFile>> {
    let files = tokio::task::spawn_blocking(move || extract_blocking(&data, max_file_size))
        .await
        .map_err(|e| ApiError::Internal(format!("archive extraction task failed: {e}")))??;
    tracing::debug!(files = files.len(), "Package archive extracted");
    Ok(files)
}
