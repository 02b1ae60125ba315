//! Sink trait definitions.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Validate a sink key.
///
/// Keys are relative, `/`-separated, and may not contain empty, `.` or `..`
/// segments or backslashes.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "path traversal not allowed: {key}"
        )));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == ".") {
        return Err(StorageError::InvalidKey(format!(
            "contains empty or relative segment: {key}"
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(StorageError::InvalidKey(
            "control character in key".to_string(),
        ));
    }
    Ok(())
}

/// An entry opened for reading.
pub struct SinkEntry {
    /// Entry contents.
    pub stream: ByteStream,
    /// Content type recorded for (or derived from) the entry.
    pub mime_type: String,
    /// Opaque validator for conditional requests.
    pub etag: String,
    /// Size in bytes, when the backend knows it up front.
    pub size: Option<u64>,
}

impl SinkEntry {
    /// Collect the whole entry into memory.
    pub async fn into_bytes(mut self) -> StorageResult<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for SinkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkEntry")
            .field("mime_type", &self.mime_type)
            .field("etag", &self.etag)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A fully buffered entry.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub data: Bytes,
    pub mime_type: String,
    pub etag: String,
}

/// Byte storage used by the registry.
///
/// Implementations must be safe for concurrent use. A write becomes visible
/// to readers only once its writer finishes.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Open a writer for a key. The entry replaces any existing one on finish.
    async fn write(&self, key: &str, content_type: &str) -> StorageResult<Box<dyn SinkWriter>>;

    /// Open an entry for reading.
    async fn read(&self, key: &str) -> StorageResult<SinkEntry>;

    /// Delete an entry. Fails with `NotFound` when absent.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check whether an entry exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the name of this sink backend.
    ///
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is usable. Called at startup and by `/health`.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Write a complete buffer.
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> StorageResult<()> {
        let mut writer = self.write(key, content_type).await?;
        if let Err(e) = writer.write(data).await {
            let _ = writer.abort().await;
            return Err(e);
        }
        writer.finish().await?;
        Ok(())
    }

    /// Read a complete entry into memory.
    async fn get(&self, key: &str) -> StorageResult<StoredObject> {
        let entry = self.read(key).await?;
        let mime_type = entry.mime_type.clone();
        let etag = entry.etag.clone();
        let data = entry.into_bytes().await?;
        Ok(StoredObject {
            data,
            mime_type,
            etag,
        })
    }
}

/// Writer for a single sink entry.
#[async_trait]
pub trait SinkWriter: Send {
    /// Write a chunk of data.
    async fn write(&mut self, data: Bytes) -> StorageResult<()>;

    /// Commit the entry and return the total bytes written.
    async fn finish(self: Box<Self>) -> StorageResult<u64>;

    /// Discard everything written so far.
    async fn abort(self: Box<Self>) -> StorageResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_registry_paths() {
        validate_key("local/pkg/fuzz/8.4.1/main/index.js").unwrap();
        validate_key("local/pkg/@cuz/fuzz/versions.json").unwrap();
    }

    #[test]
    fn test_validate_key_rejects_unsafe_keys() {
        for key in [
            "",
            "/etc/passwd",
            "a/../b",
            "a\\b",
            "a//b",
            "a/./b",
            "trailing/",
            "nul\0byte",
        ] {
            assert!(validate_key(key).is_err(), "{key:?} should be rejected");
        }
    }

    #[tokio::test]
    async fn test_into_bytes_concatenates_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"hello ")), Ok(Bytes::from_static(b"world"))];
        let entry = SinkEntry {
            stream: Box::pin(futures::stream::iter(chunks)),
            mime_type: "text/plain".to_string(),
            etag: "x".to_string(),
            size: None,
        };
        assert_eq!(entry.into_bytes().await.unwrap(), Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_into_bytes_propagates_errors() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(StorageError::Backend("boom".to_string())),
        ];
        let entry = SinkEntry {
            stream: Box::pin(futures::stream::iter(chunks)),
            mime_type: "text/plain".to_string(),
            etag: "x".to_string(),
            size: None,
        };
        assert!(entry.into_bytes().await.is_err());
    }
}
