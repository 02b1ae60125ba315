//! In-memory sink.

use crate::error::{StorageError, StorageResult};
use crate::traits::{Sink, SinkEntry, SinkWriter, validate_key};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use depot_core::Integrity;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Clone, Debug)]
struct MemoryEntry {
    data: Bytes,
    mime_type: String,
    etag: String,
}

type Entries = Arc<RwLock<HashMap<String, MemoryEntry>>>;

/// Sink holding entries in process memory.
///
/// ETags are the SHA-512 integrity of the entry contents.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Entries,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry directly, deriving its content type from the key.
    pub async fn set(&self, key: &str, data: impl Into<Bytes>) -> StorageResult<()> {
        validate_key(key)?;
        let data = data.into();
        let entry = MemoryEntry {
            etag: Integrity::compute(&data).to_sri(),
            mime_type: depot_core::mime::from_path(key).to_string(),
            data,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    /// All keys currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl Sink for MemorySink {
    #[instrument(skip(self), fields(backend = "memory"))]
    async fn write(&self, key: &str, content_type: &str) -> StorageResult<Box<dyn SinkWriter>> {
        validate_key(key)?;
        Ok(Box::new(MemoryWriter {
            entries: self.entries.clone(),
            key: key.to_string(),
            mime_type: content_type.to_string(),
            buf: BytesMut::new(),
        }))
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn read(&self, key: &str) -> StorageResult<SinkEntry> {
        validate_key(key)?;
        let entry = self
            .entries
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let size = entry.data.len() as u64;
        Ok(SinkEntry {
            stream: Box::pin(futures::stream::once(async move { Ok(entry.data) })),
            mime_type: entry.mime_type,
            etag: entry.etag,
            size: Some(size),
        })
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.entries
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    #[instrument(skip(self), fields(backend = "memory"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.entries.read().await.contains_key(key))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Buffers a write until it is finished.
struct MemoryWriter {
    entries: Entries,
    key: String,
    mime_type: String,
    buf: BytesMut,
}

#[async_trait]
impl SinkWriter for MemoryWriter {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        self.buf.extend_from_slice(&data);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        let Self {
            entries,
            key,
            mime_type,
            buf,
        } = *self;
        let data = buf.freeze();
        let size = data.len() as u64;
        let entry = MemoryEntry {
            etag: Integrity::compute(&data).to_sri(),
            mime_type,
            data,
        };
        entries.write().await.insert(key, entry);
        Ok(size)
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        Ok(())
    }
}
