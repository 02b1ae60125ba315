//! Content sinks for the depot registry.
//!
//! This crate provides:
//! - The `Sink` trait: streaming writes, streaming reads with content type and
//!   ETag, delete and existence checks
//! - Backends: local filesystem and in-memory
//! - A scriptable test double behind the `test-utils` feature

pub mod backends;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod traits;

pub use backends::{filesystem::FilesystemSink, memory::MemorySink};
pub use error::{StorageError, StorageResult};
pub use traits::{ByteStream, Sink, SinkEntry, SinkWriter, StoredObject, validate_key};

use depot_core::config::StorageConfig;
use std::sync::Arc;

/// Create a sink from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn Sink>> {
    match config {
        StorageConfig::Filesystem { path } => {
            if path.as_os_str().is_empty() {
                return Err(StorageError::Config(
                    "filesystem storage path cannot be empty".to_string(),
                ));
            }
            let sink = FilesystemSink::new(path).await?;
            Ok(Arc::new(sink))
        }
        StorageConfig::Memory => {
            tracing::warn!("Using in-memory storage, contents are lost on restart");
            Ok(Arc::new(MemorySink::new()))
        }
    }
}
