//! Publish, read and alias engine for the depot registry.
//!
//! [`Registry`] ties path derivation and integrity hashing from `depot-core`
//! to a [`Sink`]. It implements:
//! - Package publishing with commit-last manifests
//! - Import map publishing
//! - Manifest, file and versions index reads
//! - The alias state machine and alias resolution
//!
//! The registry does not log request outcomes itself. Each operation is
//! reported to an [`OperationObserver`].

pub mod aliases;
pub mod error;
pub mod events;
pub mod maps;
pub mod packages;
pub mod versions;

pub use aliases::Resolution;
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use events::{NoopObserver, OperationKind, OperationObserver};
pub use maps::{ImportMap, validate_import_map};
pub use packages::{FileContent, IncomingFile, Published};

use bytes::Bytes;
use depot_core::config::LimitsConfig;
use depot_storage::{Sink, StorageError};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Default number of concurrent file writes per publish.
pub const DEFAULT_MAX_CONCURRENT_WRITES: usize = 8;

/// The registry engine. Cheap to clone.
#[derive(Clone)]
pub struct Registry {
    sink: Arc<dyn Sink>,
    limits: LimitsConfig,
    max_concurrent_writes: usize,
    observer: Arc<dyn OperationObserver>,
    /// Serializes read-modify-write cycles on versions indexes.
    index_lock: Arc<Mutex<()>>,
}

impl Registry {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            sink,
            limits: LimitsConfig::default(),
            max_concurrent_writes: DEFAULT_MAX_CONCURRENT_WRITES,
            observer: Arc::new(NoopObserver),
            index_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_concurrent_writes(mut self, max: usize) -> Self {
        self.max_concurrent_writes = max.max(1);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn OperationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Run an operation and report its outcome to the observer.
    async fn observe<T, F>(&self, kind: OperationKind, operation: F) -> RegistryResult<T>
    where
        F: Future<Output = RegistryResult<T>>,
    {
        let start = Instant::now();
        let result = operation.await;
        self.observer
            .on_operation(kind, result.is_ok(), start.elapsed());
        result
    }

    /// Read a whole document, turning a missing key into `NotFound` with a
    /// caller-facing description.
    async fn read_document(&self, key: &str, describe: impl FnOnce() -> String) -> RegistryResult<Bytes> {
        match self.sink.get(key).await {
            Ok(object) => Ok(object.data),
            Err(StorageError::NotFound(_)) => Err(RegistryError::NotFound(describe())),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("sink", &self.sink.backend_name())
            .field("limits", &self.limits)
            .field("max_concurrent_writes", &self.max_concurrent_writes)
            .finish_non_exhaustive()
    }
}
