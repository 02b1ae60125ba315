use depot_storage::{FilesystemSink, MemorySink, Sink};
use std::sync::Arc;
use tempfile::TempDir;

/// A sink under test, keeping any backing directory alive.
pub struct SinkFixture {
    pub sink: Arc<dyn Sink>,
    _temp_dir: Option<TempDir>,
}

impl SinkFixture {
    pub async fn filesystem() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let sink = FilesystemSink::new(temp_dir.path()).await.unwrap();
        Self {
            sink: Arc::new(sink),
            _temp_dir: Some(temp_dir),
        }
    }

    pub fn memory() -> Self {
        Self {
            sink: Arc::new(MemorySink::new()),
            _temp_dir: None,
        }
    }

    /// One fixture per backend.
    pub async fn all() -> Vec<Self> {
        vec![Self::filesystem().await, Self::memory()]
    }
}
