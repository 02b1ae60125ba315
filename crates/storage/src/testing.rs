//! Scriptable sink for tests.
//!
//! Wraps a [`MemorySink`] and injects failures or latency on keys containing
//! a configured pattern.

use crate::backends::memory::MemorySink;
use crate::error::{StorageError, StorageResult};
use crate::traits::{Sink, SinkEntry, SinkWriter};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Where an injected failure fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    /// Opening a writer.
    Open,
    /// Writing the first chunk.
    Write,
    /// Committing the entry.
    Finish,
    /// Reading the entry.
    Read,
    /// Deleting the entry.
    Delete,
}

#[derive(Default)]
struct Script {
    failures: Vec<(String, FailPoint)>,
    chunk_delay: Option<Duration>,
}

/// Counters for writer outcomes.
#[derive(Debug, Default)]
pub struct WriteStats {
    pub opened: AtomicUsize,
    pub finished: AtomicUsize,
    pub aborted: AtomicUsize,
}

/// A sink whose failures and timing are controlled by the test.
#[derive(Clone, Default)]
pub struct ScriptedSink {
    inner: MemorySink,
    script: Arc<Mutex<Script>>,
    stats: Arc<WriteStats>,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing memory sink.
    pub fn inner(&self) -> &MemorySink {
        &self.inner
    }

    pub fn stats(&self) -> &WriteStats {
        &self.stats
    }

    /// Fail operations at `point` on keys containing `pattern`.
    pub fn fail_on(&self, pattern: &str, point: FailPoint) {
        if let Ok(mut script) = self.script.lock() {
            script.failures.push((pattern.to_string(), point));
        }
    }

    /// Sleep before every chunk write.
    pub fn delay_chunks(&self, delay: Duration) {
        if let Ok(mut script) = self.script.lock() {
            script.chunk_delay = Some(delay);
        }
    }

    /// Remove all injected failures and delays.
    pub fn reset(&self) {
        if let Ok(mut script) = self.script.lock() {
            *script = Script::default();
        }
    }

    fn should_fail(&self, key: &str, point: FailPoint) -> bool {
        self.script
            .lock()
            .map(|s| {
                s.failures
                    .iter()
                    .any(|(pattern, p)| *p == point && key.contains(pattern.as_str()))
            })
            .unwrap_or(false)
    }

    fn chunk_delay(&self) -> Option<Duration> {
        self.script.lock().ok().and_then(|s| s.chunk_delay)
    }

    fn injected(key: &str, point: FailPoint) -> StorageError {
        StorageError::Backend(format!("injected {point:?} failure: {key}"))
    }
}

#[async_trait]
impl Sink for ScriptedSink {
    async fn write(&self, key: &str, content_type: &str) -> StorageResult<Box<dyn SinkWriter>> {
        if self.should_fail(key, FailPoint::Open) {
            return Err(Self::injected(key, FailPoint::Open));
        }
        let inner = self.inner.write(key, content_type).await?;
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedWriter {
            inner,
            key: key.to_string(),
            fail_write: self.should_fail(key, FailPoint::Write),
            fail_finish: self.should_fail(key, FailPoint::Finish),
            delay: self.chunk_delay(),
            stats: self.stats.clone(),
        }))
    }

    async fn read(&self, key: &str) -> StorageResult<SinkEntry> {
        if self.should_fail(key, FailPoint::Read) {
            return Err(Self::injected(key, FailPoint::Read));
        }
        self.inner.read(key).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if self.should_fail(key, FailPoint::Delete) {
            return Err(Self::injected(key, FailPoint::Delete));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedWriter {
    inner: Box<dyn SinkWriter>,
    key: String,
    fail_write: bool,
    fail_finish: bool,
    delay: Option<Duration>,
    stats: Arc<WriteStats>,
}

#[async_trait]
impl SinkWriter for ScriptedWriter {
    async fn write(&mut self, data: Bytes) -> StorageResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_write {
            return Err(ScriptedSink::injected(&self.key, FailPoint::Write));
        }
        self.inner.write(data).await
    }

    async fn finish(self: Box<Self>) -> StorageResult<u64> {
        if self.fail_finish {
            let key = self.key.clone();
            self.stats.aborted.fetch_add(1, Ordering::SeqCst);
            self.inner.abort().await?;
            return Err(ScriptedSink::injected(&key, FailPoint::Finish));
        }
        let written = self.inner.finish().await?;
        self.stats.finished.fetch_add(1, Ordering::SeqCst);
        Ok(written)
    }

    async fn abort(self: Box<Self>) -> StorageResult<()> {
        self.stats.aborted.fetch_add(1, Ordering::SeqCst);
        self.inner.abort().await
    }
}
