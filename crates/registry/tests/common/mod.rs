#![allow(dead_code)]

use depot_core::{Coordinate, PackageType};
use depot_registry::{IncomingFile, OperationKind, OperationObserver, Registry};
use depot_storage::testing::ScriptedSink;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ORG: &str = "local";

/// Observer that keeps every callback for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(OperationKind, bool)>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<(OperationKind, bool)> {
        self.events.lock().unwrap().clone()
    }
}

impl OperationObserver for RecordingObserver {
    fn on_operation(&self, kind: OperationKind, success: bool, _duration: Duration) {
        self.events.lock().unwrap().push((kind, success));
    }
}

/// A registry over a scripted sink with a recording observer.
pub struct Fixture {
    pub registry: Registry,
    pub sink: ScriptedSink,
    pub observer: Arc<RecordingObserver>,
}

impl Fixture {
    pub fn new() -> Self {
        let sink = ScriptedSink::new();
        let observer = Arc::new(RecordingObserver::default());
        let registry = Registry::new(Arc::new(sink.clone()))
            .with_max_concurrent_writes(4)
            .with_observer(observer.clone());
        Self {
            registry,
            sink,
            observer,
        }
    }
}

pub fn pkg(name: &str) -> Coordinate {
    Coordinate::parse(PackageType::Pkg, name).unwrap()
}

/// A small package with a deterministic file set.
pub fn sample_files() -> Vec<IncomingFile> {
    vec![
        IncomingFile::new("/main/index.js", "text/javascript", "export default 'fuzz';"),
        IncomingFile::new("/main/index.css", "text/css", "body { color: red; }"),
        IncomingFile::new("/README.md", "text/markdown", "# fuzz"),
        IncomingFile::new("/package.json", "application/json", r#"{"name":"fuzz"}"#),
    ]
}
