// Publish atomicity, determinism and concurrency.

mod common;

use bytes::Bytes;
use common::{Fixture, ORG, pkg, sample_files};
use depot_core::{Author, Coordinate, Integrity, Manifest, PackageType};
use depot_registry::{ErrorKind, IncomingFile, OperationKind, Registry, RegistryError};
use depot_storage::testing::FailPoint;
use depot_storage::FilesystemSink;
use futures::TryStreamExt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_failed_file_write_publishes_nothing() {
    let fixture = Fixture::new();
    fixture.sink.fail_on("index.css", FailPoint::Write);

    let err = fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "8.4.1", sample_files(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    assert!(matches!(
        fixture.registry.get_manifest(ORG, &pkg("fuzz"), "8.4.1").await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        fixture.registry.get_versions(ORG, &pkg("fuzz")).await,
        Err(RegistryError::NotFound(_))
    ));

    // Every writer was either committed or aborted
    let stats = fixture.sink.stats();
    assert_eq!(
        stats.opened.load(Ordering::SeqCst),
        stats.finished.load(Ordering::SeqCst) + stats.aborted.load(Ordering::SeqCst)
    );
    assert_eq!(stats.aborted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_commit_of_one_file_publishes_nothing() {
    let fixture = Fixture::new();
    fixture.sink.fail_on("README.md", FailPoint::Finish);

    assert!(
        fixture
            .registry
            .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
            .await
            .is_err()
    );
    let keys = fixture.sink.inner().keys().await;
    assert!(keys.iter().all(|k| !k.ends_with(".package.json")), "{keys:?}");
}

#[tokio::test]
async fn test_failed_manifest_write_leaves_version_unpublished() {
    let fixture = Fixture::new();
    fixture.sink.fail_on(".package.json", FailPoint::Open);

    assert!(
        fixture
            .registry
            .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
            .await
            .is_err()
    );
    assert!(matches!(
        fixture.registry.get_file(ORG, &pkg("fuzz"), "1.0.0", "main/index.js").await,
        Err(RegistryError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_retry_after_failure_succeeds() {
    let fixture = Fixture::new();
    fixture.sink.fail_on("index.js", FailPoint::Write);
    assert!(
        fixture
            .registry
            .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
            .await
            .is_err()
    );

    fixture.sink.reset();
    fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
        .await
        .unwrap();
    fixture
        .registry
        .get_manifest(ORG, &pkg("fuzz"), "1.0.0")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_republish_keeps_committed_files() {
    let fixture = Fixture::new();
    let old = vec![
        IncomingFile::new("/a.js", "text/javascript", "old-a"),
        IncomingFile::new("/b.js", "text/javascript", "old-b"),
    ];
    let published = fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.0", old, None)
        .await
        .unwrap();

    fixture.sink.fail_on("b.js", FailPoint::Write);
    let new = vec![
        IncomingFile::new("/a.js", "text/javascript", "new-a"),
        IncomingFile::new("/b.js", "text/javascript", "new-b"),
    ];
    assert!(
        fixture
            .registry
            .put_package(ORG, &pkg("fuzz"), "1.0.0", new, None)
            .await
            .is_err()
    );
    fixture.sink.reset();

    let manifest = fixture
        .registry
        .get_manifest(ORG, &pkg("fuzz"), "1.0.0")
        .await
        .unwrap();
    assert_eq!(manifest.integrity, published.integrity);

    let file = fixture
        .registry
        .get_file(ORG, &pkg("fuzz"), "1.0.0", "a.js")
        .await
        .unwrap();
    let etag = file.etag.clone();
    let chunks: Vec<Bytes> = file.stream.try_collect().await.unwrap();
    let body = chunks.concat();
    assert_eq!(body, b"old-a".to_vec());
    assert_eq!(etag, Integrity::compute(&body).to_sri());
}

#[tokio::test]
async fn test_republish_with_new_content_switches_files_atomically() {
    let fixture = Fixture::new();
    fixture
        .registry
        .put_package(
            ORG,
            &pkg("fuzz"),
            "1.0.0",
            vec![IncomingFile::new("/a.js", "text/javascript", "old-a")],
            None,
        )
        .await
        .unwrap();
    fixture
        .registry
        .put_package(
            ORG,
            &pkg("fuzz"),
            "1.0.0",
            vec![IncomingFile::new("/a.js", "text/javascript", "new-a")],
            None,
        )
        .await
        .unwrap();

    let file = fixture
        .registry
        .get_file(ORG, &pkg("fuzz"), "1.0.0", "a.js")
        .await
        .unwrap();
    assert_eq!(file.etag, Integrity::compute(b"new-a").to_sri());
    let chunks: Vec<Bytes> = file.stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"new-a".to_vec());
}

#[tokio::test]
async fn test_index_failure_does_not_fail_a_committed_publish() {
    let fixture = Fixture::new();
    fixture.sink.fail_on("versions.json", FailPoint::Open);

    let published = fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
        .await
        .unwrap();
    assert_eq!(published.location, "/pkg/fuzz/1.0.0");
    fixture
        .registry
        .get_manifest(ORG, &pkg("fuzz"), "1.0.0")
        .await
        .unwrap();

    let map = Coordinate::parse(PackageType::Map, "buzz").unwrap();
    fixture
        .registry
        .put_map(ORG, &map, "1.0.0", Bytes::from_static(br#"{"imports":{}}"#))
        .await
        .unwrap();
    fixture.registry.get_map(ORG, &map, "1.0.0").await.unwrap();

    // Later publishes index normally again
    fixture.sink.reset();
    fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.1", sample_files(), None)
        .await
        .unwrap();
    let versions = fixture.registry.get_versions(ORG, &pkg("fuzz")).await.unwrap();
    assert!(versions.get("1.0.1").is_some());
}

#[tokio::test]
async fn test_integrity_is_independent_of_upload_order() {
    let fixture = Fixture::new();
    let files = sample_files();
    let mut reversed = files.clone();
    reversed.reverse();
    let mut rotated = files.clone();
    rotated.rotate_left(1);

    let mut integrities = Vec::new();
    for (version, set) in [("1.0.0", files), ("1.0.1", reversed), ("1.0.2", rotated)] {
        let published = fixture
            .registry
            .put_package(ORG, &pkg("fuzz"), version, set, None)
            .await
            .unwrap();
        integrities.push(published.integrity);
    }
    assert!(integrities.windows(2).all(|w| w[0] == w[1]));

    let manifest = fixture
        .registry
        .get_manifest(ORG, &pkg("fuzz"), "1.0.1")
        .await
        .unwrap();
    let pathnames: Vec<_> = manifest.files.iter().map(|f| f.pathname.as_str()).collect();
    assert_eq!(
        pathnames,
        ["/README.md", "/main/index.css", "/main/index.js", "/package.json"]
    );
    assert_eq!(Manifest::compute_integrity(&manifest.files), manifest.integrity);
}

#[tokio::test]
async fn test_republishing_identical_content_keeps_integrity() {
    let fixture = Fixture::new();
    let first = fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
        .await
        .unwrap();
    let second = fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
        .await
        .unwrap();
    assert_eq!(first.integrity, second.integrity);
}

#[tokio::test]
async fn test_slow_sink_still_commits_every_file() {
    let fixture = Fixture::new();
    fixture.sink.delay_chunks(Duration::from_millis(5));
    let files: Vec<_> = (0..20)
        .map(|i| {
            IncomingFile::new(
                format!("/lib/module{i}.js"),
                "text/javascript",
                format!("export const n = {i};"),
            )
        })
        .collect();

    fixture
        .registry
        .put_package(ORG, &pkg("slow"), "1.0.0", files, None)
        .await
        .unwrap();
    let manifest = fixture
        .registry
        .get_manifest(ORG, &pkg("slow"), "1.0.0")
        .await
        .unwrap();
    assert_eq!(manifest.files.len(), 20);
}

#[tokio::test]
async fn test_concurrent_publishes_of_different_versions_are_all_indexed() {
    let fixture = Fixture::new();
    fixture.sink.delay_chunks(Duration::from_millis(2));
    let publishes = (0..8).map(|minor| {
        let registry = fixture.registry.clone();
        async move {
            registry
                .put_package(ORG, &pkg("fuzz"), &format!("1.{minor}.0"), sample_files(), None)
                .await
        }
    });
    for result in futures::future::join_all(publishes).await {
        result.unwrap();
    }

    let versions = fixture.registry.get_versions(ORG, &pkg("fuzz")).await.unwrap();
    assert_eq!(versions.len(), 8);
}

#[tokio::test]
async fn test_author_is_recorded() {
    let fixture = Fixture::new();
    let author = Author {
        name: "ci".to_string(),
        user: "ci".to_string(),
    };
    fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), Some(author.clone()))
        .await
        .unwrap();
    let manifest = fixture
        .registry
        .get_manifest(ORG, &pkg("fuzz"), "1.0.0")
        .await
        .unwrap();
    assert_eq!(manifest.author, Some(author));
    assert_eq!(manifest.org, ORG);
}

#[tokio::test]
async fn test_observer_sees_each_operation() {
    let fixture = Fixture::new();
    fixture
        .registry
        .put_package(ORG, &pkg("fuzz"), "1.0.0", sample_files(), None)
        .await
        .unwrap();
    let _ = fixture.registry.get_manifest(ORG, &pkg("fuzz"), "9.9.9").await;

    assert_eq!(
        fixture.observer.events(),
        [
            (OperationKind::PackagePut, true),
            (OperationKind::ManifestGet, false)
        ]
    );
}

#[tokio::test]
async fn test_publish_and_serve_from_filesystem() {
    let temp_dir = TempDir::new().unwrap();
    let sink = FilesystemSink::new(temp_dir.path()).await.unwrap();
    let registry = Registry::new(Arc::new(sink));
    let coord = pkg("@cuz/fuzz");

    let published = registry
        .put_package(ORG, &coord, "8.4.1", sample_files(), None)
        .await
        .unwrap();
    assert!(
        temp_dir
            .path()
            .join("local/pkg/@cuz/fuzz/8.4.1")
            .join(published.integrity.revision())
            .join("main/index.js")
            .is_file()
    );

    let file = registry
        .get_file(ORG, &coord, "8.4.1", "/main/index.js")
        .await
        .unwrap();
    assert_eq!(file.mime_type, "text/javascript");
    let chunks: Vec<Bytes> = file.stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"export default 'fuzz';".to_vec());
}
