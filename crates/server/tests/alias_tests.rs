//! Integration tests for alias create, update, delete and resolution.

mod common;

use axum::http::StatusCode;
use common::{TestServer, authed, fuzz_tarball, header, request, tarball};
use serde_json::Value;

/// A server with fuzz 8.4.1 published and `v8` pointing at it.
async fn aliased_server() -> (TestServer, String) {
    let server = TestServer::new().await;
    let token = server.login().await;
    server
        .publish(&token, "/pkg/fuzz/8.4.1", &fuzz_tarball())
        .await;
    let status = server
        .set_alias("PUT", &token, "/pkg/fuzz/v8", "8.4.1")
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    (server, token)
}

#[tokio::test]
async fn test_create_alias_redirects_to_alias() {
    let server = TestServer::new().await;
    let token = server.login().await;
    server
        .publish(&token, "/pkg/fuzz/8.4.1", &fuzz_tarball())
        .await;

    let (response, _) = server
        .call(common::multipart_request(
            "PUT",
            "/pkg/fuzz/v8",
            Some(&token),
            &[common::Part::text("version", "8.4.1")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header(&response, "location"), "/pkg/fuzz/v8");
    assert_eq!(header(&response, "cache-control"), "no-store");
}

#[tokio::test]
async fn test_alias_file_redirect() {
    let (server, _) = aliased_server().await;

    let (response, _) = server
        .call(request("GET", "/pkg/fuzz/v8/main/index.js"))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        header(&response, "location"),
        "/pkg/fuzz/8.4.1/main/index.js"
    );
    assert_eq!(header(&response, "cache-control"), "public, max-age=1200");
}

#[tokio::test]
async fn test_alias_root_redirect() {
    let (server, _) = aliased_server().await;

    let (response, _) = server.call(request("GET", "/pkg/fuzz/v8")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header(&response, "location"), "/pkg/fuzz/8.4.1");
    assert_eq!(header(&response, "cache-control"), "public, max-age=1200");
}

#[tokio::test]
async fn test_alias_cache_control_is_configurable() {
    let server = TestServer::with_config(|config| {
        config.cache.alias = "public, max-age=60".to_string();
    })
    .await;
    let token = server.login().await;
    server
        .publish(&token, "/pkg/fuzz/8.4.1", &fuzz_tarball())
        .await;
    server
        .set_alias("PUT", &token, "/pkg/fuzz/v8", "8.4.1")
        .await;

    let (response, _) = server.call(request("GET", "/pkg/fuzz/v8")).await;
    assert_eq!(header(&response, "cache-control"), "public, max-age=60");
}

#[tokio::test]
async fn test_stale_while_revalidate_serves_bytes() {
    let (server, _) = aliased_server().await;

    let (response, body) = server
        .call(request("GET", "/pkg/fuzz/~8/main/index.js"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body[..], b"export default 'fuzz';");
    assert_eq!(
        header(&response, "cache-control"),
        "public, max-age=60, stale-while-revalidate=86400"
    );
    assert!(header(&response, "etag").starts_with("\"sha512-"));

    // Without a sub-path there are no bytes to serve, so it redirects
    let (response, _) = server.call(request("GET", "/pkg/fuzz/~8")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header(&response, "location"), "/pkg/fuzz/8.4.1");
}

#[tokio::test]
async fn test_create_existing_alias_conflicts() {
    let (server, token) = aliased_server().await;

    let status = server
        .set_alias("PUT", &token, "/pkg/fuzz/v8", "8.4.1")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_alias() {
    let (server, token) = aliased_server().await;
    server
        .publish(&token, "/pkg/fuzz/8.5.0", &tarball(&[("main/index.js", b"v2")]))
        .await;

    let status = server
        .set_alias("POST", &token, "/pkg/fuzz/v8", "8.5.0")
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (response, _) = server
        .call(request("GET", "/pkg/fuzz/v8/main/index.js"))
        .await;
    assert_eq!(
        header(&response, "location"),
        "/pkg/fuzz/8.5.0/main/index.js"
    );
}

#[tokio::test]
async fn test_update_absent_alias_is_not_found() {
    let server = TestServer::new().await;
    let token = server.login().await;
    server
        .publish(&token, "/pkg/fuzz/8.4.1", &fuzz_tarball())
        .await;

    let status = server
        .set_alias("POST", &token, "/pkg/fuzz/v8", "8.4.1")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_alias_to_unpublished_version_is_not_found() {
    let server = TestServer::new().await;
    let token = server.login().await;

    let status = server
        .set_alias("PUT", &token, "/pkg/fuzz/v8", "8.4.1")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_alias_without_version_field_is_bad_request() {
    let server = TestServer::new().await;
    let token = server.login().await;

    let (response, body) = server
        .call(common::multipart_request(
            "PUT",
            "/pkg/fuzz/v8",
            Some(&token),
            &[common::Part::text("target", "8.4.1")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "bad_request");
}

#[tokio::test]
async fn test_delete_alias() {
    let (server, token) = aliased_server().await;

    let (response, body) = server
        .call(authed("DELETE", "/pkg/fuzz/v8", &token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(header(&response, "cache-control"), "no-store");
    assert!(body.is_empty());

    let (response, _) = server.call(request("GET", "/pkg/fuzz/v8")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&response, "cache-control"), "public, max-age=5");

    // Deleting again is not an error
    let (response, _) = server
        .call(authed("DELETE", "/pkg/fuzz/v8", &token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_alias_is_not_advanced_by_new_publish() {
    let (server, token) = aliased_server().await;
    server
        .publish(&token, "/pkg/fuzz/8.9.0", &fuzz_tarball())
        .await;

    let (response, _) = server.call(request("GET", "/pkg/fuzz/v8")).await;
    assert_eq!(header(&response, "location"), "/pkg/fuzz/8.4.1");
}

#[tokio::test]
async fn test_scoped_alias() {
    let server = TestServer::new().await;
    let token = server.login().await;
    server
        .publish(&token, "/npm/@cuz/fuzz/2.0.0", &fuzz_tarball())
        .await;
    let status = server
        .set_alias("PUT", &token, "/npm/@cuz/fuzz/v2", "2.0.0")
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (response, _) = server
        .call(request("GET", "/npm/@cuz/fuzz/v2/main/index.js"))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        header(&response, "location"),
        "/npm/@cuz/fuzz/2.0.0/main/index.js"
    );
}

#[tokio::test]
async fn test_map_alias_has_no_files() {
    let server = TestServer::new().await;
    let token = server.login().await;
    let (response, _) = server
        .call(common::multipart_request(
            "PUT",
            "/map/buzz/4.2.2",
            Some(&token),
            &[common::Part::file("map", "map.json", br#"{"imports":{}}"#)],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let status = server
        .set_alias("PUT", &token, "/map/buzz/v4", "4.2.2")
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);

    let (response, _) = server.call(request("GET", "/map/buzz/v4")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(header(&response, "location"), "/map/buzz/4.2.2");

    let (response, _) = server
        .call(request("GET", "/map/buzz/v4/index.js"))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
