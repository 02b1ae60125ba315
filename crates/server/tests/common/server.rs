//! Server test utilities.

use crate::common::fixtures::{Part, multipart_body, multipart_content_type};
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use bytes::Bytes;
use depot_core::config::AppConfig;
use depot_server::{AppState, create_router};
use depot_storage::testing::ScriptedSink;
use depot_storage::{FilesystemSink, Sink};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Host that maps to the default `local` organization.
pub const HOST: &str = "localhost";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    /// The scripted sink, when the server runs on one.
    pub sink: Option<ScriptedSink>,
    _temp_dir: Option<TempDir>,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a test server over a scripted in-memory sink.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let sink = ScriptedSink::new();
        let state = AppState::new(config, Arc::new(sink.clone()))
            .expect("Failed to create app state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            sink: Some(sink),
            _temp_dir: None,
        }
    }

    /// Create a test server over a filesystem sink in a temporary directory.
    pub async fn filesystem() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let sink: Arc<dyn Sink> = Arc::new(
            FilesystemSink::new(temp_dir.path().join("storage"))
                .await
                .expect("Failed to create filesystem sink"),
        );
        let state =
            AppState::new(AppConfig::for_testing(), sink).expect("Failed to create app state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            sink: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// The scripted sink behind this server.
    pub fn scripted(&self) -> &ScriptedSink {
        self.sink.as_ref().expect("server does not run on a scripted sink")
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Send a request and collect the body.
    pub async fn call(&self, request: Request<Body>) -> (Response<()>, Bytes) {
        let response = self.send(request).await;
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("Failed to read body");
        (Response::from_parts(parts, ()), bytes)
    }

    /// Log in with the configured key and return the bearer token.
    pub async fn login(&self) -> String {
        let key = self.state.config.auth.key.clone();
        let (response, body) = self
            .call(multipart_request(
                "POST",
                "/auth/login",
                None,
                &[Part::text("key", &key)],
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("login body is JSON");
        json["token"]
            .as_str()
            .expect("login body has a token")
            .to_string()
    }

    /// Publish a package tarball and assert it committed.
    pub async fn publish(&self, token: &str, url: &str, tarball: &[u8]) {
        let (response, _) = self
            .call(multipart_request(
                "PUT",
                url,
                Some(token),
                &[Part::file("package", "package.tgz", tarball)],
            ))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "publish of {url} failed");
    }

    /// Create or update an alias through the API.
    pub async fn set_alias(&self, method: &str, token: &str, url: &str, version: &str) -> StatusCode {
        let (response, _) = self
            .call(multipart_request(
                method,
                url,
                Some(token),
                &[Part::text("version", version)],
            ))
            .await;
        response.status()
    }
}

/// A bodiless request addressed to [`HOST`].
#[allow(dead_code)]
pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", HOST)
        .body(Body::empty())
        .expect("valid request")
}

/// A bodiless request with a bearer token.
#[allow(dead_code)]
pub fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("host", HOST)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("valid request")
}

/// A multipart request, optionally authenticated.
#[allow(dead_code)]
pub fn multipart_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", HOST)
        .header("content-type", multipart_content_type());
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(multipart_body(parts)))
        .expect("valid request")
}

/// Header value as a string, or "" when absent.
#[allow(dead_code)]
pub fn header<'a, T>(response: &'a Response<T>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
