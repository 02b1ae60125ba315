//! HTTP server for the depot package registry.
//!
//! This crate provides the HTTP surface:
//! - Package, import map and alias endpoints
//! - Host-based organization resolution
//! - Login tokens and the auth middleware
//! - Cache-Control policy and conditional GETs
//! - Tarball extraction for package uploads
//! - Prometheus metrics

pub mod archive;
pub mod auth;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod tenant;

pub use auth::TraceId;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
pub use tenant::Tenant;
