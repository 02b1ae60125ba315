//! Cache-Control policy and conditional requests.
//!
//! Handlers set the policy for successful responses. The middleware here
//! finalizes error responses: 404s get the configured not-found value so
//! misses are cheap to repeat, and every other error is `no-store`.

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Content at a fixed version and pathname never changes.
pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";
/// Documents that may grow or change; always revalidate.
pub const NO_CACHE: &str = "no-cache";
/// Writes, credentials and errors.
pub const NO_STORE: &str = "no-store";

/// Render an entity tag as a quoted strong validator.
pub fn quote_etag(tag: &str) -> String {
    format!("\"{tag}\"")
}

/// Whether an `If-None-Match` header value matches the given unquoted tag.
///
/// Supports `*`, comma-separated lists and weak (`W/`) validators, which
/// compare equal to strong ones for GET.
pub fn etag_matches(if_none_match: &str, tag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate.trim_matches('"') == tag
    })
}

/// Whether the request already holds the current representation.
pub fn is_not_modified(headers: &HeaderMap, tag: &str) -> bool {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| etag_matches(v, tag))
}

/// A 304 carrying the validator and caching policy of the full response.
pub fn not_modified(tag: &str, cache_control: &str) -> Response {
    (
        StatusCode::NOT_MODIFIED,
        [(ETAG, quote_etag(tag)), (CACHE_CONTROL, cache_control.to_string())],
    )
        .into_response()
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(NO_STORE))
}

/// Apply the error caching policy.
pub async fn cache_control_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        response
            .headers_mut()
            .insert(CACHE_CONTROL, header_value(&state.config.cache.not_found));
    } else if status.is_client_error() || status.is_server_error() {
        response
            .headers_mut()
            .insert(CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    }
    response
}
