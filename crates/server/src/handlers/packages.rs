//! Package, import map and alias endpoints.
//!
//! All registry paths share one route per method: `/{type}/{*path}`. The
//! request path is parsed into a coordinate plus a target (listing, version
//! or alias) and dispatched from there.

use crate::archive::extract_tarball;
use crate::auth::RequireAuth;
use crate::cache::{IMMUTABLE, NO_CACHE, NO_STORE, is_not_modified, not_modified, quote_etag};
use crate::error::{ApiError, ApiResult};
use crate::handlers::form::{read_field, read_text_field};
use crate::metrics::record_upload;
use crate::state::AppState;
use crate::tenant::Tenant;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LOCATION};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use depot_core::path::parse_request_path;
use depot_core::{AliasMode, Coordinate, Integrity, PackageType, RequestPath, Target};
use depot_registry::FileContent;
use futures::TryStreamExt;

const JSON: &str = "application/json";

/// A JSON document response with a validator.
fn document(headers: &HeaderMap, body: Vec<u8>, etag: &str, cache_control: &str) -> Response {
    if is_not_modified(headers, etag) {
        return not_modified(etag, cache_control);
    }
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, JSON.to_string()),
            (ETAG, quote_etag(etag)),
            (CACHE_CONTROL, cache_control.to_string()),
        ],
        body,
    )
        .into_response()
}

/// Stream a file out of the sink.
fn serve_file(headers: &HeaderMap, file: FileContent, cache_control: &str) -> Response {
    if is_not_modified(headers, &file.etag) {
        return not_modified(&file.etag, cache_control);
    }
    let body = Body::from_stream(
        file.stream
            .map_err(|e| std::io::Error::other(e.to_string())),
    );
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, file.mime_type),
            (CONTENT_LENGTH, file.size.to_string()),
            (ETAG, quote_etag(&file.etag)),
            (CACHE_CONTROL, cache_control.to_string()),
        ],
        body,
    )
        .into_response()
}

/// A redirect that must not be cached, answering a write.
fn see_other(location: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(LOCATION, location.to_string()), (CACHE_CONTROL, NO_STORE.to_string())],
    )
        .into_response()
}

fn parse(uri: &Uri) -> ApiResult<RequestPath> {
    Ok(parse_request_path(uri.path())?)
}

/// GET /{type}/{*path}
pub async fn get_entry(
    State(state): State<AppState>,
    Tenant(org): Tenant,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let RequestPath {
        coordinate,
        target,
        extras,
    } = parse(&uri)?;
    let registry = &state.registry;

    match target {
        Target::Listing => {
            let versions = registry.get_versions(&org, &coordinate).await?;
            let body = versions.to_json()?;
            let etag = Integrity::compute(&body).to_sri();
            Ok(document(&headers, body, &etag, NO_CACHE))
        }
        Target::Version(version) => match (coordinate.kind(), extras) {
            (PackageType::Map, None) => {
                let map = registry.get_map(&org, &coordinate, &version).await?;
                Ok(document(&headers, map.body.to_vec(), &map.etag, IMMUTABLE))
            }
            (PackageType::Map, Some(_)) => Err(ApiError::NotFound("Not found".to_string())),
            (_, None) => {
                let manifest = registry.get_manifest(&org, &coordinate, &version).await?;
                let etag = manifest.integrity.to_sri();
                Ok(document(&headers, manifest.to_json()?, &etag, NO_CACHE))
            }
            (_, Some(subpath)) => {
                let file = registry
                    .get_file(&org, &coordinate, &version, &subpath)
                    .await?;
                Ok(serve_file(&headers, file, IMMUTABLE))
            }
        },
        Target::Alias { key, mode } => {
            let resolution = registry
                .resolve_alias(&org, &coordinate, &key, extras.as_deref())
                .await?;

            match (mode, &resolution.subpath) {
                (AliasMode::StaleWhileRevalidate, Some(subpath)) => {
                    let file = registry
                        .get_file(&org, &coordinate, &resolution.alias.version, subpath)
                        .await?;
                    Ok(serve_file(
                        &headers,
                        file,
                        &state.config.cache.stale_while_revalidate,
                    ))
                }
                (_, subpath) => {
                    let status = if subpath.is_some() {
                        StatusCode::FOUND
                    } else {
                        StatusCode::SEE_OTHER
                    };
                    Ok((
                        status,
                        [
                            (LOCATION, resolution.location),
                            (CACHE_CONTROL, state.config.cache.alias.clone()),
                        ],
                    )
                        .into_response())
                }
            }
        }
    }
}

/// Read the upload body of a version publish.
async fn publish(
    state: &AppState,
    org: &str,
    coordinate: &Coordinate,
    version: &str,
    auth: &RequireAuth,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let kind = coordinate.kind();
    let limit = state.registry.limits().max_file_size(kind);

    let published = if kind == PackageType::Map {
        let body: Bytes = read_field(&mut multipart, &["map"], limit).await?;
        record_upload(kind.as_str(), body.len());
        state
            .registry
            .put_map(org, coordinate, version, body)
            .await?
    } else {
        let tarball = read_field(&mut multipart, &["package", "filedata"], limit).await?;
        record_upload(kind.as_str(), tarball.len());
        let files = extract_tarball(tarball, limit).await?;
        state
            .registry
            .put_package(org, coordinate, version, files, Some(auth.0.author()))
            .await?
    };

    tracing::info!(
        org = %org,
        coordinate = %coordinate,
        version = %version,
        integrity = %published.integrity,
        "Version published"
    );
    Ok(see_other(&published.location))
}

/// PUT /{type}/{*path}
///
/// Publishes a version, or creates an alias.
pub async fn put_entry(
    State(state): State<AppState>,
    Tenant(org): Tenant,
    auth: RequireAuth,
    uri: Uri,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let RequestPath {
        coordinate,
        target,
        extras,
    } = parse(&uri)?;
    if extras.is_some() {
        return Err(ApiError::BadRequest(
            "uploads address a version or alias, not a file".to_string(),
        ));
    }

    match target {
        Target::Version(version) => {
            publish(&state, &org, &coordinate, &version, &auth, multipart).await
        }
        Target::Alias { key, .. } => {
            let version = read_text_field(&mut multipart, "version").await?;
            let alias = state
                .registry
                .create_alias(&org, &coordinate, &key, &version, Some(auth.0.author()))
                .await?;
            tracing::info!(coordinate = %coordinate, alias = %key, version = %alias.version, "Alias created");
            Ok(see_other(&coordinate.alias_url(&key)))
        }
        Target::Listing => Err(ApiError::BadRequest(
            "a version or alias is required".to_string(),
        )),
    }
}

/// Alias key of a request path that must address an alias and nothing below it.
fn alias_key(path: RequestPath) -> ApiResult<(Coordinate, String)> {
    match (path.target, path.extras) {
        (Target::Alias { key, .. }, None) => Ok((path.coordinate, key)),
        _ => Err(ApiError::BadRequest(
            "only aliases can be updated or deleted".to_string(),
        )),
    }
}

/// POST /{type}/{*path}
///
/// Points an existing alias at another version.
pub async fn post_entry(
    State(state): State<AppState>,
    Tenant(org): Tenant,
    auth: RequireAuth,
    uri: Uri,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let (coordinate, key) = alias_key(parse(&uri)?)?;
    let version = read_text_field(&mut multipart, "version").await?;
    let alias = state
        .registry
        .update_alias(&org, &coordinate, &key, &version, Some(auth.0.author()))
        .await?;
    tracing::info!(coordinate = %coordinate, alias = %key, version = %alias.version, "Alias updated");
    Ok(see_other(&coordinate.alias_url(&key)))
}

/// DELETE /{type}/{*path}
///
/// Deletes an alias. Deleting an absent alias also answers 204.
pub async fn delete_entry(
    State(state): State<AppState>,
    Tenant(org): Tenant,
    _auth: RequireAuth,
    uri: Uri,
) -> ApiResult<Response> {
    let (coordinate, key) = alias_key(parse(&uri)?)?;
    let removed = state.registry.delete_alias(&org, &coordinate, &key).await?;
    tracing::info!(coordinate = %coordinate, alias = %key, removed, "Alias deleted");
    Ok((StatusCode::NO_CONTENT, [(CACHE_CONTROL, NO_STORE)]).into_response())
}
