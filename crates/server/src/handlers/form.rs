//! Multipart form helpers.

use crate::error::{ApiError, ApiResult};
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(format!("malformed multipart body: {}", e.body_text()))
    }
}

/// Read the first field named in `names`, failing once it exceeds `limit`
/// bytes. Other fields are skipped.
pub async fn read_field(multipart: &mut Multipart, names: &[&str], limit: u64) -> ApiResult<Bytes> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let wanted = field.name().is_some_and(|name| names.contains(&name));
        if !wanted {
            continue;
        }

        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if (buf.len() + chunk.len()) as u64 > limit {
                return Err(ApiError::PayloadTooLarge(format!(
                    "field {} exceeds {limit} bytes",
                    names[0]
                )));
            }
            buf.extend_from_slice(&chunk);
        }
        return Ok(buf.freeze());
    }
    Err(ApiError::BadRequest(format!(
        "multipart field {} is required",
        names[0]
    )))
}

/// Read a short text field such as `version` or `key`.
pub async fn read_text_field(multipart: &mut Multipart, name: &str) -> ApiResult<String> {
    const MAX_TEXT_FIELD: u64 = 4096;
    let data = read_field(multipart, &[name], MAX_TEXT_FIELD).await?;
    let text = String::from_utf8(data.to_vec())
        .map_err(|_| ApiError::BadRequest(format!("field {name} is not valid UTF-8")))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest(format!("field {name} is empty")));
    }
    Ok(text.to_string())
}
