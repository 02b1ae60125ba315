//! Login endpoint.

use crate::cache::NO_STORE;
use crate::error::{ApiError, ApiResult};
use crate::handlers::form::read_text_field;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::header::CACHE_CONTROL;
use axum::response::{IntoResponse, Response};
use depot_core::{Claims, Integrity};
use serde::Serialize;
use time::OffsetDateTime;

/// Response for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Identity derived from a login key. The key itself never leaves the server.
fn key_user(key: &str) -> String {
    let sri = Integrity::compute(key.as_bytes()).to_sri();
    let digest = sri.trim_start_matches("sha512-");
    format!("key:{}", &digest[..digest.len().min(12)])
}

/// POST /auth/login - Exchange the shared key for a bearer token.
pub async fn login(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Response> {
    let key = read_text_field(&mut multipart, "key").await?;
    if !state.signer.keys_match(&state.config.auth.key, &key) {
        tracing::warn!("Login rejected");
        return Err(ApiError::Unauthorized("invalid key".to_string()));
    }

    let ttl = i64::try_from(state.config.auth.token_ttl_secs).unwrap_or(i64::MAX);
    let claims = Claims {
        name: "key".to_string(),
        user: key_user(&key),
        exp: OffsetDateTime::now_utc().unix_timestamp().saturating_add(ttl),
    };
    let token = state.signer.issue(&claims)?;
    tracing::info!(user = %claims.user, "Token issued");

    Ok(([(CACHE_CONTROL, NO_STORE)], Json(LoginResponse { token })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_user_is_stable_and_opaque() {
        let user = key_user("change_me");
        assert_eq!(user, key_user("change_me"));
        assert_ne!(user, key_user("other"));
        assert!(user.starts_with("key:"));
        assert!(!user.contains("change_me"));
    }
}
