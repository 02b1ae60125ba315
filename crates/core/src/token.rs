//! Bearer tokens issued at login.
//!
//! A token is `base64url(claims json) "." base64url(HMAC-SHA256(secret, payload))`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Identity carried by a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub name: String,
    pub user: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl Claims {
    /// Whether the claims have expired at `now` (epoch seconds).
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Issues and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> crate::Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| crate::Error::InvalidToken(format!("invalid signing secret: {e}")))
    }

    /// Issue a token for the given claims.
    pub fn issue(&self, claims: &Claims) -> crate::Result<String> {
        let json =
            serde_json::to_vec(claims).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str, now: i64) -> crate::Result<Claims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| crate::Error::InvalidToken("malformed token".to_string()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| crate::Error::InvalidToken("malformed signature".to_string()))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| crate::Error::InvalidToken("bad signature".to_string()))?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| crate::Error::InvalidToken("malformed payload".to_string()))?;
        let claims: Claims = serde_json::from_slice(&json)
            .map_err(|e| crate::Error::InvalidToken(format!("invalid claims: {e}")))?;

        if claims.is_expired(now) {
            return Err(crate::Error::InvalidToken("token expired".to_string()));
        }
        Ok(claims)
    }

    /// Compare a presented login key against the expected one in constant time.
    pub fn keys_match(&self, expected: &str, presented: &str) -> bool {
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(expected.as_bytes());
        let expected_tag = mac.finalize().into_bytes();

        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(presented.as_bytes());
        mac.verify_slice(&expected_tag).is_ok()
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}
