//! Bearer-token verification capability consumed from the Auth service.
//!
//! Tokens are compact HMAC-SHA256 structures issued by the Auth
//! collaborator: `base64url(claims-json) "." base64url(tag)`. Verification
//! is local (shared secret) so no network hop sits on the request path;
//! revocation is best-effort through a read-through cache over the Auth
//! service's revocation registry.

use std::collections::HashMap;
use std::sync::RwLock;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use jiff::Timestamp;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{Role, SubjectId};

type HmacSha256 = Hmac<Sha256>;

/// Issuer-side token lifetime. The core only enforces `exp`; the constant
/// exists so tests can mint realistic tokens.
pub const TOKEN_LIFETIME_SECS: i64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: SubjectId,
    pub role: Role,
    pub jti: Uuid,
    /// Unix seconds.
    pub iat: i64,
    /// Unix seconds.
    pub exp: i64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token has been revoked")]
    Revoked,
}

/// Sign claims into the compact wire form. This mirrors what the Auth
/// service does; the core uses it only from tests and fixtures.
pub fn sign(claims: &Claims, key: &SecretBox<String>) -> String {
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(claims).expect("claims serialize to JSON"),
    );
    let mut mac = HmacSha256::new_from_slice(
        key.expose_secret().as_bytes(),
    )
    .expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{payload}.{tag}")
}

/// Verify the signature and expiry of a compact token. The tag comparison
/// is constant-time (`Mac::verify_slice`). Revocation is checked separately
/// by [`RevocationCache::is_revoked`].
pub fn verify(
    token: &str,
    key: &SecretBox<String>,
    now: Timestamp,
) -> Result<Claims, TokenError> {
    let (payload, tag) =
        token.split_once('.').ok_or(TokenError::Malformed)?;
    let tag = URL_SAFE_NO_PAD
        .decode(tag)
        .map_err(|_| TokenError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(
        key.expose_secret().as_bytes(),
    )
    .expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&tag)
        .map_err(|_| TokenError::BadSignature)?;

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&claims_bytes)
        .map_err(|_| TokenError::Malformed)?;

    if now.as_second() >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

#[derive(Deserialize)]
struct RevocationStatus {
    revoked: bool,
}

/// Read-through cache over the Auth service's revoked-token registry.
///
/// Lookups hit `GET {auth}/api/v1/internal/tokens/{jti}/revoked` and are
/// remembered for `ttl_secs`. A lookup failure is logged and treated as
/// not revoked: revocation is best-effort, while expiry and signature are
/// always enforced locally. With no Auth base URL configured (tests, local
/// dev) every lookup is a no-op.
pub struct RevocationCache {
    auth_base_url: Option<String>,
    client: reqwest::Client,
    ttl_secs: i64,
    entries: RwLock<HashMap<Uuid, (bool, Timestamp)>>,
}

impl RevocationCache {
    pub fn new(auth_base_url: Option<String>, ttl_secs: i64) -> Self {
        RevocationCache {
            auth_base_url,
            client: reqwest::Client::new(),
            ttl_secs,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn is_revoked(&self, jti: Uuid, now: Timestamp) -> bool {
        let Some(base_url) = &self.auth_base_url else {
            return false;
        };

        if let Some((revoked, fetched_at)) =
            self.entries.read().unwrap().get(&jti).copied()
            && now.as_second() - fetched_at.as_second() < self.ttl_secs
        {
            return revoked;
        }

        let url =
            format!("{base_url}/api/v1/internal/tokens/{jti}/revoked");
        let revoked = match self.lookup(&url).await {
            Ok(revoked) => revoked,
            Err(e) => {
                tracing::warn!(
                    %jti,
                    "revocation lookup failed, treating as not revoked: {e}"
                );
                false
            }
        };

        self.entries
            .write()
            .unwrap()
            .insert(jti, (revoked, now));
        revoked
    }

    async fn lookup(&self, url: &str) -> Result<bool, reqwest::Error> {
        let status: RevocationStatus = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(status.revoked)
    }
}
