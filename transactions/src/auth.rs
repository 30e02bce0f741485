//! Bearer-token authentication for the Transactions surface.
//!
//! Verification is local HMAC against the shared signing key; revocation
//! is the best-effort read-through cache in `payloads::token`. Account
//! ownership (the CUSTOMER-of-account rule) is checked per operation in
//! the ledger, since the owning subject lives in the Accounts service.

use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, web};
use anyhow::anyhow;
use secrecy::SecretBox;

use payloads::token::{RevocationCache, TokenError, verify};
use payloads::{Role, SubjectId};

use crate::routes::ApiError;
use crate::time::TimeSource;

type LocalBoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Shared app_data holding the token-verification capability consumed from
/// the Auth service.
pub struct TokenVerifier {
    pub signing_key: SecretBox<String>,
    pub revocations: RevocationCache,
}

/// The verified caller of a public endpoint.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub subject: SubjectId,
    pub role: Role,
}

impl AuthedUser {
    /// Staff may move money on any account; a CUSTOMER only where their
    /// token subject owns the account.
    pub fn authorize_account(
        &self,
        owner_subject: Option<SubjectId>,
    ) -> Result<(), ApiError> {
        if self.role.is_staff() || owner_subject == Some(self.subject) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

impl FromRequest for AuthedUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let verifier = req
                .app_data::<web::Data<TokenVerifier>>()
                .ok_or_else(|| {
                    ApiError::Unexpected(anyhow!(
                        "TokenVerifier app_data not configured"
                    ))
                })?;
            let time_source = req
                .app_data::<web::Data<TimeSource>>()
                .ok_or_else(|| {
                    ApiError::Unexpected(anyhow!(
                        "TimeSource app_data not configured"
                    ))
                })?;

            let header_value = req
                .headers()
                .get(header::AUTHORIZATION)
                .ok_or_else(|| {
                    ApiError::Unauthorized(anyhow!(
                        "missing Authorization header"
                    ))
                })?
                .to_str()
                .map_err(|_| {
                    ApiError::Unauthorized(anyhow!(
                        "Authorization header is not valid UTF-8"
                    ))
                })?;
            let token =
                header_value.strip_prefix("Bearer ").ok_or_else(|| {
                    ApiError::Unauthorized(anyhow!(
                        "Authorization header is not a bearer token"
                    ))
                })?;

            let now = time_source.now();
            let claims = verify(token, &verifier.signing_key, now)
                .map_err(|e| match e {
                    TokenError::Expired => ApiError::Unauthorized(
                        anyhow!("token has expired"),
                    ),
                    _ => ApiError::Unauthorized(anyhow!(
                        "token verification failed"
                    )),
                })?;

            if verifier.revocations.is_revoked(claims.jti, now).await {
                return Err(ApiError::Unauthorized(anyhow!(
                    "token has been revoked"
                )));
            }

            Ok(AuthedUser {
                subject: claims.sub,
                role: claims.role,
            })
        })
    }
}
