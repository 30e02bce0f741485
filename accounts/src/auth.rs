//! Request authentication: bearer-token extraction for the public surface
//! and the shared-key check for the service-to-service surface.

use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, web};
use anyhow::anyhow;
use secrecy::{ExposeSecret, SecretBox};

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
    /// ADMIN or TELLER.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Staff may touch any account; a CUSTOMER only the account whose
    /// owner subject matches their token.
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

            let token = bearer_token(&req)?;
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

            tracing::Span::current().record(
                "subject",
                tracing::field::display(&claims.sub),
            );
            Ok(AuthedUser {
                subject: claims.sub,
                role: claims.role,
            })
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| {
            ApiError::Unauthorized(anyhow!("missing Authorization header"))
        })?
        .to_str()
        .map_err(|_| {
            ApiError::Unauthorized(anyhow!(
                "Authorization header is not valid UTF-8"
            ))
        })?;
    header_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::Unauthorized(anyhow!(
            "Authorization header is not a bearer token"
        ))
    })
}

/// Shared app_data holding the S2S key for `/api/v1/internal`.
pub struct InternalKey(pub SecretBox<String>);

/// Marker extracted by internal handlers; construction proves the caller
/// presented the shared service key.
pub struct InternalCaller;

impl FromRequest for InternalCaller {
    type Error = ApiError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        std::future::ready(check_internal_key(req))
    }
}

fn check_internal_key(req: &HttpRequest) -> Result<InternalCaller, ApiError> {
    let expected = req
        .app_data::<web::Data<InternalKey>>()
        .ok_or_else(|| {
            ApiError::Unexpected(anyhow!(
                "InternalKey app_data not configured"
            ))
        })?;
    let presented = req
        .headers()
        .get(payloads::api_client::INTERNAL_API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::Unauthorized(anyhow!("missing internal API key"))
        })?;
    if presented != expected.0.expose_secret() {
        return Err(ApiError::Unauthorized(anyhow!(
            "internal API key mismatch"
        )));
    }
    Ok(InternalCaller)
}
