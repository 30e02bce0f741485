pub mod transactions;

use actix_web::http::StatusCode;
use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};

use payloads::responses::ErrorBody;

use crate::ledger::LedgerError;

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api/v1")
        .service(health_check)
        .service(transactions::deposit)
        .service(transactions::withdraw)
        .service(transactions::transfer)
        .service(transactions::transfer_limits)
        .service(transactions::transaction_logs)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication failed")]
    Unauthorized(#[source] anyhow::Error),
    #[error("Insufficient role for this operation")]
    Forbidden,
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },
    #[error("Account not found")]
    NotFound,
    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
    },
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Accounts service unavailable")]
    ServiceUnavailable(#[source] anyhow::Error),
    #[error("Something went wrong")]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    fn error_code(&self) -> &str {
        match self {
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden => "Forbidden",
            ApiError::Validation { code, .. } => code,
            ApiError::NotFound => "NotFound",
            ApiError::Conflict { code, .. } => code,
            ApiError::InvalidPin => "InvalidPin",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
            ApiError::Unexpected(_) => "StorageFailure",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) | ApiError::InvalidPin => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            ApiError::Unexpected(e) => crate::telemetry::log_error(e),
            ApiError::ServiceUnavailable(e) => tracing::warn!("{e:#}"),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error_code: self.error_code().to_string(),
            message: self.to_string(),
        })
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        let message = e.to_string();
        match e {
            LedgerError::AccountNotFound => ApiError::NotFound,
            LedgerError::AccountInactive => ApiError::Conflict {
                code: "AccountInactive",
                message,
            },
            LedgerError::AccountClosed => ApiError::Conflict {
                code: "AccountClosed",
                message,
            },
            LedgerError::InsufficientFunds => ApiError::Conflict {
                code: "InsufficientFunds",
                message,
            },
            LedgerError::BalanceOverflow => ApiError::Conflict {
                code: "BalanceOverflow",
                message,
            },
            LedgerError::SameAccount => ApiError::Conflict {
                code: "SameAccount",
                message,
            },
            LedgerError::DailyLimitExceeded { .. } => ApiError::Conflict {
                code: "DailyLimitExceeded",
                message,
            },
            LedgerError::DailyCountExceeded { .. } => ApiError::Conflict {
                code: "DailyCountExceeded",
                message,
            },
            LedgerError::InvalidPin => ApiError::InvalidPin,
            LedgerError::DepositTooLarge => ApiError::Validation {
                code: "InvalidAmount",
                message,
            },
            LedgerError::Forbidden => ApiError::Forbidden,
            LedgerError::Dependency(e) => ApiError::ServiceUnavailable(e),
            LedgerError::Store(e) => ApiError::Unexpected(e.into()),
            LedgerError::Unexpected(e) => ApiError::Unexpected(e),
        }
    }
}
