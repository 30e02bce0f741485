pub mod accounts;
pub mod internal;

use actix_web::http::StatusCode;
use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};

use payloads::responses::ErrorBody;

use crate::pin::PinShapeError;
use crate::store::StoreError;
use crate::validation::FieldError;

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api/v1")
        .service(health_check)
        .service(accounts::create_savings)
        .service(accounts::create_current)
        .service(accounts::get_account)
        .service(accounts::update_account)
        .service(accounts::activate_account)
        .service(accounts::inactivate_account)
        .service(accounts::close_account)
        .service(accounts::verify_pin)
        .service(
            web::scope("/internal")
                .service(internal::get_account)
                .service(internal::get_privilege)
                .service(internal::get_active)
                .service(internal::verify_pin)
                .service(internal::debit)
                .service(internal::credit),
        )
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
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        if let ApiError::Unexpected(e) = self {
            crate::telemetry::log_error(e);
        }
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error_code: self.error_code().to_string(),
            message: self.to_string(),
        })
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let message = e.to_string();
        match e {
            StoreError::AccountNotFound => ApiError::NotFound,
            StoreError::AccountClosed => ApiError::Conflict {
                code: "AccountClosed",
                message,
            },
            StoreError::AccountInactive => ApiError::Conflict {
                code: "AccountInactive",
                message,
            },
            StoreError::AlreadyActive => ApiError::Conflict {
                code: "AlreadyActive",
                message,
            },
            StoreError::AlreadyInactive => ApiError::Conflict {
                code: "AlreadyInactive",
                message,
            },
            StoreError::InsufficientFunds => ApiError::Conflict {
                code: "InsufficientFunds",
                message,
            },
            StoreError::BalanceOverflow => ApiError::Conflict {
                code: "BalanceOverflow",
                message,
            },
            StoreError::DuplicateHolder
            | StoreError::DuplicateRegistration
            | StoreError::NotUnique(_) => ApiError::Conflict {
                code: "Duplicate",
                message,
            },
            StoreError::NothingToUpdate => ApiError::Validation {
                code: "ValidationFailed",
                message,
            },
            StoreError::Database(_) => ApiError::Unexpected(e.into()),
            StoreError::UnexpectedError(e) => ApiError::Unexpected(e),
        }
    }
}

impl From<FieldError> for ApiError {
    fn from(e: FieldError) -> Self {
        let code = match e {
            FieldError::AgeRestriction => "AgeRestriction",
            FieldError::BadPhone { .. } => "InvalidPhone",
            FieldError::BadWebsite => "InvalidWebsite",
            FieldError::BadHolderName { .. }
            | FieldError::BadRegistrationNumber
            | FieldError::BadCompanyName => "ValidationFailed",
        };
        ApiError::Validation {
            code,
            message: e.to_string(),
        }
    }
}

impl From<PinShapeError> for ApiError {
    fn from(e: PinShapeError) -> Self {
        ApiError::Validation {
            code: "InvalidPin",
            message: e.to_string(),
        }
    }
}
