//! Privileged service-to-service surface. Only the Transactions service
//! holds the shared key; these handlers never require a bearer token.

use actix_web::{HttpResponse, get, post, web};
use rust_decimal::Decimal;
use secrecy::SecretBox;
use sqlx::PgPool;

use payloads::{
    AccountNumber, Balance, requests,
    responses::{
        self, AccountStatus, NewBalance, PinVerification, PrivilegeInfo,
    },
};

use super::ApiError;
use crate::auth::InternalCaller;
use crate::time::TimeSource;
use crate::{pin, store};

fn to_balance(d: Decimal) -> Result<Balance, ApiError> {
    Balance::from_decimal(d)
        .map_err(|e| ApiError::Unexpected(anyhow::Error::from(e)))
}

#[tracing::instrument(skip(_caller, pool))]
#[get("/accounts/{account_number}")]
pub async fn get_account(
    _caller: InternalCaller,
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let account = store::get_account(account_number, &pool).await?;
    Ok(HttpResponse::Ok().json(responses::InternalAccount {
        account_number: account.account_number,
        kind: account.kind,
        privilege: account.privilege,
        balance: to_balance(account.balance)?,
        active: account.active,
        closed: account.is_closed(),
        owner_subject: account.owner_subject,
    }))
}

#[tracing::instrument(skip(_caller, pool))]
#[get("/accounts/{account_number}/privilege")]
pub async fn get_privilege(
    _caller: InternalCaller,
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let account = store::get_account(account_number, &pool).await?;
    Ok(HttpResponse::Ok().json(PrivilegeInfo {
        privilege: account.privilege,
    }))
}

#[tracing::instrument(skip(_caller, pool))]
#[get("/accounts/{account_number}/active")]
pub async fn get_active(
    _caller: InternalCaller,
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let status: AccountStatus =
        store::account_status(account_number, &pool).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Uniform failure: an unknown account and a wrong PIN both come back as
/// `valid = false` after a hash verification against a fallback hash, so
/// neither the body nor the timing discloses existence.
#[tracing::instrument(skip(_caller, details, pool))]
#[post("/accounts/{account_number}/verify-pin")]
pub async fn verify_pin(
    _caller: InternalCaller,
    path: web::Path<i64>,
    details: web::Json<requests::VerifyPin>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let stored = store::fetch_pin_hash(account_number, &pool).await?;
    let valid = pin::verify_pin(
        stored,
        SecretBox::new(Box::new(details.into_inner().pin)),
    )
    .await?;
    Ok(HttpResponse::Ok().json(PinVerification { valid }))
}

#[tracing::instrument(skip(_caller, details, pool, time_source))]
#[post("/accounts/{account_number}/debit")]
pub async fn debit(
    _caller: InternalCaller,
    path: web::Path<i64>,
    details: web::Json<requests::BalanceChange>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let new_balance = store::balance::debit(
        account_number,
        details.amount.value(),
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(NewBalance {
        account_number,
        balance: to_balance(new_balance)?,
    }))
}

#[tracing::instrument(skip(_caller, details, pool, time_source))]
#[post("/accounts/{account_number}/credit")]
pub async fn credit(
    _caller: InternalCaller,
    path: web::Path<i64>,
    details: web::Json<requests::BalanceChange>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let new_balance = store::balance::credit(
        account_number,
        details.amount.value(),
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(NewBalance {
        account_number,
        balance: to_balance(new_balance)?,
    }))
}
