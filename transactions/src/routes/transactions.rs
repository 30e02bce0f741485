use actix_web::{HttpResponse, get, post, web};
use sqlx::PgPool;

use payloads::{AccountNumber, InternalAccountsClient, Policy, requests};

use super::ApiError;
use crate::auth::AuthedUser;
use crate::ledger;
use crate::time::TimeSource;

#[tracing::instrument(skip_all, fields(account_number = %details.account_number))]
#[post("/deposits")]
pub async fn deposit(
    user: AuthedUser,
    details: web::Json<requests::Deposit>,
    accounts: web::Data<InternalAccountsClient>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let receipt =
        ledger::deposit(&user, &details, &accounts, &pool, &time_source)
            .await
            .map_err(ApiError::from)?;
    Ok(HttpResponse::Created().json(receipt))
}

#[tracing::instrument(skip_all, fields(account_number = %details.account_number))]
#[post("/withdrawals")]
pub async fn withdraw(
    user: AuthedUser,
    details: web::Json<requests::Withdraw>,
    accounts: web::Data<InternalAccountsClient>,
    policy: web::Data<Policy>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let receipt = ledger::withdraw(
        &user,
        &details,
        &accounts,
        &policy,
        &pool,
        &time_source,
    )
    .await
    .map_err(ApiError::from)?;
    Ok(HttpResponse::Created().json(receipt))
}

#[tracing::instrument(
    skip_all,
    fields(
        from_account = %details.from_account,
        to_account = %details.to_account,
    )
)]
#[post("/transfers")]
pub async fn transfer(
    user: AuthedUser,
    details: web::Json<requests::Transfer>,
    accounts: web::Data<InternalAccountsClient>,
    policy: web::Data<Policy>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let receipt = ledger::transfer(
        &user,
        &details,
        &accounts,
        &policy,
        &pool,
        &time_source,
    )
    .await
    .map_err(ApiError::from)?;
    Ok(HttpResponse::Created().json(receipt))
}

#[tracing::instrument(skip(user, accounts, policy, pool, time_source))]
#[get("/transfer-limits/{account_number}")]
pub async fn transfer_limits(
    user: AuthedUser,
    path: web::Path<i64>,
    accounts: web::Data<InternalAccountsClient>,
    policy: web::Data<Policy>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let limits = ledger::transfer_limits(
        &user,
        account_number,
        &accounts,
        &policy,
        &pool,
        &time_source,
    )
    .await
    .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(limits))
}

#[tracing::instrument(skip(user, accounts, pool))]
#[get("/transaction-logs/{account_number}")]
pub async fn transaction_logs(
    user: AuthedUser,
    path: web::Path<i64>,
    accounts: web::Data<InternalAccountsClient>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let entries = ledger::transaction_logs(
        &user,
        account_number,
        &accounts,
        &pool,
    )
    .await
    .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(entries))
}
