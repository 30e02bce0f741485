use actix_web::{HttpResponse, get, patch, post, put, web};
use jiff::tz::TimeZone;
use secrecy::SecretBox;
use sqlx::PgPool;

use payloads::{
    AccountNumber, Policy, Privilege, requests,
    responses::{self, PinVerification},
};

use super::ApiError;
use crate::auth::AuthedUser;
use crate::time::TimeSource;
use crate::{pin, store, validation};

#[tracing::instrument(skip(user, details, pool, time_source, policy), fields(holder_name = %details.holder_name))]
#[post("/accounts/savings")]
pub async fn create_savings(
    user: AuthedUser,
    details: web::Json<requests::CreateSavingsAccount>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    policy: web::Data<Policy>,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;
    let details = details.into_inner();

    validation::validate_holder_name(&details.holder_name)?;
    let today = time_source.now().to_zoned(TimeZone::UTC).date();
    validation::validate_age(details.date_of_birth, today)?;
    validation::validate_phone(&details.phone_number, &policy)?;
    pin::validate_pin_shape(&details.pin, &policy)?;
    let privilege = details.privilege.unwrap_or(Privilege::Silver);

    let pin_hash =
        pin::hash_pin(SecretBox::new(Box::new(details.pin.clone())))
            .await?;
    let account_number = store::create_savings(
        &details,
        pin_hash,
        privilege,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Created()
        .json(responses::AccountCreated { account_number }))
}

#[tracing::instrument(skip(user, details, pool, time_source, policy), fields(holder_name = %details.holder_name))]
#[post("/accounts/current")]
pub async fn create_current(
    user: AuthedUser,
    details: web::Json<requests::CreateCurrentAccount>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
    policy: web::Data<Policy>,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;
    let details = details.into_inner();

    validation::validate_holder_name(&details.holder_name)?;
    validation::validate_company_name(&details.company_name)?;
    validation::validate_registration_number(
        &details.registration_number,
    )?;
    if let Some(website) = &details.website {
        validation::validate_website(website)?;
    }
    pin::validate_pin_shape(&details.pin, &policy)?;
    let privilege = details.privilege.unwrap_or(Privilege::Silver);

    let pin_hash =
        pin::hash_pin(SecretBox::new(Box::new(details.pin.clone())))
            .await?;
    let account_number = store::create_current(
        &details,
        pin_hash,
        privilege,
        &pool,
        &time_source,
    )
    .await?;

    Ok(HttpResponse::Created()
        .json(responses::AccountCreated { account_number }))
}

#[tracing::instrument(skip(user, pool))]
#[get("/accounts/{account_number}")]
pub async fn get_account(
    user: AuthedUser,
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let (account, details) =
        store::get_account_with_details(account_number, &pool).await?;
    user.authorize_account(account.owner_subject)?;
    Ok(HttpResponse::Ok().json(account.into_response(details)?))
}

#[tracing::instrument(skip(user, details, pool, time_source))]
#[patch("/accounts/{account_number}")]
pub async fn update_account(
    user: AuthedUser,
    path: web::Path<i64>,
    details: web::Json<requests::UpdateAccount>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;
    let account_number = AccountNumber(path.into_inner());
    if let Some(holder_name) = &details.holder_name {
        validation::validate_holder_name(holder_name)?;
    }

    store::update_account(account_number, &details, &pool, &time_source)
        .await?;
    let (account, kind_details) =
        store::get_account_with_details(account_number, &pool).await?;
    Ok(HttpResponse::Ok().json(account.into_response(kind_details)?))
}

#[tracing::instrument(skip(user, pool, time_source))]
#[put("/accounts/{account_number}/activate")]
pub async fn activate_account(
    user: AuthedUser,
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let account_number = AccountNumber(path.into_inner());
    store::transition_account(
        account_number,
        store::Transition::Activate,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool, time_source))]
#[put("/accounts/{account_number}/inactivate")]
pub async fn inactivate_account(
    user: AuthedUser,
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let account_number = AccountNumber(path.into_inner());
    store::transition_account(
        account_number,
        store::Transition::Inactivate,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(skip(user, pool, time_source))]
#[post("/accounts/{account_number}/close")]
pub async fn close_account(
    user: AuthedUser,
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, ApiError> {
    user.require_admin()?;
    let account_number = AccountNumber(path.into_inner());
    store::transition_account(
        account_number,
        store::Transition::Close,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Public PIN verification: reports validity, it does not gate on account
/// state. Spending operations re-check state at debit time.
#[tracing::instrument(skip(user, details, pool))]
#[post("/accounts/{account_number}/verify-pin")]
pub async fn verify_pin(
    user: AuthedUser,
    path: web::Path<i64>,
    details: web::Json<requests::VerifyPin>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    let account_number = AccountNumber(path.into_inner());
    let account = store::get_account(account_number, &pool).await?;
    user.authorize_account(account.owner_subject)?;

    let valid = pin::verify_pin(
        Some(account.pin_hash),
        SecretBox::new(Box::new(details.into_inner().pin)),
    )
    .await?;
    Ok(HttpResponse::Ok().json(PinVerification { valid }))
}
