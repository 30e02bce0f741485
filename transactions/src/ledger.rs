//! Money-movement orchestration over the privileged Accounts RPC.
//!
//! The service holds no balances. Every operation composes internal
//! Accounts calls with journal writes:
//!
//! - the debit always precedes the credit, so money is never materialized
//!   out of thin air;
//! - journal rows are written only after the balance change committed, so
//!   a failed debit consumes no daily limit;
//! - a transfer whose credit fails after the debit committed gets exactly
//!   one compensating credit; if that also fails the journal carries a
//!   reconciliation marker and operators take over. No retry loops.

use anyhow::anyhow;
use rust_decimal::Decimal;
use sqlx::PgPool;

use payloads::{
    AccountNumber, ClientError, InternalAccountsClient, MAX_DEPOSIT,
    Policy, SubjectId, requests,
    responses::{self, AccountStatus},
};

use crate::auth::AuthedUser;
use crate::limits::{self, LimitViolation};
use crate::store::{self, StoreError};
use crate::time::TimeSource;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Account not found")]
    AccountNotFound,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Account is closed")]
    AccountClosed,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Balance would exceed the representable maximum")]
    BalanceOverflow,
    #[error("Invalid PIN")]
    InvalidPin,
    #[error("Source and destination accounts must differ")]
    SameAccount,
    #[error("Deposit exceeds the single-operation maximum")]
    DepositTooLarge,
    #[error("Daily amount limit exceeded (cap {cap})")]
    DailyLimitExceeded { cap: Decimal },
    #[error("Daily operation count exceeded (cap {cap})")]
    DailyCountExceeded { cap: i64 },
    #[error("Caller may not operate on this account")]
    Forbidden,
    #[error("Accounts service unavailable")]
    Dependency(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Unexpected error")]
    Unexpected(#[from] anyhow::Error),
}

impl From<LimitViolation> for LedgerError {
    fn from(v: LimitViolation) -> Self {
        match v {
            LimitViolation::Amount { cap } => {
                LedgerError::DailyLimitExceeded { cap }
            }
            LimitViolation::Count { cap } => {
                LedgerError::DailyCountExceeded { cap }
            }
        }
    }
}

/// Translate an internal Accounts RPC failure. Business rejections pass
/// through under their own name; transport failures, timeouts, and 5xx
/// become dependency errors (503 to the caller).
fn map_rpc(e: ClientError) -> LedgerError {
    match e {
        ClientError::Api {
            status,
            code,
            message,
        } => match code.as_str() {
            "NotFound" => LedgerError::AccountNotFound,
            "AccountInactive" => LedgerError::AccountInactive,
            "AccountClosed" => LedgerError::AccountClosed,
            "InsufficientFunds" => LedgerError::InsufficientFunds,
            "BalanceOverflow" => LedgerError::BalanceOverflow,
            _ => LedgerError::Dependency(anyhow!(
                "accounts service returned {status}: {code}: {message}"
            )),
        },
        ClientError::Network(e) => LedgerError::Dependency(
            anyhow::Error::from(e).context("accounts RPC failed"),
        ),
    }
}

fn authorize(
    user: &AuthedUser,
    owner_subject: Option<SubjectId>,
) -> Result<(), LedgerError> {
    if user.role.is_staff() || owner_subject == Some(user.subject) {
        Ok(())
    } else {
        Err(LedgerError::Forbidden)
    }
}

fn ensure_open(status: AccountStatus) -> Result<(), LedgerError> {
    if !status.exists {
        return Err(LedgerError::AccountNotFound);
    }
    if status.closed {
        return Err(LedgerError::AccountClosed);
    }
    if !status.active {
        return Err(LedgerError::AccountInactive);
    }
    Ok(())
}

async fn check_daily_limits(
    account_number: AccountNumber,
    privilege: payloads::Privilege,
    amount: Decimal,
    policy: &Policy,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), LedgerError> {
    let (day_start, day_end) = limits::utc_day_bounds(time_source.now());
    let used =
        store::daily_usage(account_number, day_start, day_end, pool)
            .await?;
    let limit = policy.limit_for(privilege);
    limits::admit(&used, amount, &limit)?;
    Ok(())
}

/// Deposit: uncapped by privilege, bounded by the single-operation
/// maximum and the balance ceiling.
#[tracing::instrument(skip(user, details, accounts, pool, time_source))]
pub async fn deposit(
    user: &AuthedUser,
    details: &requests::Deposit,
    accounts: &InternalAccountsClient,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::TransactionReceipt, LedgerError> {
    if details.amount.value() > *MAX_DEPOSIT {
        return Err(LedgerError::DepositTooLarge);
    }
    let account = accounts
        .get_account(details.account_number)
        .await
        .map_err(map_rpc)?;
    authorize(user, account.owner_subject)?;

    let new_balance = accounts
        .credit(details.account_number, details.amount)
        .await
        .map_err(map_rpc)?;

    let at = time_source.now();
    let transfer_id = store::record_deposit(
        details.account_number,
        details.amount.value(),
        at,
        pool,
    )
    .await?;

    tracing::info!(
        account_number = %details.account_number,
        amount = %details.amount,
        "deposit committed"
    );
    Ok(responses::TransactionReceipt {
        transfer_id,
        account_number: details.account_number,
        amount: details.amount,
        kind: payloads::EntryKind::Deposit,
        balance: new_balance.balance,
        at,
    })
}

/// Withdrawal: PIN-gated and counted against the daily caps. The journal
/// row lands only after the debit committed, so a failed debit consumes
/// nothing.
#[tracing::instrument(skip(user, details, accounts, policy, pool, time_source))]
pub async fn withdraw(
    user: &AuthedUser,
    details: &requests::Withdraw,
    accounts: &InternalAccountsClient,
    policy: &Policy,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::TransactionReceipt, LedgerError> {
    let account = accounts
        .get_account(details.account_number)
        .await
        .map_err(map_rpc)?;
    authorize(user, account.owner_subject)?;

    let verification = accounts
        .verify_pin(
            details.account_number,
            &requests::VerifyPin {
                pin: details.pin.clone(),
            },
        )
        .await
        .map_err(map_rpc)?;
    if !verification.valid {
        return Err(LedgerError::InvalidPin);
    }

    check_daily_limits(
        details.account_number,
        account.privilege,
        details.amount.value(),
        policy,
        pool,
        time_source,
    )
    .await?;

    let new_balance = accounts
        .debit(details.account_number, details.amount)
        .await
        .map_err(map_rpc)?;

    let at = time_source.now();
    let transfer_id = store::record_withdrawal(
        details.account_number,
        details.amount.value(),
        at,
        pool,
    )
    .await?;

    tracing::info!(
        account_number = %details.account_number,
        amount = %details.amount,
        "withdrawal committed"
    );
    Ok(responses::TransactionReceipt {
        transfer_id,
        account_number: details.account_number,
        amount: details.amount,
        kind: payloads::EntryKind::Withdraw,
        balance: new_balance.balance,
        at,
    })
}

/// Transfer: debit the source, credit the destination, journal one
/// fund_transfers row and two entries sharing a timestamp.
///
/// True cross-service atomicity is not claimed. A credit failure after the
/// committed debit triggers one compensating credit on the generous
/// deadline; if that fails too, the journal gets a `needs_reconciliation`
/// marker and the caller sees 503.
#[tracing::instrument(skip(user, details, accounts, policy, pool, time_source))]
pub async fn transfer(
    user: &AuthedUser,
    details: &requests::Transfer,
    accounts: &InternalAccountsClient,
    policy: &Policy,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::TransferReceipt, LedgerError> {
    if details.from_account == details.to_account {
        return Err(LedgerError::SameAccount);
    }

    let source = accounts
        .get_account(details.from_account)
        .await
        .map_err(map_rpc)?;
    authorize(user, source.owner_subject)?;

    let verification = accounts
        .verify_pin(
            details.from_account,
            &requests::VerifyPin {
                pin: details.pin.clone(),
            },
        )
        .await
        .map_err(map_rpc)?;
    if !verification.valid {
        return Err(LedgerError::InvalidPin);
    }

    // Both parties must be open and active before any money moves.
    let source_status = accounts
        .get_active(details.from_account)
        .await
        .map_err(map_rpc)?;
    ensure_open(source_status)?;
    let destination_status = accounts
        .get_active(details.to_account)
        .await
        .map_err(map_rpc)?;
    ensure_open(destination_status)?;

    // Privilege is read fresh at admission time, never cached.
    let privilege = accounts
        .get_privilege(details.from_account)
        .await
        .map_err(map_rpc)?
        .privilege;
    check_daily_limits(
        details.from_account,
        privilege,
        details.amount.value(),
        policy,
        pool,
        time_source,
    )
    .await?;

    accounts
        .debit(details.from_account, details.amount)
        .await
        .map_err(map_rpc)?;

    if let Err(credit_error) =
        accounts.credit(details.to_account, details.amount).await
    {
        return Err(compensate(
            details,
            credit_error,
            accounts,
            pool,
            time_source,
        )
        .await);
    }

    let at = time_source.now();
    let transfer_id = store::record_transfer(
        details.from_account,
        details.to_account,
        details.amount.value(),
        details.mode,
        at,
        pool,
    )
    .await?;

    tracing::info!(
        from_account = %details.from_account,
        to_account = %details.to_account,
        amount = %details.amount,
        mode = %details.mode,
        "transfer committed"
    );
    Ok(responses::TransferReceipt {
        transfer_id,
        from_account: details.from_account,
        to_account: details.to_account,
        amount: details.amount,
        mode: details.mode,
        at,
    })
}

/// The credit failed after the debit committed: put the money back with a
/// single compensating credit. On success the caller sees the original
/// credit failure; on failure the journal records the money-missing state.
async fn compensate(
    details: &requests::Transfer,
    credit_error: ClientError,
    accounts: &InternalAccountsClient,
    pool: &PgPool,
    time_source: &TimeSource,
) -> LedgerError {
    tracing::warn!(
        from_account = %details.from_account,
        to_account = %details.to_account,
        amount = %details.amount,
        "transfer credit failed after debit, attempting compensation: \
         {credit_error}"
    );

    match accounts
        .credit_compensation(details.from_account, details.amount)
        .await
    {
        Ok(_) => {
            tracing::info!(
                from_account = %details.from_account,
                "compensating credit restored the source balance"
            );
            map_rpc(credit_error)
        }
        Err(compensation_error) => {
            let at = time_source.now();
            tracing::error!(
                from_account = %details.from_account,
                to_account = %details.to_account,
                amount = %details.amount,
                "TRANSFER NEEDS RECONCILIATION: debit committed, credit \
                 and compensating credit both failed: {compensation_error}"
            );
            if let Err(journal_error) = store::record_needs_reconciliation(
                details.from_account,
                details.to_account,
                details.amount.value(),
                at,
                pool,
            )
            .await
            {
                tracing::error!(
                    "failed to journal the reconciliation marker: \
                     {journal_error}"
                );
            }
            LedgerError::Dependency(anyhow!(
                "transfer credit and compensating credit both failed"
            ))
        }
    }
}

/// Daily-limit snapshot for the query endpoint.
#[tracing::instrument(skip(user, accounts, policy, pool, time_source))]
pub async fn transfer_limits(
    user: &AuthedUser,
    account_number: AccountNumber,
    accounts: &InternalAccountsClient,
    policy: &Policy,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::TransferLimits, LedgerError> {
    let account = accounts
        .get_account(account_number)
        .await
        .map_err(map_rpc)?;
    authorize(user, account.owner_subject)?;

    let (day_start, day_end) = limits::utc_day_bounds(time_source.now());
    let used =
        store::daily_usage(account_number, day_start, day_end, pool)
            .await?;
    let limit = policy.limit_for(account.privilege);

    let remaining_amount = (limit.daily_amount_cap - used.amount)
        .max(Decimal::ZERO);
    let remaining_count =
        (limit.daily_count_cap - used.count).max(0);

    let to_balance = |d: Decimal| {
        payloads::Balance::from_decimal(d)
            .map_err(|e| LedgerError::Unexpected(anyhow::Error::from(e)))
    };
    Ok(responses::TransferLimits {
        account_number,
        privilege: account.privilege,
        cap_amount: to_balance(limit.daily_amount_cap)?,
        cap_count: limit.daily_count_cap,
        used_amount: to_balance(used.amount)?,
        used_count: used.count,
        remaining_amount: to_balance(remaining_amount)?,
        remaining_count,
    })
}

/// Entry log for an account, gated like any other account read.
#[tracing::instrument(skip(user, accounts, pool))]
pub async fn transaction_logs(
    user: &AuthedUser,
    account_number: AccountNumber,
    accounts: &InternalAccountsClient,
    pool: &PgPool,
) -> Result<Vec<responses::TransactionEntry>, LedgerError> {
    let account = accounts
        .get_account(account_number)
        .await
        .map_err(map_rpc)?;
    authorize(user, account.owner_subject)?;
    Ok(store::transaction_logs(account_number, pool).await?)
}
