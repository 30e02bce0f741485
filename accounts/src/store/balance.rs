//! Balance mutations for the privileged internal surface.
//!
//! Debit and credit are serializable per account: each takes a row-level
//! exclusive lock (`SELECT ... FOR UPDATE`) inside a transaction spanning
//! the read, the checks, the write, and the audit insert. Two concurrent
//! debits on one account either both succeed or the second observes the
//! first's post-state. No cross-account lock is ever held.

use jiff_sqlx::ToSqlx;
use rust_decimal::Decimal;
use sqlx::PgPool;

use payloads::{AccountNumber, AuditAction, MAX_BALANCE};

use super::{StoreError, fetch_account_tx, insert_audit_tx};
use crate::time::TimeSource;

fn balance_snapshot(balance: Decimal) -> serde_json::Value {
    serde_json::json!({ "balance": balance })
}

/// Deduct `amount` from the account. Preconditions checked under the row
/// lock: account exists, is active, is not closed, and holds at least
/// `amount`. Returns the new balance.
#[tracing::instrument(skip(pool, time_source))]
pub async fn debit(
    account_number: AccountNumber,
    amount: Decimal,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Decimal, StoreError> {
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let account = fetch_account_tx(account_number, true, &mut tx).await?;
    if account.is_closed() {
        return Err(StoreError::AccountClosed);
    }
    if !account.active {
        return Err(StoreError::AccountInactive);
    }
    if account.balance < amount {
        return Err(StoreError::InsufficientFunds);
    }
    let new_balance = account.balance - amount;

    sqlx::query(
        "UPDATE accounts SET balance = $2, updated_at = $3
        WHERE account_number = $1;",
    )
    .bind(account_number)
    .bind(new_balance)
    .bind(now.to_sqlx())
    .execute(&mut *tx)
    .await?;

    insert_audit_tx(
        account_number,
        AuditAction::BalanceUpdate,
        Some(balance_snapshot(account.balance)),
        Some(balance_snapshot(new_balance)),
        now,
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        account_number = %account_number,
        amount = %amount,
        new_balance = %new_balance,
        "debited account"
    );
    Ok(new_balance)
}

/// Add `amount` to the account. No insufficient-funds path, but the result
/// must stay under the representable ceiling (2^63 - 1 scaled units).
#[tracing::instrument(skip(pool, time_source))]
pub async fn credit(
    account_number: AccountNumber,
    amount: Decimal,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Decimal, StoreError> {
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let account = fetch_account_tx(account_number, true, &mut tx).await?;
    if account.is_closed() {
        return Err(StoreError::AccountClosed);
    }
    if !account.active {
        return Err(StoreError::AccountInactive);
    }
    let new_balance = account
        .balance
        .checked_add(amount)
        .filter(|b| *b <= *MAX_BALANCE)
        .ok_or(StoreError::BalanceOverflow)?;

    sqlx::query(
        "UPDATE accounts SET balance = $2, updated_at = $3
        WHERE account_number = $1;",
    )
    .bind(account_number)
    .bind(new_balance)
    .bind(now.to_sqlx())
    .execute(&mut *tx)
    .await?;

    insert_audit_tx(
        account_number,
        AuditAction::BalanceUpdate,
        Some(balance_snapshot(account.balance)),
        Some(balance_snapshot(new_balance)),
        now,
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        account_number = %account_number,
        amount = %amount,
        new_balance = %new_balance,
        "credited account"
    );
    Ok(new_balance)
}
