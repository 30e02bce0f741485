//! Database store for the Transactions service.
//!
//! The service owns no balance state. It keeps two append-only tables: the
//! fund transfer journal (one row per money movement) and the per-account
//! entry log (one row per affected account), from which daily-limit usage
//! is derived rather than denormalized.

use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use payloads::{
    AccountNumber, EntryKind, TransferId, TransferMode, responses,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

/// Journal-level transfer mode: the wire modes plus the reconciliation
/// marker for transfers whose compensation failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "transfer_mode", rename_all = "snake_case")]
pub enum JournalMode {
    Neft,
    Rtgs,
    Imps,
    Upi,
    Cheque,
    NeedsReconciliation,
}

impl From<TransferMode> for JournalMode {
    fn from(mode: TransferMode) -> Self {
        match mode {
            TransferMode::Neft => JournalMode::Neft,
            TransferMode::Rtgs => JournalMode::Rtgs,
            TransferMode::Imps => JournalMode::Imps,
            TransferMode::Upi => JournalMode::Upi,
            TransferMode::Cheque => JournalMode::Cheque,
        }
    }
}

/// Which side of the operation a log row records. A transfer's source leg
/// is outgoing and its destination leg incoming; only outgoing rows count
/// against the daily caps.
#[derive(Debug, Copy, Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "entry_direction", rename_all = "snake_case")]
pub enum EntryDirection {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, FromRow)]
pub struct FundTransfer {
    pub id: TransferId,
    pub from_account: AccountNumber,
    pub to_account: AccountNumber,
    pub amount: Decimal,
    pub mode: JournalMode,
    #[sqlx(try_from = "SqlxTs")]
    pub at: Timestamp,
}

/// Derived daily-limit usage over one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct DailyUsage {
    pub amount: Decimal,
    pub count: i64,
}

async fn insert_transfer_tx(
    from_account: AccountNumber,
    to_account: AccountNumber,
    amount: Decimal,
    mode: JournalMode,
    at: Timestamp,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<TransferId, StoreError> {
    let id = sqlx::query_scalar::<_, TransferId>(
        "INSERT INTO fund_transfers (from_account, to_account, amount, mode, at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id;",
    )
    .bind(from_account)
    .bind(to_account)
    .bind(amount)
    .bind(mode)
    .bind(at.to_sqlx())
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

async fn insert_entry_tx(
    account_number: AccountNumber,
    amount: Decimal,
    kind: EntryKind,
    direction: EntryDirection,
    at: Timestamp,
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO transaction_logging (account_number, amount, kind, direction, at)
        VALUES ($1, $2, $3, $4, $5);",
    )
    .bind(account_number)
    .bind(amount)
    .bind(kind)
    .bind(direction)
    .bind(at.to_sqlx())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Journal a committed deposit: sentinel source, one DEPOSIT entry.
#[tracing::instrument(skip(pool))]
pub async fn record_deposit(
    account_number: AccountNumber,
    amount: Decimal,
    at: Timestamp,
    pool: &PgPool,
) -> Result<TransferId, StoreError> {
    let mut tx = pool.begin().await?;
    let id = insert_transfer_tx(
        AccountNumber::SENTINEL,
        account_number,
        amount,
        JournalMode::Neft,
        at,
        &mut tx,
    )
    .await?;
    insert_entry_tx(
        account_number,
        amount,
        EntryKind::Deposit,
        EntryDirection::Incoming,
        at,
        &mut tx,
    )
    .await?;
    tx.commit().await?;
    Ok(id)
}

/// Journal a committed withdrawal: sentinel destination, one WITHDRAW
/// entry.
#[tracing::instrument(skip(pool))]
pub async fn record_withdrawal(
    account_number: AccountNumber,
    amount: Decimal,
    at: Timestamp,
    pool: &PgPool,
) -> Result<TransferId, StoreError> {
    let mut tx = pool.begin().await?;
    let id = insert_transfer_tx(
        account_number,
        AccountNumber::SENTINEL,
        amount,
        JournalMode::Neft,
        at,
        &mut tx,
    )
    .await?;
    insert_entry_tx(
        account_number,
        amount,
        EntryKind::Withdraw,
        EntryDirection::Outgoing,
        at,
        &mut tx,
    )
    .await?;
    tx.commit().await?;
    Ok(id)
}

/// Journal a committed transfer: one fund_transfers row plus one TRANSFER
/// entry per leg, all three sharing `at`.
#[tracing::instrument(skip(pool))]
pub async fn record_transfer(
    from_account: AccountNumber,
    to_account: AccountNumber,
    amount: Decimal,
    mode: TransferMode,
    at: Timestamp,
    pool: &PgPool,
) -> Result<TransferId, StoreError> {
    let mut tx = pool.begin().await?;
    let id = insert_transfer_tx(
        from_account,
        to_account,
        amount,
        mode.into(),
        at,
        &mut tx,
    )
    .await?;
    insert_entry_tx(
        from_account,
        amount,
        EntryKind::Transfer,
        EntryDirection::Outgoing,
        at,
        &mut tx,
    )
    .await?;
    insert_entry_tx(
        to_account,
        amount,
        EntryKind::Transfer,
        EntryDirection::Incoming,
        at,
        &mut tx,
    )
    .await?;
    tx.commit().await?;
    Ok(id)
}

/// Journal a transfer stuck in the money-missing state: the debit
/// committed, the credit and the compensating credit both failed. The
/// source-side entry still lands (the money did leave), and the marker row
/// makes the discrepancy visible to operators.
#[tracing::instrument(skip(pool))]
pub async fn record_needs_reconciliation(
    from_account: AccountNumber,
    to_account: AccountNumber,
    amount: Decimal,
    at: Timestamp,
    pool: &PgPool,
) -> Result<TransferId, StoreError> {
    let mut tx = pool.begin().await?;
    let id = insert_transfer_tx(
        from_account,
        to_account,
        amount,
        JournalMode::NeedsReconciliation,
        at,
        &mut tx,
    )
    .await?;
    insert_entry_tx(
        from_account,
        amount,
        EntryKind::Transfer,
        EntryDirection::Outgoing,
        at,
        &mut tx,
    )
    .await?;
    tx.commit().await?;
    Ok(id)
}

/// Sum and count of today's money-leaving entries for an account
/// (withdrawals and transfer source legs), over the half-open UTC day
/// window `[day_start, day_end)`. Incoming rows — deposits and transfer
/// destination legs — never count against the account's own caps.
pub async fn daily_usage(
    account_number: AccountNumber,
    day_start: Timestamp,
    day_end: Timestamp,
    pool: &PgPool,
) -> Result<DailyUsage, StoreError> {
    let usage = sqlx::query_as::<_, DailyUsage>(
        "SELECT
            COALESCE(SUM(amount), 0) AS amount,
            COUNT(*) AS count
        FROM transaction_logging
        WHERE account_number = $1
          AND direction = 'outgoing'
          AND at >= $2
          AND at < $3;",
    )
    .bind(account_number)
    .bind(day_start.to_sqlx())
    .bind(day_end.to_sqlx())
    .fetch_one(pool)
    .await?;
    Ok(usage)
}

/// Entry log for an account, most recent first.
pub async fn transaction_logs(
    account_number: AccountNumber,
    pool: &PgPool,
) -> Result<Vec<responses::TransactionEntry>, StoreError> {
    Ok(sqlx::query_as::<_, responses::TransactionEntry>(
        "SELECT * FROM transaction_logging
        WHERE account_number = $1
        ORDER BY at DESC, id;",
    )
    .bind(account_number)
    .fetch_all(pool)
    .await?)
}

/// Transfers awaiting operator reconciliation.
pub async fn pending_reconciliations(
    pool: &PgPool,
) -> Result<Vec<FundTransfer>, StoreError> {
    Ok(sqlx::query_as::<_, FundTransfer>(
        "SELECT * FROM fund_transfers
        WHERE mode = 'needs_reconciliation'
        ORDER BY at;",
    )
    .fetch_all(pool)
    .await?)
}
