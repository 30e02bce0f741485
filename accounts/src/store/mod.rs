//! Database store for the Accounts service.
//!
//! ## Design decisions
//!
//! ### One transaction per mutation
//! Every state-changing operation runs inside a single sqlx transaction
//! that also writes its audit row. If the audit insert fails, the whole
//! operation rolls back; there is no committed mutation without a matching
//! `account_audit` row.
//!
//! ### Row locks, not application mutexes
//! Balance changes re-read the account row under `SELECT ... FOR UPDATE`
//! inside the transaction, so debits and credits on one account are
//! serialized by the database. No lock is ever held on more than one
//! account row.
//!
//! ### Time source dependency
//! Functions that need the current time accept a `TimeSource` instead of
//! reading the clock, so tests can pin and advance time.

use anyhow::Context;
use jiff::Timestamp;
use jiff::civil::Date;
use jiff_sqlx::Timestamp as SqlxTs;
use jiff_sqlx::ToSqlx;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use payloads::{
    AccountKind, AccountNumber, AuditAction, Gender, OptionalTimestamp,
    Privilege, SubjectId, requests, responses,
};

use crate::time::TimeSource;

pub mod balance;

/// A complete account row. Stays in the service; `pin_hash` is stripped
/// before anything leaves through the API.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub account_number: AccountNumber,
    pub kind: AccountKind,
    pub holder_name: String,
    pub pin_hash: String,
    pub balance: Decimal,
    pub privilege: Privilege,
    pub active: bool,
    pub owner_subject: Option<SubjectId>,
    #[sqlx(try_from = "SqlxTs")]
    pub activated_at: Timestamp,
    #[sqlx(try_from = "OptionalTimestamp")]
    pub closed_at: Option<Timestamp>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl Account {
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Serializable view for audit snapshots; never includes the PIN hash.
    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "account_number": self.account_number,
            "kind": self.kind,
            "holder_name": self.holder_name,
            "balance": self.balance,
            "privilege": self.privilege,
            "active": self.active,
            "closed_at": self.closed_at,
        })
    }

    pub fn into_response(
        self,
        details: responses::KindDetails,
    ) -> Result<responses::Account, StoreError> {
        Ok(responses::Account {
            account_number: self.account_number,
            kind: self.kind,
            holder_name: self.holder_name,
            balance: payloads::Balance::from_decimal(self.balance)
                .context("stored balance is negative")?,
            privilege: self.privilege,
            active: self.active,
            owner_subject: self.owner_subject,
            activated_at: self.activated_at,
            closed_at: self.closed_at,
            created_at: self.created_at,
            details,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SavingsDetailsRow {
    pub account_number: AccountNumber,
    #[sqlx(try_from = "jiff_sqlx::Date")]
    pub date_of_birth: Date,
    pub gender: Gender,
    pub phone_number: String,
}

impl From<SavingsDetailsRow> for responses::KindDetails {
    fn from(row: SavingsDetailsRow) -> Self {
        responses::KindDetails::Savings(responses::SavingsDetails {
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            phone_number: row.phone_number,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CurrentDetailsRow {
    pub account_number: AccountNumber,
    pub company_name: String,
    pub website: Option<String>,
    pub registration_number: String,
}

impl From<CurrentDetailsRow> for responses::KindDetails {
    fn from(row: CurrentDetailsRow) -> Self {
        responses::KindDetails::Current(responses::CurrentDetails {
            company_name: row.company_name,
            website: row.website,
            registration_number: row.registration_number,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Account not found")]
    AccountNotFound,
    #[error("Account is closed")]
    AccountClosed,
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Account is already active")]
    AlreadyActive,
    #[error("Account is already inactive")]
    AlreadyInactive,
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Balance would exceed the representable maximum")]
    BalanceOverflow,
    #[error("A savings account for this holder and date of birth exists")]
    DuplicateHolder,
    #[error("A current account with this registration number exists")]
    DuplicateRegistration,
    #[error("Update must change at least one field")]
    NothingToUpdate,
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.is_unique_violation()
        {
            StoreError::NotUnique(e)
        } else {
            StoreError::Database(e)
        }
    }
}

/// Append an audit row inside the caller's transaction. Failing here fails
/// the enclosing operation.
pub(crate) async fn insert_audit_tx(
    account_number: AccountNumber,
    action: AuditAction,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
    at: Timestamp,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO account_audit (account_number, action, before_json, after_json, at)
        VALUES ($1, $2, $3, $4, $5);",
    )
    .bind(account_number)
    .bind(action)
    .bind(before)
    .bind(after)
    .bind(at.to_sqlx())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn fetch_account_tx(
    account_number: AccountNumber,
    for_update: bool,
    tx: &mut Transaction<'_, Postgres>,
) -> Result<Account, StoreError> {
    let query = if for_update {
        "SELECT * FROM accounts WHERE account_number = $1 FOR UPDATE;"
    } else {
        "SELECT * FROM accounts WHERE account_number = $1;"
    };
    sqlx::query_as::<_, Account>(query)
        .bind(account_number)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::AccountNotFound)
}

/// Create a savings account with its details row in one atomic unit.
///
/// Field validation and PIN hashing happen in the route layer; this
/// function owns the duplicate-holder rule and the audit row.
#[tracing::instrument(skip(details, pin_hash, pool, time_source))]
pub async fn create_savings(
    details: &requests::CreateSavingsAccount,
    pin_hash: String,
    privilege: Privilege,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<AccountNumber, StoreError> {
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let duplicate = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM accounts a
            JOIN savings_details s ON a.account_number = s.account_number
            WHERE a.kind = 'savings'
              AND a.holder_name = $1
              AND s.date_of_birth = $2
        );",
    )
    .bind(&details.holder_name)
    .bind(details.date_of_birth.to_sqlx())
    .fetch_one(&mut *tx)
    .await?;
    if duplicate {
        return Err(StoreError::DuplicateHolder);
    }

    let account = sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (
            kind,
            holder_name,
            pin_hash,
            privilege,
            owner_subject,
            activated_at,
            created_at,
            updated_at
        )
        VALUES ('savings', $1, $2, $3, $4, $5, $5, $5)
        RETURNING *;",
    )
    .bind(&details.holder_name)
    .bind(&pin_hash)
    .bind(privilege)
    .bind(details.owner_subject)
    .bind(now.to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO savings_details (
            account_number,
            date_of_birth,
            gender,
            phone_number
        )
        VALUES ($1, $2, $3, $4);",
    )
    .bind(account.account_number)
    .bind(details.date_of_birth.to_sqlx())
    .bind(details.gender)
    .bind(&details.phone_number)
    .execute(&mut *tx)
    .await?;

    insert_audit_tx(
        account.account_number,
        AuditAction::Create,
        None,
        Some(account.snapshot()),
        now,
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        account_number = %account.account_number,
        "created savings account"
    );
    Ok(account.account_number)
}

/// Create a current account; the registration-number uniqueness is enforced
/// by the database and surfaced as a duplicate.
#[tracing::instrument(skip(details, pin_hash, pool, time_source))]
pub async fn create_current(
    details: &requests::CreateCurrentAccount,
    pin_hash: String,
    privilege: Privilege,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<AccountNumber, StoreError> {
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let account = sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (
            kind,
            holder_name,
            pin_hash,
            privilege,
            owner_subject,
            activated_at,
            created_at,
            updated_at
        )
        VALUES ('current', $1, $2, $3, $4, $5, $5, $5)
        RETURNING *;",
    )
    .bind(&details.holder_name)
    .bind(&pin_hash)
    .bind(privilege)
    .bind(details.owner_subject)
    .bind(now.to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO current_details (
            account_number,
            company_name,
            website,
            registration_number
        )
        VALUES ($1, $2, $3, $4);",
    )
    .bind(account.account_number)
    .bind(&details.company_name)
    .bind(&details.website)
    .bind(&details.registration_number)
    .execute(&mut *tx)
    .await
    .map_err(|e| match StoreError::from(e) {
        StoreError::NotUnique(_) => StoreError::DuplicateRegistration,
        other => other,
    })?;

    insert_audit_tx(
        account.account_number,
        AuditAction::Create,
        None,
        Some(account.snapshot()),
        now,
        &mut tx,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        account_number = %account.account_number,
        "created current account"
    );
    Ok(account.account_number)
}

pub async fn get_account(
    account_number: AccountNumber,
    pool: &PgPool,
) -> Result<Account, StoreError> {
    sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE account_number = $1;",
    )
    .bind(account_number)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::AccountNotFound)
}

/// Fetch the account with its kind-specific details block.
pub async fn get_account_with_details(
    account_number: AccountNumber,
    pool: &PgPool,
) -> Result<(Account, responses::KindDetails), StoreError> {
    let account = get_account(account_number, pool).await?;
    let details = match account.kind {
        AccountKind::Savings => sqlx::query_as::<_, SavingsDetailsRow>(
            "SELECT * FROM savings_details WHERE account_number = $1;",
        )
        .bind(account_number)
        .fetch_optional(pool)
        .await?
        .map(Into::into),
        AccountKind::Current => sqlx::query_as::<_, CurrentDetailsRow>(
            "SELECT * FROM current_details WHERE account_number = $1;",
        )
        .bind(account_number)
        .fetch_optional(pool)
        .await?
        .map(Into::into),
    };
    // The child row is created in the same transaction as the account, so
    // its absence is an invariant violation, not a user error.
    let details = details.context("account is missing its details row")?;
    Ok((account, details))
}

/// Partial update of non-monetary fields. Exactly one audit row: a pure
/// privilege change is `privilege_update`, anything else `edit`.
#[tracing::instrument(skip(details, pool, time_source))]
pub async fn update_account(
    account_number: AccountNumber,
    details: &requests::UpdateAccount,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Account, StoreError> {
    if details.holder_name.is_none() && details.privilege.is_none() {
        return Err(StoreError::NothingToUpdate);
    }
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let before = fetch_account_tx(account_number, true, &mut tx).await?;
    if before.is_closed() {
        return Err(StoreError::AccountClosed);
    }

    let holder_name = details
        .holder_name
        .clone()
        .unwrap_or_else(|| before.holder_name.clone());
    let privilege = details.privilege.unwrap_or(before.privilege);

    let after = sqlx::query_as::<_, Account>(
        "UPDATE accounts
        SET holder_name = $2, privilege = $3, updated_at = $4
        WHERE account_number = $1
        RETURNING *;",
    )
    .bind(account_number)
    .bind(&holder_name)
    .bind(privilege)
    .bind(now.to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    let action = if details.holder_name.is_none() {
        AuditAction::PrivilegeUpdate
    } else {
        AuditAction::Edit
    };
    insert_audit_tx(
        account_number,
        action,
        Some(before.snapshot()),
        Some(after.snapshot()),
        now,
        &mut tx,
    )
    .await?;

    tx.commit().await?;
    Ok(after)
}

/// Lifecycle transitions. Redundant targets are rejected and write no
/// audit row; close is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activate,
    Inactivate,
    Close,
}

#[tracing::instrument(skip(pool, time_source))]
pub async fn transition_account(
    account_number: AccountNumber,
    transition: Transition,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Account, StoreError> {
    let now = time_source.now();
    let mut tx = pool.begin().await?;

    let before = fetch_account_tx(account_number, true, &mut tx).await?;
    if before.is_closed() {
        return Err(StoreError::AccountClosed);
    }

    let (query, action) = match transition {
        Transition::Activate => {
            if before.active {
                return Err(StoreError::AlreadyActive);
            }
            (
                "UPDATE accounts
                SET active = TRUE, activated_at = $2, updated_at = $2
                WHERE account_number = $1
                RETURNING *;",
                AuditAction::Activate,
            )
        }
        Transition::Inactivate => {
            if !before.active {
                return Err(StoreError::AlreadyInactive);
            }
            (
                "UPDATE accounts
                SET active = FALSE, updated_at = $2
                WHERE account_number = $1
                RETURNING *;",
                AuditAction::Inactivate,
            )
        }
        Transition::Close => {
            if before.balance != Decimal::ZERO {
                tracing::warn!(
                    account_number = %account_number,
                    balance = %before.balance,
                    "closing account with non-zero balance"
                );
            }
            (
                "UPDATE accounts
                SET active = FALSE, closed_at = $2, updated_at = $2
                WHERE account_number = $1
                RETURNING *;",
                AuditAction::Close,
            )
        }
    };

    let after = sqlx::query_as::<_, Account>(query)
        .bind(account_number)
        .bind(now.to_sqlx())
        .fetch_one(&mut *tx)
        .await?;

    insert_audit_tx(
        account_number,
        action,
        Some(before.snapshot()),
        Some(after.snapshot()),
        now,
        &mut tx,
    )
    .await?;

    tx.commit().await?;
    Ok(after)
}

/// PIN hash lookup for verification. `None` for unknown accounts; the
/// caller is responsible for the uniform-failure dance.
pub async fn fetch_pin_hash(
    account_number: AccountNumber,
    pool: &PgPool,
) -> Result<Option<String>, StoreError> {
    Ok(sqlx::query_scalar::<_, String>(
        "SELECT pin_hash FROM accounts WHERE account_number = $1;",
    )
    .bind(account_number)
    .fetch_optional(pool)
    .await?)
}

/// Liveness triple for the internal surface. Unknown accounts are a 200
/// with `exists = false`, not a 404.
pub async fn account_status(
    account_number: AccountNumber,
    pool: &PgPool,
) -> Result<responses::AccountStatus, StoreError> {
    let row = sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE account_number = $1;",
    )
    .bind(account_number)
    .fetch_optional(pool)
    .await?;
    Ok(match row {
        Some(account) => responses::AccountStatus {
            exists: true,
            active: account.active,
            closed: account.is_closed(),
        },
        None => responses::AccountStatus {
            exists: false,
            active: false,
            closed: false,
        },
    })
}
