use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[cfg(feature = "use-sqlx")]
use jiff_sqlx::Timestamp as SqlxTs;

use crate::{
    AccountKind, AccountNumber, Amount, Balance, EntryId, EntryKind, Gender,
    Privilege, SubjectId, TransferId, TransferMode,
};

/// Uniform error body: `{error_code, message}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountCreated {
    pub account_number: AccountNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsDetails {
    pub date_of_birth: Date,
    pub gender: Gender,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentDetails {
    pub company_name: String,
    pub website: Option<String>,
    pub registration_number: String,
}

/// Exactly one of the two kind-specific blocks accompanies an account; the
/// discriminant is the top-level `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindDetails {
    Savings(SavingsDetails),
    Current(CurrentDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_number: AccountNumber,
    pub kind: AccountKind,
    pub holder_name: String,
    pub balance: Balance,
    pub privilege: Privilege,
    pub active: bool,
    pub owner_subject: Option<SubjectId>,
    pub activated_at: Timestamp,
    pub closed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub details: KindDetails,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PinVerification {
    pub valid: bool,
}

/// Liveness triple for an account; `exists=false` rows carry `false` for
/// the other flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountStatus {
    pub exists: bool,
    pub active: bool,
    pub closed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PrivilegeInfo {
    pub privilege: Privilege,
}

/// Result of a privileged debit or credit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewBalance {
    pub account_number: AccountNumber,
    pub balance: Balance,
}

/// Internal full-account view consumed by the Transactions service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalAccount {
    pub account_number: AccountNumber,
    pub kind: AccountKind,
    pub privilege: Privilege,
    pub balance: Balance,
    pub active: bool,
    pub closed: bool,
    pub owner_subject: Option<SubjectId>,
}

/// Receipt for a deposit or withdrawal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transfer_id: TransferId,
    pub account_number: AccountNumber,
    pub amount: Amount,
    pub kind: EntryKind,
    pub balance: Balance,
    pub at: Timestamp,
}

/// Receipt for a completed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: TransferId,
    pub from_account: AccountNumber,
    pub to_account: AccountNumber,
    pub amount: Amount,
    pub mode: TransferMode,
    pub at: Timestamp,
}

/// Daily-limit snapshot for an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferLimits {
    pub account_number: AccountNumber,
    pub privilege: Privilege,
    pub cap_amount: Balance,
    pub cap_count: i64,
    pub used_amount: Balance,
    pub used_count: i64,
    pub remaining_amount: Balance,
    pub remaining_count: i64,
}

/// One leg of a deposit, withdrawal, or transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct TransactionEntry {
    pub id: EntryId,
    pub account_number: AccountNumber,
    #[cfg_attr(
        feature = "use-sqlx",
        sqlx(try_from = "rust_decimal::Decimal")
    )]
    pub amount: Amount,
    pub kind: EntryKind,
    #[cfg_attr(feature = "use-sqlx", sqlx(try_from = "SqlxTs"))]
    pub at: Timestamp,
}
