pub mod api_client;
pub mod money;
pub mod policy;
pub mod requests;
pub mod responses;
pub mod token;

pub use api_client::{
    AccountsClient, ClientError, InternalAccountsClient, TransactionsClient,
};
pub use money::{Amount, Balance, MAX_BALANCE, MAX_DEPOSIT};
pub use policy::{Policy, PrivilegeLimit};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public account identifier: numeric, stable, assigned from a monotone
/// sequence starting at 1000.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Serialize,
    Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct AccountNumber(pub i64);

impl AccountNumber {
    /// The external-cash side of a pure deposit or withdrawal in the fund
    /// transfer journal.
    pub const SENTINEL: AccountNumber = AccountNumber(0);
}

/// Identity-service subject that owns an account. Carried in bearer tokens
/// as `sub`.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct SubjectId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct TransferId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct EntryId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct AuditId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "account_kind", rename_all = "snake_case")
)]
pub enum AccountKind {
    Savings,
    Current,
}

/// Privilege tier controlling the per-day withdrawal/transfer caps.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "privilege_level", rename_all = "snake_case")
)]
pub enum Privilege {
    Silver,
    Gold,
    Premium,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "gender", rename_all = "snake_case")
)]
pub enum Gender {
    Male,
    Female,
    Others,
}

/// Clearing mode requested for a transfer. The journal has one more mode
/// (the reconciliation marker) that is never accepted from the wire; see the
/// transactions store.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferMode {
    Neft,
    Rtgs,
    Imps,
    Upi,
    Cheque,
}

/// Ledger entry flavor. A transfer produces one `Transfer` entry per leg.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "entry_kind", rename_all = "snake_case")
)]
pub enum EntryKind {
    Withdraw,
    Deposit,
    Transfer,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "audit_action", rename_all = "snake_case")
)]
pub enum AuditAction {
    Create,
    Activate,
    Inactivate,
    Close,
    BalanceUpdate,
    PrivilegeUpdate,
    Edit,
}

/// Caller role carried in bearer tokens. Gating policies live at the HTTP
/// surface of each service.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Teller,
    Customer,
}

impl Role {
    /// Bank staff may act on any account.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Teller)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[cfg(feature = "use-sqlx")]
pub use sqlx_support::OptionalTimestamp;

#[cfg(feature = "use-sqlx")]
mod sqlx_support {
    use jiff::Timestamp;
    use jiff_sqlx::Timestamp as SqlxTs;
    use sqlx::error::BoxDynError;
    use sqlx::postgres::{PgTypeInfo, PgValueRef};
    use sqlx::{Postgres, ValueRef};

    /// Decodes a nullable timestamptz column for use with
    /// `#[sqlx(try_from = "OptionalTimestamp")]` on `Option<Timestamp>`
    /// fields.
    #[derive(Debug, Clone, Copy)]
    pub struct OptionalTimestamp(pub Option<SqlxTs>);

    impl sqlx::Type<Postgres> for OptionalTimestamp {
        fn type_info() -> PgTypeInfo {
            <SqlxTs as sqlx::Type<Postgres>>::type_info()
        }
    }

    impl<'r> sqlx::Decode<'r, Postgres> for OptionalTimestamp {
        fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
            if value.is_null() {
                return Ok(Self(None));
            }
            Ok(Self(Some(<SqlxTs as sqlx::Decode<Postgres>>::decode(
                value,
            )?)))
        }
    }

    impl TryFrom<OptionalTimestamp> for Option<Timestamp> {
        type Error = BoxDynError;

        fn try_from(value: OptionalTimestamp) -> Result<Self, Self::Error> {
            value
                .0
                .map(Timestamp::try_from)
                .transpose()
                .map_err(Into::into)
        }
    }
}
