use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::{
    AccountNumber, Amount, Gender, Privilege, SubjectId, TransferMode,
};

pub const HOLDER_NAME_MAX_LEN: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSavingsAccount {
    pub holder_name: String,
    pub pin: String,
    pub date_of_birth: Date,
    pub gender: Gender,
    pub phone_number: String,
    #[serde(default)]
    pub privilege: Option<Privilege>,
    /// Identity-service subject that will own the account; required for the
    /// holder to operate it with a CUSTOMER token.
    #[serde(default)]
    pub owner_subject: Option<SubjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCurrentAccount {
    pub holder_name: String,
    pub pin: String,
    pub company_name: String,
    #[serde(default)]
    pub website: Option<String>,
    pub registration_number: String,
    #[serde(default)]
    pub privilege: Option<Privilege>,
    #[serde(default)]
    pub owner_subject: Option<SubjectId>,
}

/// Partial update of non-monetary fields; at least one must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAccount {
    #[serde(default)]
    pub holder_name: Option<String>,
    #[serde(default)]
    pub privilege: Option<Privilege>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPin {
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
    pub account_number: AccountNumber,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdraw {
    pub account_number: AccountNumber,
    pub amount: Amount,
    pub pin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub from_account: AccountNumber,
    pub to_account: AccountNumber,
    pub amount: Amount,
    pub mode: TransferMode,
    pub pin: String,
}

/// Body for the privileged debit and credit endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceChange {
    pub amount: Amount,
}
