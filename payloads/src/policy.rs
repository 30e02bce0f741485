//! Process-lifetime policy bag: PIN and phone shape rules plus the
//! privilege tier table. Loaded once at startup and never mutated.

use rust_decimal::{Decimal, dec};

use crate::Privilege;

/// Per-tier daily caps on money leaving an account (withdrawals plus
/// transfer sources), per UTC calendar day.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrivilegeLimit {
    pub daily_amount_cap: Decimal,
    pub daily_count_cap: i64,
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub pin_min_len: usize,
    pub pin_max_len: usize,
    pub reject_uniform_pin: bool,
    pub reject_sequential_pin: bool,
    pub phone_min_digits: usize,
    pub phone_max_digits: usize,
    silver: PrivilegeLimit,
    gold: PrivilegeLimit,
    premium: PrivilegeLimit,
}

impl Policy {
    /// The bank-wide standard policy.
    pub fn standard() -> Self {
        Policy {
            pin_min_len: 4,
            pin_max_len: 6,
            reject_uniform_pin: true,
            reject_sequential_pin: true,
            phone_min_digits: 10,
            phone_max_digits: 20,
            silver: PrivilegeLimit {
                daily_amount_cap: dec!(100000),
                daily_count_cap: 10,
            },
            gold: PrivilegeLimit {
                daily_amount_cap: dec!(500000),
                daily_count_cap: 20,
            },
            premium: PrivilegeLimit {
                daily_amount_cap: dec!(1000000),
                daily_count_cap: 50,
            },
        }
    }

    pub fn limit_for(&self, privilege: Privilege) -> PrivilegeLimit {
        match privilege {
            Privilege::Silver => self.silver,
            Privilege::Gold => self.gold,
            Privilege::Premium => self.premium,
        }
    }
}
