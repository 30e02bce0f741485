//! Money newtypes for the wire format.
//!
//! Amounts travel as decimal strings with exactly two fractional digits
//! ("250.00", never "250" or "250.0"). In memory they are
//! `rust_decimal::Decimal`, a fixed-point integer-mantissa type; floating
//! point never touches balances.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Largest representable balance: 2^63 - 1 scaled units (cents).
pub static MAX_BALANCE: LazyLock<Decimal> =
    LazyLock::new(|| Decimal::from_i128_with_scale(i64::MAX as i128, 2));

/// Single-operation ceiling for deposits.
pub static MAX_DEPOSIT: LazyLock<Decimal> =
    LazyLock::new(|| Decimal::from(10_000_000_000u64));

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must be a decimal with exactly two fractional digits")]
    BadScale,
    #[error("amount must be positive")]
    NotPositive,
    #[error("amount is not a valid decimal")]
    Unparseable,
}

/// A strictly positive operation amount with scale 2.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount(Decimal);

impl Amount {
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let d = parse_two_scale(s)?;
        if d <= Decimal::ZERO {
            return Err(MoneyError::NotPositive);
        }
        Ok(Amount(d))
    }

    /// Wrap an in-memory decimal. The value must already be positive and
    /// representable at scale 2.
    pub fn from_decimal(d: Decimal) -> Result<Self, MoneyError> {
        if d.scale() > 2 && d.normalize().scale() > 2 {
            return Err(MoneyError::BadScale);
        }
        if d <= Decimal::ZERO {
            return Err(MoneyError::NotPositive);
        }
        let mut d = d;
        d.rescale(2);
        Ok(Amount(d))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = MoneyError;

    fn try_from(d: Decimal) -> Result<Self, Self::Error> {
        Amount::from_decimal(d)
    }
}

impl FromStr for Amount {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(&format_args!("{:.2}", self.0))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let s = String::deserialize(de)?;
        Amount::parse(&s).map_err(de::Error::custom)
    }
}

/// A non-negative account balance with scale 2. Same wire shape as
/// [`Amount`] but zero is legal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Balance = Balance(Decimal::ZERO);

    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let d = parse_two_scale(s)?;
        if d < Decimal::ZERO {
            return Err(MoneyError::NotPositive);
        }
        Ok(Balance(d))
    }

    pub fn from_decimal(d: Decimal) -> Result<Self, MoneyError> {
        if d < Decimal::ZERO {
            return Err(MoneyError::NotPositive);
        }
        let mut d = d;
        d.rescale(2);
        Ok(Balance(d))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Balance {
    type Error = MoneyError;

    fn try_from(d: Decimal) -> Result<Self, Self::Error> {
        Balance::from_decimal(d)
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(&format_args!("{:.2}", self.0))
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let s = String::deserialize(de)?;
        Balance::parse(&s).map_err(de::Error::custom)
    }
}

/// Strict wire parse: optional sign, at least one integer digit, a point,
/// exactly two fractional digits.
fn parse_two_scale(s: &str) -> Result<Decimal, MoneyError> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let Some((int_part, frac_part)) = digits.split_once('.') else {
        return Err(MoneyError::BadScale);
    };
    if frac_part.len() != 2 {
        return Err(MoneyError::BadScale);
    }
    if int_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(MoneyError::Unparseable);
    }
    Decimal::from_str_exact(s).map_err(|_| MoneyError::Unparseable)
}
