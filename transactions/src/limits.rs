//! Daily-limit admission.
//!
//! Usage is derived from the entry log at admission time; "today" is the
//! UTC calendar day. Reset is implicit: the window slides at midnight UTC,
//! no scheduled job involved. Admission reads a read-committed snapshot;
//! the narrow over-admission race between concurrent spends is accepted
//! (privilege is fetched fresh for every operation, never cached).

use jiff::civil::Time;
use jiff::tz::TimeZone;
use jiff::{Span, Timestamp};
use rust_decimal::Decimal;

use payloads::PrivilegeLimit;

use crate::store::DailyUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitViolation {
    /// The per-day operation count would be exceeded.
    Count { cap: i64 },
    /// The per-day amount cap would be exceeded.
    Amount { cap: Decimal },
}

/// Would spending `amount` now, on top of `used`, stay within the tier
/// caps? Exactly reaching a cap is admissible.
pub fn admit(
    used: &DailyUsage,
    amount: Decimal,
    limit: &PrivilegeLimit,
) -> Result<(), LimitViolation> {
    if used.count + 1 > limit.daily_count_cap {
        return Err(LimitViolation::Count {
            cap: limit.daily_count_cap,
        });
    }
    if used.amount + amount > limit.daily_amount_cap {
        return Err(LimitViolation::Amount {
            cap: limit.daily_amount_cap,
        });
    }
    Ok(())
}

/// Half-open `[start, end)` bounds of the UTC calendar day containing
/// `now`.
pub fn utc_day_bounds(now: Timestamp) -> (Timestamp, Timestamp) {
    let date = now.to_zoned(TimeZone::UTC).date();
    let start = date
        .to_datetime(Time::midnight())
        .to_zoned(TimeZone::UTC)
        .expect("UTC midnight always exists")
        .timestamp();
    let end = start + Span::new().hours(24);
    (start, end)
}
