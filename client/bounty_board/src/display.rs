//! Presentation helpers: whole-unit amounts, labels and deadlines.
//!
//! Storage and transactions only ever deal in minor units; conversion to the
//! "1 unit = 1,000,000 minor units" display convention happens here.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{BoardError, Result};
use crate::types::TaskStatus;

pub const MICRO_PER_UNIT: u64 = 1_000_000;
const FRACTION_DIGITS: usize = 6;

/// Minor units as whole units with two decimals, truncated (`5_123_456` → `"5.12"`).
pub fn micro_to_units(micro: u64) -> String {
    let whole = micro / MICRO_PER_UNIT;
    let cents = (micro % MICRO_PER_UNIT) / 10_000;
    format!("{whole}.{cents:02}")
}

/// Parse a decimal whole-unit amount (`"2.5"`) into minor units.
pub fn units_to_micro(units: &str) -> Result<u64> {
    let units = units.trim();
    let invalid = || BoardError::InvalidAmount(units.to_string());

    let (whole, frac) = units.split_once('.').unwrap_or((units, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > FRACTION_DIGITS
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let frac: u64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<width$}", width = FRACTION_DIGITS)
            .parse()
            .map_err(|_| invalid())?
    };

    whole
        .checked_mul(MICRO_PER_UNIT)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::Claimed => "Claimed",
            TaskStatus::Submitted => "Submitted",
            TaskStatus::Approved => "Approved",
            TaskStatus::Rejected => "Rejected",
            TaskStatus::Refunded => "Refunded",
        }
    }
}

/// RFC 3339 UTC rendering of a Unix-seconds deadline.
pub fn format_deadline(deadline: u64) -> String {
    i64::try_from(deadline)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| format!("@{deadline}"))
}

pub fn is_deadline_passed(deadline: u64, now: u64) -> bool {
    now > deadline
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}
