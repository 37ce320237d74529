//! Time helpers for request signing, commit messages and retention.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

use crate::core::DayKey;

/// The signed-date used by the affiliate gateway: `yymmddTHHMMSSZ` in UTC.
#[must_use]
pub fn signed_date() -> String {
    signed_date_at(Utc::now())
}

/// Signed-date for a specific instant.
#[must_use]
pub fn signed_date_at(at: DateTime<Utc>) -> String {
    at.format("%y%m%dT%H%M%SZ").to_string()
}

/// Local wall-clock timestamp for commit messages.
#[must_use]
pub fn commit_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The day key `days` before `today`; anything strictly older is expired.
#[must_use]
pub fn cutoff_day(today: NaiveDate, days: u32) -> DayKey {
    DayKey::from_date(today - Duration::days(i64::from(days)))
}
