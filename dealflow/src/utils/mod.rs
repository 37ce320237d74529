//! Utility functions shared across stages.

mod format;
mod timestamps;

pub use format::{format_won, group_thousands, truncate_chars};
pub use timestamps::{commit_timestamp, cutoff_day, signed_date, signed_date_at};
