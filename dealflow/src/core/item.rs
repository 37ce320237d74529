//! Promoted items and the day key that partitions the catalog.

use chrono::{Local, NaiveDate};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{DealflowError, Result};

/// A calendar day in fixed-width `YYYYMMDD` form.
///
/// Lexicographic order on the string equals chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(String);

impl DayKey {
    /// Parses an 8-digit day key.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DealflowError::InvalidDay(value));
        }
        NaiveDate::parse_from_str(&value, "%Y%m%d")
            .map_err(|_| DealflowError::InvalidDay(value.clone()))?;
        Ok(Self(value))
    }

    /// Builds a day key from a calendar date.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%Y%m%d").to_string())
    }

    /// Today's day key in local time.
    #[must_use]
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Converts the key back into a calendar date.
    #[must_use]
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y%m%d").ok()
    }

    /// Month and day as two-digit strings, e.g. `("01", "15")`.
    #[must_use]
    pub fn month_day(&self) -> (&str, &str) {
        (&self.0[4..6], &self.0[6..8])
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DayKey {
    type Err = DealflowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DayKey {
    type Error = DealflowError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.0
    }
}

/// One promoted product for one run.
///
/// Field names are part of the persisted catalog format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// `{date}-{rank:02}`, unique within a date.
    pub id: String,
    /// Partition key of the catalog.
    pub date: String,
    /// 1-based display order.
    pub rank: u32,
    /// Product name.
    pub name: String,
    /// Price in the minor currency unit.
    #[serde(deserialize_with = "whole_price")]
    pub price: u64,
    /// Product photo URL.
    pub image_url: String,
    /// Outbound tracked link.
    pub link: String,
}

impl Item {
    /// Creates an item whose id is derived from `(date, rank)`.
    #[must_use]
    pub fn new(
        date: &DayKey,
        rank: u32,
        name: impl Into<String>,
        price: u64,
        image_url: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::derive_id(date, rank),
            date: date.to_string(),
            rank,
            name: name.into(),
            price,
            image_url: image_url.into(),
            link: link.into(),
        }
    }

    /// Deterministic id for a `(date, rank)` pair.
    #[must_use]
    pub fn derive_id(date: &DayKey, rank: u32) -> String {
        format!("{date}-{rank:02}")
    }
}

/// Accepts `12900` and `12900.0`; older catalogs stored prices as floats.
fn whole_price<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Whole(u64),
        Float(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Whole(price) => Ok(price),
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        Raw::Float(price) if price >= 0.0 && price.fract() == 0.0 && price <= u64::MAX as f64 => {
            Ok(price as u64)
        }
        Raw::Float(price) => Err(D::Error::custom(format!(
            "price {price} is not a whole amount"
        ))),
    }
}
