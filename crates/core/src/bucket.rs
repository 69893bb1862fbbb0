//! Time-bucket width expressions and calendar alignment.
//!
//! Accepted forms: `"<n> <unit>"`, `"<n><unit>"`, or a bare unit meaning one.
//! Sub-month widths align to multiples of the width since the Unix epoch,
//! weeks start on Monday, months and years align to multiples since 1970-01.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::limits::DEFAULT_BUCKET;

static BUCKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)?\s*([a-z]+)$").expect("valid bucket regex"));

/// Largest accepted multiplier.
const MAX_AMOUNT: u32 = 100_000;

/// 1970-01-05, the first Monday after the epoch.
const MONDAY_EPOCH_SECS: i64 = 4 * 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl BucketUnit {
    fn parse(raw: &str) -> Option<Self> {
        let unit = match raw {
            "s" | "sec" | "secs" | "second" | "seconds" => Self::Second,
            "m" | "min" | "mins" | "minute" | "minutes" => Self::Minute,
            "h" | "hr" | "hrs" | "hour" | "hours" => Self::Hour,
            "d" | "day" | "days" => Self::Day,
            "w" | "week" | "weeks" => Self::Week,
            "mon" | "mons" | "month" | "months" => Self::Month,
            "y" | "yr" | "yrs" | "year" | "years" => Self::Year,
            _ => return None,
        };
        Some(unit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Fixed length in seconds, `None` for calendar units.
    pub fn fixed_secs(&self) -> Option<i64> {
        match self {
            Self::Second => Some(1),
            Self::Minute => Some(60),
            Self::Hour => Some(3_600),
            Self::Day => Some(86_400),
            Self::Week => Some(7 * 86_400),
            Self::Month | Self::Year => None,
        }
    }
}

/// A parsed bucket width such as "1 day" or "15 minutes".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWidth {
    pub amount: u32,
    pub unit: BucketUnit,
}

impl BucketWidth {
    pub const fn new(amount: u32, unit: BucketUnit) -> Self {
        Self { amount, unit }
    }

    /// Parses an optional expression, using "1 day" when missing or empty.
    pub fn parse_or_default(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => DEFAULT_BUCKET.parse(),
            Some(expr) => expr.parse(),
        }
    }

    /// Width in seconds for fixed-length units.
    pub fn width_secs(&self) -> Option<i64> {
        self.unit.fixed_secs().map(|s| s * i64::from(self.amount))
    }

    /// Returns the start of the bucket containing `ts`.
    pub fn align(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = ts.timestamp();
        let amount = i64::from(self.amount);
        let aligned = match self.unit {
            BucketUnit::Week => {
                let width = amount * 7 * 86_400;
                (secs - MONDAY_EPOCH_SECS).div_euclid(width) * width + MONDAY_EPOCH_SECS
            }
            BucketUnit::Month => {
                let months = i64::from(ts.year() - 1970) * 12 + i64::from(ts.month0());
                let start = months.div_euclid(amount) * amount;
                return month_start(start);
            }
            BucketUnit::Year => {
                let years = i64::from(ts.year() - 1970);
                let start = years.div_euclid(amount) * amount;
                return month_start(start * 12);
            }
            _ => {
                let width = self.width_secs().unwrap_or(86_400);
                secs.div_euclid(width) * width
            }
        };
        Utc.timestamp_opt(aligned, 0).single().unwrap_or(ts)
    }
}

fn month_start(months_since_epoch: i64) -> DateTime<Utc> {
    let year = 1970 + months_since_epoch.div_euclid(12);
    let month = months_since_epoch.rem_euclid(12) + 1;
    Utc.with_ymd_and_hms(year as i32, month as u32, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl FromStr for BucketWidth {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let caps = BUCKET_PATTERN
            .captures(&normalized)
            .ok_or_else(|| Error::query(format!("unrecognized bucket width '{}'", raw)))?;

        let amount = match caps.get(1) {
            Some(m) => m
                .as_str()
                .parse::<u32>()
                .map_err(|_| Error::query(format!("bucket amount out of range in '{}'", raw)))?,
            None => 1,
        };
        if amount == 0 || amount > MAX_AMOUNT {
            return Err(Error::query(format!(
                "bucket amount must be between 1 and {}",
                MAX_AMOUNT
            )));
        }

        let unit = caps
            .get(2)
            .and_then(|m| BucketUnit::parse(m.as_str()))
            .ok_or_else(|| Error::query(format!("unknown bucket unit in '{}'", raw)))?;

        Ok(Self { amount, unit })
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.amount == 1 { "" } else { "s" };
        write!(f, "{} {}{}", self.amount, self.unit.as_str(), plural)
    }
}

impl Serialize for BucketWidth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
