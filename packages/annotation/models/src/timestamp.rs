//! Survey capture timestamp.
//!
//! Field clients send ISO 8601 date-times both with and without a UTC
//! offset, bare dates, or Unix timestamps. [`SurveyTimestamp`] keeps
//! whichever offset was sent so that the rendered value (used in object keys
//! and the stored JSON) reflects what the surveyor's device recorded.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset as _, Timelike as _, Utc,
};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Formats accepted for timestamps carrying an explicit offset.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Formats accepted for naive (offset-less) timestamps.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Date-only form; read as midnight.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Numeric timestamps larger than this (in magnitude) are milliseconds.
const UNIX_MILLIS_CUTOFF: i64 = 20_000_000_000;

/// Error returned when a string is not a recognizable ISO 8601 date-time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date-time {input:?}: expected ISO 8601 (e.g. 2024-01-01T00:00:00)")]
pub struct ParseTimestampError {
    /// The rejected input.
    pub input: String,
}

/// When an annotation was captured.
///
/// Rendered as `YYYY-MM-DDTHH:MM:SS`, with a six-digit fraction only when
/// sub-second precision is present and a `±HH:MM` suffix only when an
/// offset was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurveyTimestamp {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl SurveyTimestamp {
    /// Creates a timestamp without a UTC offset.
    #[must_use]
    pub const fn naive(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }

    /// Creates a timestamp from an offset-aware date-time.
    #[must_use]
    pub fn with_offset(value: DateTime<FixedOffset>) -> Self {
        Self {
            local: value.naive_local(),
            offset: Some(*value.offset()),
        }
    }

    /// Creates a UTC timestamp from Unix seconds, or milliseconds when the
    /// magnitude exceeds `2e10`. Returns `None` when out of range.
    #[must_use]
    pub fn from_unix(value: i64) -> Option<Self> {
        let utc = if value.unsigned_abs() > UNIX_MILLIS_CUTOFF.unsigned_abs() {
            DateTime::from_timestamp_millis(value)?
        } else {
            DateTime::from_timestamp(value, 0)?
        };
        Some(Self::utc(utc))
    }

    /// Fractional form of [`SurveyTimestamp::from_unix`].
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn from_unix_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let seconds = if value.abs() > UNIX_MILLIS_CUTOFF as f64 {
            value / 1_000.0
        } else {
            value
        };
        let whole = seconds.floor();
        let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
        DateTime::from_timestamp(whole as i64, nanos).map(Self::utc)
    }

    fn utc(value: DateTime<Utc>) -> Self {
        Self {
            local: value.naive_utc(),
            offset: Some(Utc.fix()),
        }
    }

    /// Wall-clock date-time as recorded by the client.
    #[must_use]
    pub const fn local(&self) -> NaiveDateTime {
        self.local
    }

    /// UTC offset, if the client supplied one.
    #[must_use]
    pub const fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }
}

/// Accepts a space as the date/time separator and `Z` as the UTC designator.
fn normalize(input: &str) -> String {
    let mut s = input.trim().to_string();
    if s.len() > 10 && s.as_bytes()[10] == b' ' {
        s.replace_range(10..11, "T");
    }
    if s.ends_with(['Z', 'z']) {
        s.pop();
        s.push_str("+00:00");
    }
    s
}

impl FromStr for SurveyTimestamp {
    type Err = ParseTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);

        if let Some(dt) = OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(&normalized, fmt).ok())
        {
            return Ok(Self::with_offset(dt));
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(&normalized, DATE_FORMAT)
                    .ok()
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
            .map(Self::naive)
            .ok_or_else(|| ParseTimestampError {
                input: s.to_string(),
            })
    }
}

impl fmt::Display for SurveyTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%dT%H:%M:%S"))?;

        let nanos = self.local.nanosecond() % 1_000_000_000;
        if nanos != 0 {
            if nanos % 1_000 == 0 {
                write!(f, ".{:06}", nanos / 1_000)?;
            } else {
                write!(f, ".{nanos:09}")?;
            }
        }

        if let Some(offset) = self.offset {
            write!(f, "{offset}")?;
        }

        Ok(())
    }
}

impl Serialize for SurveyTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct TimestampVisitor;

impl Visitor<'_> for TimestampVisitor {
    type Value = SurveyTimestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an ISO 8601 date-time string or a Unix timestamp")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        SurveyTimestamp::from_unix(v)
            .ok_or_else(|| E::custom(format!("Unix timestamp {v} is out of range")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .ok()
            .and_then(SurveyTimestamp::from_unix)
            .ok_or_else(|| E::custom(format!("Unix timestamp {v} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        SurveyTimestamp::from_unix_f64(v)
            .ok_or_else(|| E::custom(format!("Unix timestamp {v} is out of range")))
    }
}

impl<'de> Deserialize<'de> for SurveyTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}
