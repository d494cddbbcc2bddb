//! Tracker Engine — Timestamp Identifiers
//!
//! Every event is identified by the instant it was created at.
//! Canonical text form: `YYYY-MM-DDTHH:MM:SS.sssZ` (UTC, millisecond precision).
//! Fixed width for years 0000–9999, so string order == chronological order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Earliest and latest years representable in the fixed-width form.
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("invalid timestamp {input:?}: {reason}")]
    Malformed { input: String, reason: String },
    #[error("timestamp {0:?} is outside the years 0000-9999")]
    OutOfRange(String),
}

/// Millisecond-precision UTC instant used as an event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Parse any RFC 3339 string and normalise it to the canonical form.
    /// Sub-millisecond digits are truncated.
    pub fn parse(input: &str) -> Result<Self, TimestampError> {
        let parsed = DateTime::parse_from_rfc3339(input).map_err(|e| TimestampError::Malformed {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_datetime(parsed.with_timezone(&Utc))
            .map_err(|_| TimestampError::OutOfRange(input.to_string()))
    }

    /// Build from a chrono instant, truncating to whole milliseconds.
    pub fn from_datetime(instant: DateTime<Utc>) -> Result<Self, TimestampError> {
        if instant.year() < MIN_YEAR || instant.year() > MAX_YEAR {
            return Err(TimestampError::OutOfRange(instant.to_rfc3339()));
        }
        Ok(Self(truncate_to_millis(instant)))
    }

    /// The smallest representable instant strictly after `self`.
    pub fn next_millisecond(&self) -> Self {
        Self(self.0 + Duration::milliseconds(1))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Canonical text form.
    pub fn to_canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = instant.nanosecond() / 1_000_000 * 1_000_000;
    instant.with_nanosecond(nanos).unwrap_or(instant)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_canonical()
    }
}
