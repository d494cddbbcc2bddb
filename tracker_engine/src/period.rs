//! Tracker Engine — Period Calendar
//!
//! Period boundaries are computed in local wall-clock time: a fixed UTC
//! offset plus a configurable first day of the week.
//!
//! Period ids:
//!   - hour                  `YYYY-MM-DDTHH`
//!   - day/week/month/year   `YYYY-MM-DD` of the period start

use std::fmt;
use std::str::FromStr;

use chrono::{
    Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    Timelike, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown granularity {:?}", s))
    }
}

/// Where period boundaries fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodCalendar {
    pub offset: FixedOffset,
    pub week_starts_on: Weekday,
}

impl Default for PeriodCalendar {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
            week_starts_on: Weekday::Mon,
        }
    }
}

impl PeriodCalendar {
    pub fn new(offset: FixedOffset, week_starts_on: Weekday) -> Self {
        Self { offset, week_starts_on }
    }

    /// Local wall-clock time of an event id.
    pub fn local(&self, ts: &Timestamp) -> NaiveDateTime {
        ts.as_datetime().with_timezone(&self.offset).naive_local()
    }

    /// Local calendar date of an event id.
    pub fn local_date(&self, ts: &Timestamp) -> NaiveDate {
        self.local(ts).date()
    }

    pub fn scheme(&self, granularity: Granularity) -> CalendarPeriod {
        CalendarPeriod {
            granularity,
            calendar: *self,
        }
    }
}

// ── PeriodScheme ───────────────────────────────────────────────────

/// Boundary enumerator + increment + id formatter for one granularity.
pub trait PeriodScheme {
    /// Start of the period containing `t`.
    fn period_start(&self, t: NaiveDateTime) -> NaiveDateTime;

    /// Start of the period after the one starting at `start`.
    /// `None` past the end of the representable calendar.
    fn advance(&self, start: NaiveDateTime) -> Option<NaiveDateTime>;

    fn period_id(&self, start: NaiveDateTime) -> String;

    /// Period starts covering `[first, last]`, in order.
    fn boundaries(&self, first: NaiveDateTime, last: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut out = Vec::new();
        let mut cursor = Some(self.period_start(first));
        while let Some(start) = cursor {
            if start > last {
                break;
            }
            out.push(start);
            cursor = self.advance(start);
        }
        out
    }
}

/// A granularity evaluated in a `PeriodCalendar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarPeriod {
    pub granularity: Granularity,
    pub calendar: PeriodCalendar,
}

impl PeriodScheme for CalendarPeriod {
    fn period_start(&self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        match self.granularity {
            Granularity::Hour => {
                t - Duration::seconds(i64::from(t.minute() * 60 + t.second()))
                    - Duration::nanoseconds(i64::from(t.nanosecond()))
            }
            Granularity::Day => midnight(date),
            Granularity::Week => {
                let days_back = (date.weekday().num_days_from_monday() + 7
                    - self.calendar.week_starts_on.num_days_from_monday())
                    % 7;
                midnight(date - Duration::days(i64::from(days_back)))
            }
            Granularity::Month => midnight(date - Duration::days(i64::from(date.day0()))),
            Granularity::Year => midnight(date - Duration::days(i64::from(date.ordinal0()))),
        }
    }

    fn advance(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        match self.granularity {
            Granularity::Hour => start.checked_add_signed(Duration::hours(1)),
            Granularity::Day => start.checked_add_signed(Duration::days(1)),
            Granularity::Week => start.checked_add_signed(Duration::weeks(1)),
            Granularity::Month => start.checked_add_months(Months::new(1)),
            Granularity::Year => start.checked_add_months(Months::new(12)),
        }
    }

    fn period_id(&self, start: NaiveDateTime) -> String {
        match self.granularity {
            Granularity::Hour => start.format("%Y-%m-%dT%H").to_string(),
            _ => start.format("%Y-%m-%d").to_string(),
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}
