//! Tracker Engine — Period Aggregator
//!
//! Time-bucketed summaries of a sampled signal.
//!
//! Samples are read as instantaneous values of a continuous,
//! piecewise-linear signal. Each period's mean is the time-weighted
//! (trapezoidal) average of that signal over the part of the period the
//! samples cover. The last period carries the raw last value.
//!
//! Results are sparse `period-id -> value` maps.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::domain::{CategoryProjection, Mood};
use crate::period::{Granularity, PeriodCalendar, PeriodScheme};

/// `period-id -> value`, ordered by id (== chronological order).
pub type PeriodBuckets = BTreeMap<String, f64>;

/// One point of the signal, in local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub at: NaiveDateTime,
    pub value: f64,
}

impl Sample {
    pub fn new(at: NaiveDateTime, value: f64) -> Self {
        Self { at, value }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Mean of the interpolated signal per period. `samples` must be sorted by time.
pub fn mean_by_period<S: PeriodScheme>(scheme: &S, samples: &[Sample]) -> PeriodBuckets {
    let mut buckets = PeriodBuckets::new();
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return buckets,
    };

    if samples.len() == 1 {
        buckets.insert(scheme.period_id(scheme.period_start(first.at)), first.value);
        return buckets;
    }

    let mut boundaries = scheme.boundaries(first.at, last.at);
    if let Some(close) = boundaries.last().and_then(|b| scheme.advance(*b)) {
        boundaries.push(close);
    }

    let windows = boundaries.len().saturating_sub(1);
    for i in 1..boundaries.len() {
        let (p0, p1) = (boundaries[i - 1], boundaries[i]);
        let value = if i == windows {
            Some(last.value)
        } else {
            average_in_window(samples, p0, p1)
        };
        if let Some(v) = value {
            buckets.insert(scheme.period_id(p0), v);
        }
    }
    buckets
}

/// Mood means per period, read from the mood projection.
pub fn mean_moods_by(
    moods: &CategoryProjection<Mood>,
    calendar: &PeriodCalendar,
    granularity: Granularity,
) -> PeriodBuckets {
    let samples: Vec<Sample> = moods
        .iter()
        .map(|(id, entry)| Sample::new(calendar.local(id), entry.record.mood))
        .collect();
    mean_by_period(&calendar.scheme(granularity), &samples)
}

/// Dense per-period totals from the first sample's period to the last's.
/// Periods with no samples hold zero.
pub fn sum_by_period<S: PeriodScheme>(scheme: &S, samples: &[Sample]) -> PeriodBuckets {
    let mut buckets = PeriodBuckets::new();
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) => (first.at, last.at),
        _ => return buckets,
    };
    for start in scheme.boundaries(first, last) {
        buckets.insert(scheme.period_id(start), 0.0);
    }
    for sample in samples {
        let id = scheme.period_id(scheme.period_start(sample.at));
        *buckets.entry(id).or_insert(0.0) += sample.value;
    }
    buckets
}

// ---------------------------------------------------------------------------
// Signal helpers (private)
// ---------------------------------------------------------------------------

/// Time-weighted mean over `[p0, p1]` clipped to the sampled domain.
/// `None` when the window and the samples do not overlap.
fn average_in_window(samples: &[Sample], p0: NaiveDateTime, p1: NaiveDateTime) -> Option<f64> {
    let first = samples.first()?.at;
    let last = samples.last()?.at;
    let a = p0.max(first);
    let b = p1.min(last);
    if a > b {
        return None;
    }
    if a == b {
        return value_at(samples, a);
    }

    let mut area = 0.0;
    for pair in samples.windows(2) {
        let (s0, s1) = (pair[0], pair[1]);
        if s1.at <= a || s0.at >= b {
            continue;
        }
        let x0 = s0.at.max(a);
        let x1 = s1.at.min(b);
        let width = millis_between(x0, x1);
        if width <= 0.0 {
            continue;
        }
        let f0 = interpolate(s0, s1, x0);
        let f1 = interpolate(s0, s1, x1);
        area += width * (f0 + f1) / 2.0;
    }
    Some(area / millis_between(a, b))
}

/// Signal value at `t`, which must lie within the sampled domain.
fn value_at(samples: &[Sample], t: NaiveDateTime) -> Option<f64> {
    if let Some(exact) = samples.iter().find(|s| s.at == t) {
        return Some(exact.value);
    }
    samples
        .windows(2)
        .find(|pair| pair[0].at < t && t < pair[1].at)
        .map(|pair| interpolate(pair[0], pair[1], t))
}

fn interpolate(s0: Sample, s1: Sample, t: NaiveDateTime) -> f64 {
    let span = millis_between(s0.at, s1.at);
    if span <= 0.0 {
        return s1.value;
    }
    let ratio = millis_between(s0.at, t) / span;
    s0.value + (s1.value - s0.value) * ratio
}

fn millis_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Granularity;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn sample(s: &str, v: f64) -> Sample {
        Sample::new(at(s), v)
    }

    fn scheme(g: Granularity) -> crate::period::CalendarPeriod {
        PeriodCalendar::default().scheme(g)
    }

    fn assert_buckets(actual: &PeriodBuckets, expected: &[(&str, f64)]) {
        assert_eq!(actual.len(), expected.len(), "buckets: {:?}", actual);
        for (id, v) in expected {
            let got = actual.get(*id).copied();
            assert!(
                got.map(|g| (g - v).abs() < 1e-9).unwrap_or(false),
                "bucket {} = {:?}, want {}",
                id,
                got,
                v
            );
        }
    }

    #[test]
    fn test_no_samples_no_buckets() {
        assert!(mean_by_period(&scheme(Granularity::Day), &[]).is_empty());
    }

    #[test]
    fn test_single_sample_any_granularity() {
        let samples = [sample("2020-04-05T13:45:00", 7.0)];
        for (g, id) in [
            (Granularity::Hour, "2020-04-05T13"),
            (Granularity::Day, "2020-04-05"),
            (Granularity::Week, "2020-03-30"),
            (Granularity::Month, "2020-04-01"),
            (Granularity::Year, "2020-01-01"),
        ] {
            assert_buckets(&mean_by_period(&scheme(g), &samples), &[(id, 7.0)]);
        }
    }

    #[test]
    fn test_flat_signal_three_days_apart() {
        let samples = [
            sample("2020-04-05T00:00:00", 5.0),
            sample("2020-04-08T00:00:00", 5.0),
        ];
        assert_buckets(
            &mean_by_period(&scheme(Granularity::Day), &samples),
            &[
                ("2020-04-05", 5.0),
                ("2020-04-06", 5.0),
                ("2020-04-07", 5.0),
                ("2020-04-08", 5.0),
            ],
        );
    }

    #[test]
    fn test_linear_signal_four_days_apart() {
        let samples = [
            sample("2020-04-05T00:00:00", 3.0),
            sample("2020-04-09T00:00:00", 9.0),
        ];
        assert_buckets(
            &mean_by_period(&scheme(Granularity::Day), &samples),
            &[
                ("2020-04-05", 3.75),
                ("2020-04-06", 5.25),
                ("2020-04-07", 6.75),
                ("2020-04-08", 8.25),
                ("2020-04-09", 9.0),
            ],
        );
    }

    #[test]
    fn test_window_crossing_several_samples() {
        // 0 -> 4 over the first half day, then 4 -> 0 over the second.
        let samples = [
            sample("2020-04-05T00:00:00", 0.0),
            sample("2020-04-05T12:00:00", 4.0),
            sample("2020-04-06T00:00:00", 0.0),
            sample("2020-04-06T06:00:00", 1.0),
        ];
        assert_buckets(
            &mean_by_period(&scheme(Granularity::Day), &samples),
            &[("2020-04-05", 2.0), ("2020-04-06", 1.0)],
        );
    }

    #[test]
    fn test_window_clipped_to_first_sample() {
        // Samples start at noon: the first day averages the covered half only.
        let samples = [
            sample("2020-04-05T12:00:00", 2.0),
            sample("2020-04-06T12:00:00", 4.0),
        ];
        assert_buckets(
            &mean_by_period(&scheme(Granularity::Day), &samples),
            &[("2020-04-05", 2.5), ("2020-04-06", 4.0)],
        );
    }

    #[test]
    fn test_sum_by_period_is_dense() {
        let samples = [
            sample("2020-01-10T00:00:00", 60.0),
            sample("2020-01-20T00:00:00", 30.0),
            sample("2020-03-02T00:00:00", 10.0),
        ];
        assert_buckets(
            &sum_by_period(&scheme(Granularity::Month), &samples),
            &[("2020-01-01", 90.0), ("2020-02-01", 0.0), ("2020-03-01", 10.0)],
        );
    }
}
