//! Tracker Engine — Read Queries
//!
//! Read-only views over folded projections. Nothing here touches the log.
//! Intervals over event ids are closed: `[from, to]`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::aggregate::{sum_by_period, PeriodBuckets, Sample};
use crate::domain::{
    AllProjection, Category, CategoryProjection, Entry, Meditation, Mood, PushUp, Sleep, TrackedEntry, Weight,
};
use crate::period::{Granularity, PeriodCalendar};
use crate::timestamp::Timestamp;

/// Fewer distinct words than this and the word cloud is not worth drawing.
pub const MINIMUM_WORD_CLOUD_WORDS: usize = 5;

/// How far a mood may be from a meditation and still count as its
/// before or after reading.
pub const MEDITATION_STATS_HOURS_RANGE: i64 = 4;

// ── Intervals ──────────────────────────────────────────────────────

/// Ids within `[from, to]`. `ids` must be sorted.
pub fn ids_in_interval<'a>(ids: &'a [Timestamp], from: &Timestamp, to: &Timestamp) -> &'a [Timestamp] {
    let start = ids.partition_point(|id| id < from);
    let end = ids.partition_point(|id| id <= to);
    if start >= end {
        return &[];
    }
    &ids[start..end]
}

/// Ids within `[from, to]` plus the nearest id on either side, so a
/// chart of the interval can interpolate to its edges.
pub fn enveloping_ids<'a>(ids: &'a [Timestamp], from: &Timestamp, to: &Timestamp) -> &'a [Timestamp] {
    let start = ids.partition_point(|id| id < from).saturating_sub(1);
    let end = (ids.partition_point(|id| id <= to) + 1).min(ids.len());
    if start >= end {
        return &[];
    }
    &ids[start..end]
}

// ── Location ───────────────────────────────────────────────────────

/// Ids of every record that carries a location, in log order.
pub fn ids_with_location(all: &AllProjection) -> Vec<Timestamp> {
    all.iter()
        .filter(|(_, entry)| entry.location().is_some())
        .map(|(id, _)| *id)
        .collect()
}

pub fn mood_ids_with_location(moods: &CategoryProjection<Mood>) -> Vec<Timestamp> {
    moods
        .iter()
        .filter(|(_, entry)| entry.record.location.is_some())
        .map(|(id, _)| *id)
        .collect()
}

pub fn ids_with_location_in_period(all: &AllProjection, from: &Timestamp, to: &Timestamp) -> Vec<Timestamp> {
    ids_in_interval(&ids_with_location(all), from, to).to_vec()
}

pub fn mood_ids_with_location_in_period(
    moods: &CategoryProjection<Mood>,
    from: &Timestamp,
    to: &Timestamp,
) -> Vec<Timestamp> {
    ids_in_interval(&mood_ids_with_location(moods), from, to).to_vec()
}

/// Located ids in `[from, to]` plus the nearest located id on either side.
pub fn enveloping_ids_with_location(all: &AllProjection, from: &Timestamp, to: &Timestamp) -> Vec<Timestamp> {
    enveloping_ids(&ids_with_location(all), from, to).to_vec()
}

// ── Listings ───────────────────────────────────────────────────────

/// A projected record with the id it was created under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listed<R> {
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    #[serde(flatten)]
    pub entry: Entry<R>,
}

/// Records of one category in log order.
pub fn denormalize<R: Clone>(projection: &CategoryProjection<R>) -> Vec<Listed<R>> {
    projection
        .iter()
        .map(|(id, entry)| Listed {
            created_at: *id,
            entry: entry.clone(),
        })
        .collect()
}

/// One row of the combined by-date listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatedEntry {
    pub id: Timestamp,
    #[serde(rename = "type")]
    pub category: Category,
}

/// Every record grouped by date. Sleeps are filed under `dateAwoke` and
/// lead their date; everything else is filed under the local date of its
/// id. Each run keeps log order.
pub fn all_entries_by_date(
    all: &AllProjection,
    calendar: &PeriodCalendar,
) -> BTreeMap<String, Vec<DatedEntry>> {
    let mut by_date: BTreeMap<String, Vec<DatedEntry>> = BTreeMap::new();
    let mut timed: Vec<(String, DatedEntry)> = Vec::new();
    for (id, entry) in all.iter() {
        let dated = DatedEntry {
            id: *id,
            category: entry.category(),
        };
        match entry {
            TrackedEntry::Sleeps(sleep) => by_date
                .entry(sleep.record.date_awoke.clone())
                .or_default()
                .push(dated),
            _ => timed.push((calendar.local_date(id).format("%Y-%m-%d").to_string(), dated)),
        }
    }
    for (date, dated) in timed {
        by_date.entry(date).or_default().push(dated);
    }
    by_date
}

/// Mood ids grouped by local date. Every present date has at least one id.
pub fn mood_ids_by_date(
    moods: &CategoryProjection<Mood>,
    calendar: &PeriodCalendar,
) -> BTreeMap<String, Vec<Timestamp>> {
    let mut by_date: BTreeMap<String, Vec<Timestamp>> = BTreeMap::new();
    for id in &moods.ordered_ids {
        let date = calendar.local_date(id).format("%Y-%m-%d").to_string();
        by_date.entry(date).or_default().push(*id);
    }
    by_date
}

// ── Interval totals and means ──────────────────────────────────────

pub fn mean_weight_in_period(
    weights: &CategoryProjection<Weight>,
    from: &Timestamp,
    to: &Timestamp,
) -> Option<f64> {
    let values: Vec<f64> = ids_in_interval(&weights.ordered_ids, from, to)
        .iter()
        .filter_map(|id| weights.get(id))
        .map(|e| e.record.value)
        .collect();
    mean(&values)
}

pub fn total_push_ups_in_period(
    push_ups: &CategoryProjection<PushUp>,
    from: &Timestamp,
    to: &Timestamp,
) -> u64 {
    ids_in_interval(&push_ups.ordered_ids, from, to)
        .iter()
        .filter_map(|id| push_ups.get(id))
        .map(|e| u64::from(e.record.value))
        .sum()
}

pub fn seconds_meditated_in_period(
    meditations: &CategoryProjection<Meditation>,
    from: &Timestamp,
    to: &Timestamp,
) -> u64 {
    ids_in_interval(&meditations.ordered_ids, from, to)
        .iter()
        .filter_map(|id| meditations.get(id))
        .map(|e| e.record.seconds)
        .sum()
}

/// Total meditation seconds for every month from the first session to the last.
pub fn meditation_seconds_by_month(
    meditations: &CategoryProjection<Meditation>,
    calendar: &PeriodCalendar,
) -> PeriodBuckets {
    let samples: Vec<Sample> = meditations
        .iter()
        .map(|(id, e)| Sample::new(calendar.local(id), e.record.seconds as f64))
        .collect();
    sum_by_period(&calendar.scheme(Granularity::Month), &samples)
}

// ── Sleep ──────────────────────────────────────────────────────────

/// Minutes slept keyed by `dateAwoke`. Several sleeps on one date add up.
pub fn minutes_slept_by_date_awoke(sleeps: &CategoryProjection<Sleep>) -> BTreeMap<String, u64> {
    let mut by_date: BTreeMap<String, u64> = BTreeMap::new();
    for (_, entry) in sleeps.iter() {
        *by_date.entry(entry.record.date_awoke.clone()).or_insert(0) +=
            u64::from(entry.record.minutes_slept);
    }
    by_date
}

/// Mean minutes slept per recorded day awoke in `[from, to)`.
/// Days with no record are skipped rather than counted as zero.
pub fn mean_daily_sleep_in_period(
    sleeps: &CategoryProjection<Sleep>,
    from: NaiveDate,
    to: NaiveDate,
) -> Option<f64> {
    let by_date = minutes_slept_by_date_awoke(sleeps);
    let mut values = Vec::new();
    let mut date = from;
    while date < to {
        if let Some(minutes) = by_date.get(&date.format("%Y-%m-%d").to_string()) {
            values.push(*minutes as f64);
        }
        date = date + Duration::days(1);
    }
    mean(&values)
}

/// The sleep projection with ids ordered by `dateAwoke`. Sleeps awoken
/// on the same date keep log order.
pub fn sleeps_sorted_by_date_awoke(sleeps: &CategoryProjection<Sleep>) -> CategoryProjection<Sleep> {
    let date_awoke = |id: &Timestamp| sleeps.get(id).map(|e| e.record.date_awoke.as_str());
    let mut sorted = sleeps.clone();
    sorted.ordered_ids.sort_by(|a, b| date_awoke(a).cmp(&date_awoke(b)));
    sorted
}

/// Mean of the daily totals per `YYYY-MM`.
pub fn mean_minutes_slept_by_month(sleeps: &CategoryProjection<Sleep>) -> BTreeMap<String, f64> {
    let mut by_month: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (date, minutes) in minutes_slept_by_date_awoke(sleeps) {
        let month: String = date.chars().take(7).collect();
        by_month.entry(month).or_default().push(minutes as f64);
    }
    by_month
        .into_iter()
        .filter_map(|(month, values)| mean(&values).map(|m| (month, m)))
        .collect()
}

// ── Description words ──────────────────────────────────────────────

fn normalized_words(description: &str) -> impl Iterator<Item = String> + '_ {
    description.split_whitespace().map(str::to_lowercase)
}

/// Every distinct normalized word used in a mood description, sorted.
pub fn description_words(moods: &CategoryProjection<Mood>) -> Vec<String> {
    let words: BTreeSet<String> = moods
        .iter()
        .filter_map(|(_, e)| e.record.description.as_deref())
        .flat_map(normalized_words)
        .collect();
    words.into_iter().collect()
}

/// Word frequencies over the mood descriptions in `[from, to]`.
/// `None` when fewer than `MINIMUM_WORD_CLOUD_WORDS` distinct words exist.
pub fn mood_cloud_words(
    moods: &CategoryProjection<Mood>,
    from: &Timestamp,
    to: &Timestamp,
) -> Option<BTreeMap<String, usize>> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for id in ids_in_interval(&moods.ordered_ids, from, to) {
        let Some(description) = moods.get(id).and_then(|e| e.record.description.as_deref()) else {
            continue;
        };
        for word in normalized_words(description) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    if counts.len() < MINIMUM_WORD_CLOUD_WORDS {
        return None;
    }
    Some(counts)
}

// ── Meditation effect ──────────────────────────────────────────────

/// How moods around meditations compare.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeditationStats {
    /// Mean of `after - before` over every meditation with moods close
    /// enough on both sides.
    pub average_mood_change_after_meditation: Option<f64>,
    pub words_before: BTreeMap<String, usize>,
    pub words_after: BTreeMap<String, usize>,
    /// `words_before` with words that also appear after cancelled out.
    pub filtered_words_before: BTreeMap<String, usize>,
    pub filtered_words_after: BTreeMap<String, usize>,
}

/// Pair each meditation with the last mood logged before it started and
/// the first mood logged after it. Pairs further than
/// `MEDITATION_STATS_HOURS_RANGE` away on either side are skipped.
pub fn meditation_stats(
    meditations: &CategoryProjection<Meditation>,
    moods: &CategoryProjection<Mood>,
) -> MeditationStats {
    let range_seconds = MEDITATION_STATS_HOURS_RANGE * 60 * 60;
    let mut changes = Vec::new();
    let mut before_words: Vec<String> = Vec::new();
    let mut after_words: Vec<String> = Vec::new();

    let mood_ids = &moods.ordered_ids;
    let mut i = 0;
    for (meditation_id, meditation) in meditations.iter() {
        while i < mood_ids.len() && (i == 0 || mood_ids[i] < *meditation_id) {
            i += 1;
        }
        if i >= mood_ids.len() {
            break;
        }
        let (before_id, after_id) = (mood_ids[i - 1], mood_ids[i]);
        let (Some(before), Some(after)) = (moods.get(&before_id), moods.get(&after_id)) else {
            continue;
        };

        let logged = meditation_id.timestamp_millis();
        let duration = i64::try_from(meditation.record.seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let started = logged.saturating_sub(duration);
        // Whole seconds, truncated toward zero.
        let gap_before = (started - before_id.timestamp_millis()) / 1000;
        let gap_after = (after_id.timestamp_millis() - logged) / 1000;
        if gap_before > range_seconds || gap_after > range_seconds {
            continue;
        }

        changes.push(after.record.mood - before.record.mood);
        if let Some(description) = before.record.description.as_deref() {
            before_words.extend(normalized_words(description));
        }
        if let Some(description) = after.record.description.as_deref() {
            after_words.extend(normalized_words(description));
        }
    }

    let words_before = count_words(&before_words);
    let words_after = count_words(&after_words);
    let mut filtered_words_before = words_before.clone();
    let mut filtered_words_after = words_after.clone();
    for (word, &before_count) in &words_before {
        let Some(&after_count) = words_after.get(word) else {
            continue;
        };
        let lowest = before_count.min(after_count);
        if after_count == lowest {
            filtered_words_after.remove(word);
        } else {
            filtered_words_after.insert(word.clone(), after_count - lowest);
        }
        if before_count == lowest {
            filtered_words_before.remove(word);
        } else {
            filtered_words_before.insert(word.clone(), before_count - lowest);
        }
    }

    MeditationStats {
        average_mood_change_after_meditation: mean(&changes),
        words_before,
        words_after,
        filtered_words_before,
        filtered_words_after,
    }
}

fn count_words(words: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for word in words {
        *counts.entry(word.clone()).or_insert(0) += 1;
    }
    counts
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Location;
    use crate::events::{Event, EventKind, Operation};
    use crate::projection::fold;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn mood_event(id: &str, value: f64, description: Option<&str>) -> Event {
        Event::new(
            ts(id),
            EventKind::Moods(Operation::Create(Mood {
                mood: value,
                description: description.map(str::to_string),
                exploration: None,
                location: None,
            })),
        )
    }

    fn sleep_event(id: &str, date_awoke: &str, minutes: u32) -> Event {
        Event::new(
            ts(id),
            EventKind::Sleeps(Operation::Create(Sleep {
                date_awoke: date_awoke.to_string(),
                minutes_slept: minutes,
            })),
        )
    }

    fn ids(list: &[&str]) -> Vec<Timestamp> {
        list.iter().map(|s| ts(s)).collect()
    }

    #[test]
    fn test_ids_in_interval_is_closed() {
        let all = ids(&[
            "2020-01-01T00:00:00.000Z",
            "2020-01-02T00:00:00.000Z",
            "2020-01-03T00:00:00.000Z",
            "2020-01-04T00:00:00.000Z",
        ]);
        let got = ids_in_interval(&all, &ts("2020-01-02T00:00:00.000Z"), &ts("2020-01-03T00:00:00.000Z"));
        assert_eq!(got, &all[1..3]);
        let none = ids_in_interval(&all, &ts("2021-01-01T00:00:00.000Z"), &ts("2021-02-01T00:00:00.000Z"));
        assert!(none.is_empty());
    }

    #[test]
    fn test_enveloping_ids_add_neighbours() {
        let all = ids(&[
            "2020-01-01T00:00:00.000Z",
            "2020-01-02T00:00:00.000Z",
            "2020-01-03T00:00:00.000Z",
            "2020-01-04T00:00:00.000Z",
        ]);
        let got = enveloping_ids(&all, &ts("2020-01-02T12:00:00.000Z"), &ts("2020-01-02T13:00:00.000Z"));
        assert_eq!(got, &all[1..3]);
        let edge = enveloping_ids(&all, &ts("2019-01-01T00:00:00.000Z"), &ts("2020-01-01T00:00:00.000Z"));
        assert_eq!(edge, &all[0..2]);
    }

    #[test]
    fn test_mood_ids_by_date_uses_local_date() {
        let p = fold(&[
            mood_event("2020-04-05T22:00:00.000Z", 5.0, None),
            mood_event("2020-04-05T23:30:00.000Z", 6.0, None),
        ]);
        let utc = mood_ids_by_date(&p.moods, &PeriodCalendar::default());
        assert_eq!(utc.len(), 1);
        assert_eq!(utc["2020-04-05"].len(), 2);

        let plus_one = PeriodCalendar::new(
            chrono::FixedOffset::east_opt(3600).unwrap(),
            chrono::Weekday::Mon,
        );
        let shifted = mood_ids_by_date(&p.moods, &plus_one);
        assert_eq!(shifted["2020-04-05"], ids(&["2020-04-05T22:00:00.000Z"]));
        assert_eq!(shifted["2020-04-06"], ids(&["2020-04-05T23:30:00.000Z"]));
    }

    #[test]
    fn test_denormalize_carries_created_at() {
        let p = fold(&[mood_event("2020-04-05T22:00:00.000Z", 5.0, None)]);
        let listed = denormalize(&p.moods);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_at, ts("2020-04-05T22:00:00.000Z"));
        let v = serde_json::to_value(&listed[0]).unwrap();
        assert_eq!(v["createdAt"], "2020-04-05T22:00:00.000Z");
        assert_eq!(v["mood"], 5.0);
    }

    #[test]
    fn test_interval_totals() {
        let p = fold(&[
            Event::new(
                ts("2020-01-01T00:00:00.000Z"),
                EventKind::Weights(Operation::Create(Weight { value: 70.0, location: None })),
            ),
            Event::new(
                ts("2020-01-02T00:00:00.000Z"),
                EventKind::Weights(Operation::Create(Weight { value: 72.0, location: None })),
            ),
            Event::new(
                ts("2020-01-02T01:00:00.000Z"),
                EventKind::PushUps(Operation::Create(PushUp { value: 20, location: None })),
            ),
            Event::new(
                ts("2020-01-02T02:00:00.000Z"),
                EventKind::PushUps(Operation::Create(PushUp { value: 15, location: None })),
            ),
            Event::new(
                ts("2020-01-02T03:00:00.000Z"),
                EventKind::Meditations(Operation::Create(Meditation { seconds: 600, location: None })),
            ),
        ]);
        let from = ts("2020-01-01T00:00:00.000Z");
        let to = ts("2020-01-31T00:00:00.000Z");
        assert_eq!(mean_weight_in_period(&p.weights, &from, &to), Some(71.0));
        assert_eq!(total_push_ups_in_period(&p.push_ups, &from, &to), 35);
        assert_eq!(seconds_meditated_in_period(&p.meditations, &from, &to), 600);
        assert_eq!(
            mean_weight_in_period(&p.weights, &ts("2021-01-01T00:00:00.000Z"), &ts("2021-02-01T00:00:00.000Z")),
            None
        );
    }

    #[test]
    fn test_meditation_seconds_by_month_is_dense() {
        let p = fold(&[
            Event::new(
                ts("2020-01-05T00:00:00.000Z"),
                EventKind::Meditations(Operation::Create(Meditation { seconds: 300, location: None })),
            ),
            Event::new(
                ts("2020-03-05T00:00:00.000Z"),
                EventKind::Meditations(Operation::Create(Meditation { seconds: 120, location: None })),
            ),
        ]);
        let by_month = meditation_seconds_by_month(&p.meditations, &PeriodCalendar::default());
        let expected: PeriodBuckets = [
            ("2020-01-01".to_string(), 300.0),
            ("2020-02-01".to_string(), 0.0),
            ("2020-03-01".to_string(), 120.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(by_month, expected);
    }

    #[test]
    fn test_sleep_summaries() {
        let p = fold(&[
            sleep_event("2020-01-01T09:00:00.000Z", "2020-01-01", 420),
            sleep_event("2020-01-01T15:00:00.000Z", "2020-01-01", 30),
            sleep_event("2020-01-03T09:00:00.000Z", "2020-01-03", 390),
            sleep_event("2020-02-01T09:00:00.000Z", "2020-02-01", 480),
        ]);
        let by_date = minutes_slept_by_date_awoke(&p.sleeps);
        assert_eq!(by_date["2020-01-01"], 450);
        assert_eq!(by_date["2020-01-03"], 390);

        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert_eq!(
            mean_daily_sleep_in_period(&p.sleeps, d("2020-01-01"), d("2020-01-04")),
            Some(420.0)
        );
        // `to` is exclusive.
        assert_eq!(
            mean_daily_sleep_in_period(&p.sleeps, d("2020-01-01"), d("2020-01-03")),
            Some(450.0)
        );
        assert_eq!(
            mean_daily_sleep_in_period(&p.sleeps, d("2020-01-04"), d("2020-01-10")),
            None
        );

        let by_month = mean_minutes_slept_by_month(&p.sleeps);
        assert_eq!(by_month["2020-01"], 420.0);
        assert_eq!(by_month["2020-02"], 480.0);
    }

    #[test]
    fn test_description_words_sorted_and_distinct() {
        let p = fold(&[
            mood_event("2020-01-01T00:00:00.000Z", 5.0, Some("Happy  calm")),
            mood_event("2020-01-02T00:00:00.000Z", 6.0, Some("calm Tired")),
            mood_event("2020-01-03T00:00:00.000Z", 6.0, None),
        ]);
        assert_eq!(description_words(&p.moods), vec!["calm", "happy", "tired"]);
    }

    #[test]
    fn test_mood_cloud_needs_enough_words() {
        let p = fold(&[
            mood_event("2020-01-01T00:00:00.000Z", 5.0, Some("happy calm")),
            mood_event("2020-01-02T00:00:00.000Z", 6.0, Some("calm tired rested")),
            mood_event("2020-01-03T00:00:00.000Z", 6.0, Some("focused")),
        ]);
        let from = ts("2020-01-01T00:00:00.000Z");
        assert_eq!(mood_cloud_words(&p.moods, &from, &ts("2020-01-02T00:00:00.000Z")), None);

        let cloud = mood_cloud_words(&p.moods, &from, &ts("2020-01-03T00:00:00.000Z")).unwrap();
        assert_eq!(cloud.len(), 5);
        assert_eq!(cloud["calm"], 2);
        assert_eq!(cloud["focused"], 1);
    }

    const HERE: Location = Location { latitude: 51.5, longitude: -0.1 };

    #[test]
    fn test_location_queries_skip_unlocated_records() {
        let p = fold(&[
            Event::new(
                ts("2020-01-01T00:00:00.000Z"),
                EventKind::Moods(Operation::Create(Mood {
                    mood: 5.0,
                    description: None,
                    exploration: None,
                    location: Some(HERE),
                })),
            ),
            mood_event("2020-01-02T00:00:00.000Z", 6.0, None),
            Event::new(
                ts("2020-01-03T00:00:00.000Z"),
                EventKind::Weights(Operation::Create(Weight { value: 70.0, location: Some(HERE) })),
            ),
            sleep_event("2020-01-04T00:00:00.000Z", "2020-01-04", 400),
            Event::new(
                ts("2020-01-05T00:00:00.000Z"),
                EventKind::PushUps(Operation::Create(PushUp { value: 10, location: Some(HERE) })),
            ),
        ]);
        let located = ids(&[
            "2020-01-01T00:00:00.000Z",
            "2020-01-03T00:00:00.000Z",
            "2020-01-05T00:00:00.000Z",
        ]);
        assert_eq!(ids_with_location(&p.all), located);
        assert_eq!(mood_ids_with_location(&p.moods), ids(&["2020-01-01T00:00:00.000Z"]));

        let from = ts("2020-01-02T00:00:00.000Z");
        let to = ts("2020-01-04T00:00:00.000Z");
        assert_eq!(
            ids_with_location_in_period(&p.all, &from, &to),
            ids(&["2020-01-03T00:00:00.000Z"])
        );
        assert!(mood_ids_with_location_in_period(&p.moods, &from, &to).is_empty());
        assert_eq!(enveloping_ids_with_location(&p.all, &from, &to), located);
    }

    #[test]
    fn test_all_entries_by_date_puts_sleeps_first() {
        let p = fold(&[
            Event::new(
                ts("2020-01-02T07:00:00.000Z"),
                EventKind::Weights(Operation::Create(Weight { value: 70.0, location: None })),
            ),
            mood_event("2020-01-02T08:00:00.000Z", 6.0, None),
            sleep_event("2020-01-02T09:00:00.000Z", "2020-01-02", 420),
            // Logged late for an earlier night.
            sleep_event("2020-01-03T10:00:00.000Z", "2020-01-01", 380),
        ]);
        let by_date = all_entries_by_date(&p.all, &PeriodCalendar::default());
        assert_eq!(by_date.len(), 2);
        assert_eq!(
            by_date["2020-01-01"],
            vec![DatedEntry { id: ts("2020-01-03T10:00:00.000Z"), category: Category::Sleeps }]
        );
        let day: Vec<(Timestamp, Category)> =
            by_date["2020-01-02"].iter().map(|e| (e.id, e.category)).collect();
        assert_eq!(
            day,
            vec![
                (ts("2020-01-02T09:00:00.000Z"), Category::Sleeps),
                (ts("2020-01-02T07:00:00.000Z"), Category::Weights),
                (ts("2020-01-02T08:00:00.000Z"), Category::Moods),
            ]
        );
        assert_eq!(
            serde_json::to_value(by_date["2020-01-02"][0]).unwrap(),
            serde_json::json!({ "id": "2020-01-02T09:00:00.000Z", "type": "sleeps" })
        );
    }

    #[test]
    fn test_sleeps_sorted_by_date_awoke_is_stable() {
        let p = fold(&[
            sleep_event("2020-01-03T09:00:00.000Z", "2020-01-03", 400),
            sleep_event("2020-01-03T10:00:00.000Z", "2020-01-01", 410),
            sleep_event("2020-01-03T11:00:00.000Z", "2020-01-03", 20),
            sleep_event("2020-01-03T12:00:00.000Z", "2020-01-02", 430),
        ]);
        let sorted = sleeps_sorted_by_date_awoke(&p.sleeps);
        assert_eq!(
            sorted.ordered_ids,
            ids(&[
                "2020-01-03T10:00:00.000Z",
                "2020-01-03T12:00:00.000Z",
                "2020-01-03T09:00:00.000Z",
                "2020-01-03T11:00:00.000Z",
            ])
        );
        assert_eq!(sorted.by_id, p.sleeps.by_id);
    }

    #[test]
    fn test_meditation_stats_pairs_nearby_moods() {
        let meditation = |id: &str, seconds: u64| {
            Event::new(
                ts(id),
                EventKind::Meditations(Operation::Create(Meditation { seconds, location: None })),
            )
        };
        let p = fold(&[
            mood_event("2020-01-01T08:00:00.000Z", 4.0, Some("Tired calm restless")),
            meditation("2020-01-01T09:00:00.000Z", 600),
            mood_event("2020-01-01T09:30:00.000Z", 7.0, Some("calm calm tired")),
            // Nearest moods are 10 hours away on both sides.
            meditation("2020-01-01T20:00:00.000Z", 600),
            mood_event("2020-01-02T06:00:00.000Z", 5.0, Some("groggy")),
        ]);
        let stats = meditation_stats(&p.meditations, &p.moods);
        assert_eq!(stats.average_mood_change_after_meditation, Some(3.0));

        let counts = |pairs: &[(&str, usize)]| -> BTreeMap<String, usize> {
            pairs.iter().map(|(w, n)| (w.to_string(), *n)).collect()
        };
        assert_eq!(stats.words_before, counts(&[("calm", 1), ("restless", 1), ("tired", 1)]));
        assert_eq!(stats.words_after, counts(&[("calm", 2), ("tired", 1)]));
        assert_eq!(stats.filtered_words_before, counts(&[("restless", 1)]));
        assert_eq!(stats.filtered_words_after, counts(&[("calm", 1)]));
    }

    #[test]
    fn test_meditation_stats_without_moods() {
        let p = fold(&[Event::new(
            ts("2020-01-01T09:00:00.000Z"),
            EventKind::Meditations(Operation::Create(Meditation { seconds: 60, location: None })),
        )]);
        assert_eq!(meditation_stats(&p.meditations, &p.moods), MeditationStats::default());
    }
}
