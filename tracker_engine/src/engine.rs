//! Tracker Engine — Engine
//!
//! Top-level orchestrator. Owns the log, derives projections on demand.
//!
//! Projections are memoized against the log's `(version, epoch)`:
//!   - same version           reuse the cached projections
//!   - same epoch, longer log fold only the appended tail
//!   - anything else          full rebuild from empty

use std::sync::Arc;

use tracing::debug;

use crate::aggregate::{mean_moods_by, PeriodBuckets};
use crate::domain::Projections;
use crate::events::Event;
use crate::log::{EventLog, MergeOutcome};
use crate::period::{Granularity, PeriodCalendar};
use crate::projection::{fold, fold_into};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone)]
struct ProjectionCache {
    version: u64,
    epoch: u64,
    folded: usize,
    projections: Arc<Projections>,
}

/// Stateful engine wrapping the pure log + fold layers.
#[derive(Debug, Clone, Default)]
pub struct TrackerEngine {
    log: EventLog,
    calendar: PeriodCalendar,
    cache: Option<ProjectionCache>,
}

impl TrackerEngine {
    pub fn new(calendar: PeriodCalendar) -> Self {
        Self::with_log(EventLog::new(), calendar)
    }

    pub fn with_log(log: EventLog, calendar: PeriodCalendar) -> Self {
        Self {
            log,
            calendar,
            cache: None,
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Direct log access. Every change to the event set moves the log's
    /// counters, so cached projections stay correct.
    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    pub fn calendar(&self) -> &PeriodCalendar {
        &self.calendar
    }

    /// Append a local event. Returns the id it was stored under.
    pub fn append(&mut self, event: Event) -> Timestamp {
        self.log.append(event)
    }

    pub fn merge_from_remote(&mut self, batch: Vec<Event>, cursor: Option<String>) -> MergeOutcome {
        self.log.merge_from_remote(batch, cursor)
    }

    /// Current projections, re-derived only as far as the log has moved.
    pub fn projections(&mut self) -> Arc<Projections> {
        let version = self.log.version();
        let epoch = self.log.epoch();

        if let Some(cache) = &self.cache {
            if cache.version == version {
                return Arc::clone(&cache.projections);
            }
        }

        let (projections, folded) = match self.cache.take() {
            Some(cache) if cache.epoch == epoch && cache.folded <= self.log.len() => {
                let mut projections = (*cache.projections).clone();
                let tail = &self.log.ordered_ids()[cache.folded..];
                debug!(tail = tail.len(), "projections: folding appended tail");
                for id in tail {
                    if let Some(event) = self.log.get(id) {
                        fold_into(&mut projections, event);
                    }
                }
                (projections, self.log.len())
            }
            _ => {
                debug!(events = self.log.len(), "projections: full rebuild");
                (fold(self.log.events()), self.log.len())
            }
        };

        let projections = Arc::new(projections);
        self.cache = Some(ProjectionCache {
            version,
            epoch,
            folded,
            projections: Arc::clone(&projections),
        });
        projections
    }

    /// Mood means per period of `granularity`.
    pub fn mean_moods_by(&mut self, granularity: Granularity) -> PeriodBuckets {
        let projections = self.projections();
        mean_moods_by(&projections.moods, &self.calendar, granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Mood;
    use crate::events::{EventKind, Operation};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn create_mood(id: &str, value: f64) -> Event {
        Event::new(
            ts(id),
            EventKind::Moods(Operation::Create(Mood {
                mood: value,
                description: None,
                exploration: None,
                location: None,
            })),
        )
    }

    #[test]
    fn test_projections_reused_when_log_unchanged() {
        let mut engine = TrackerEngine::default();
        engine.append(create_mood("2020-04-05T00:00:00.000Z", 5.0));
        let a = engine.projections();
        let b = engine.projections();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_incremental_tail_matches_full_rebuild() {
        let mut engine = TrackerEngine::default();
        engine.append(create_mood("2020-04-05T00:00:00.000Z", 5.0));
        let _ = engine.projections();
        engine.append(create_mood("2020-04-06T00:00:00.000Z", 6.0));
        engine.append(Event::new(
            ts("2020-04-07T00:00:00.000Z"),
            EventKind::Moods(Operation::Delete(ts("2020-04-05T00:00:00.000Z"))),
        ));
        let incremental = engine.projections();
        assert_eq!(*incremental, fold(engine.log().events()));
        assert_eq!(incremental.moods.len(), 1);
    }

    #[test]
    fn test_merge_forces_rebuild_in_log_order() {
        let mut engine = TrackerEngine::default();
        engine.append(create_mood("2020-04-07T00:00:00.000Z", 7.0));
        let _ = engine.projections();
        engine.merge_from_remote(vec![create_mood("2020-04-05T00:00:00.000Z", 5.0)], None);
        let p = engine.projections();
        assert_eq!(
            p.moods.ordered_ids,
            vec![ts("2020-04-05T00:00:00.000Z"), ts("2020-04-07T00:00:00.000Z")]
        );
    }

    #[test]
    fn test_mean_moods_by_day() {
        let mut engine = TrackerEngine::default();
        engine.append(create_mood("2020-04-05T00:00:00.000Z", 3.0));
        engine.append(create_mood("2020-04-09T00:00:00.000Z", 9.0));
        let buckets = engine.mean_moods_by(Granularity::Day);
        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets["2020-04-05"], 3.75);
        assert_eq!(buckets["2020-04-09"], 9.0);
    }
}
