//! Replay orchestrator — rebuild projections from an event list.
//!
//! Delegates all domain logic to the engine. No cached state: every call
//! folds from an empty log.

use tracker_engine::domain::Projections;
use tracker_engine::engine::TrackerEngine;
use tracker_engine::events::Event;
use tracker_engine::hashing::canonical_hash;
use tracker_engine::period::PeriodCalendar;

/// Rebuild projections from events in any order.
///
/// 1. Merge the events into a fresh log (dedup + sort)
/// 2. Fold the whole log
/// 3. Return (projections, canonical_hash)
pub fn rebuild_state(events: &[Event]) -> (Projections, String) {
    let mut engine = TrackerEngine::new(PeriodCalendar::default());
    engine.merge_from_remote(events.to_vec(), None);
    let projections = (*engine.projections()).clone();
    let hash = canonical_hash(&projections);
    (projections, hash)
}

pub fn rebuild_hash(events: &[Event]) -> String {
    let (_, hash) = rebuild_state(events);
    hash
}

/// Replay twice, the second time in reverse arrival order, and compare.
/// `Err` carries both hashes.
pub fn verify_determinism(events: &[Event]) -> Result<String, (String, String)> {
    let first = rebuild_hash(events);
    let mut reversed = events.to_vec();
    reversed.reverse();
    let second = rebuild_hash(&reversed);
    if first == second {
        Ok(first)
    } else {
        Err((first, second))
    }
}
