//! Tracker Engine — Log Invariant Checks
//!
//! Hard rules every `EventLog` / `StoredLog` must satisfy:
//!   - ordered ids strictly increasing (sorted, no duplicates)
//!   - `by_id` holds exactly the ordered ids, each under its own id
//!   - every pending-push id is stored
//!
//! `validate_*` returns the first violation; snapshot restore uses it to
//! refuse corrupt state instead of folding it.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::log::{EventLog, StoredLog};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogInvariantError {
    #[error("[INVARIANT:ordering] id {next} does not follow {prev}")]
    OutOfOrder { prev: Timestamp, next: Timestamp },
    #[error("[INVARIANT:ordering] id {0} appears more than once")]
    Duplicate(Timestamp),
    #[error("[INVARIANT:stored_ids] ordered id {0} has no stored event")]
    MissingEvent(Timestamp),
    #[error("[INVARIANT:stored_ids] stored event {0} is not in the ordered ids")]
    UnorderedEvent(Timestamp),
    #[error("[INVARIANT:stored_ids] event stored under {key} carries id {id}")]
    MismatchedId { key: Timestamp, id: Timestamp },
    #[error("[INVARIANT:pending_push] pending id {0} has no stored event")]
    UnknownPending(Timestamp),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn validate_log(log: &EventLog) -> Result<(), LogInvariantError> {
    check_ordering(log.ordered_ids())?;
    check_stored_ids(log.ordered_ids(), log.by_id().iter().map(|(k, e)| (k, &e.id)))?;
    check_pending(log.ids_pending_push(), |id| log.get(id).is_some())?;
    Ok(())
}

pub fn validate_stored(stored: &StoredLog) -> Result<(), LogInvariantError> {
    check_ordering(&stored.ordered_ids)?;
    check_stored_ids(&stored.ordered_ids, stored.by_id.iter().map(|(k, e)| (k, &e.id)))?;
    check_pending(&stored.ids_pending_push, |id| stored.by_id.contains_key(id))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn check_ordering(ids: &[Timestamp]) -> Result<(), LogInvariantError> {
    for pair in ids.windows(2) {
        if pair[0] == pair[1] {
            return Err(LogInvariantError::Duplicate(pair[1]));
        }
        if pair[0] > pair[1] {
            return Err(LogInvariantError::OutOfOrder {
                prev: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}

fn check_stored_ids<'a>(
    ordered: &[Timestamp],
    stored: impl Iterator<Item = (&'a Timestamp, &'a Timestamp)>,
) -> Result<(), LogInvariantError> {
    let ordered_set: BTreeSet<&Timestamp> = ordered.iter().collect();
    let mut stored_keys: BTreeSet<&Timestamp> = BTreeSet::new();
    for (key, id) in stored {
        if key != id {
            return Err(LogInvariantError::MismatchedId { key: *key, id: *id });
        }
        if !ordered_set.contains(key) {
            return Err(LogInvariantError::UnorderedEvent(*key));
        }
        stored_keys.insert(key);
    }
    match ordered.iter().find(|id| !stored_keys.contains(id)) {
        Some(id) => Err(LogInvariantError::MissingEvent(*id)),
        None => Ok(()),
    }
}

fn check_pending(
    pending: &[Timestamp],
    exists: impl Fn(&Timestamp) -> bool,
) -> Result<(), LogInvariantError> {
    match pending.iter().find(|id| !exists(id)) {
        Some(id) => Err(LogInvariantError::UnknownPending(*id)),
        None => Ok(()),
    }
}
