//! Session — one user's engine plus the transient sync state.
//!
//! Concurrency: `SharedSession` wraps the session in a Mutex. Every
//! operation is synchronous under the lock; async callers release it
//! before awaiting.
//!
//! Push / pull are split into begin + finish so the remote call can run
//! outside the lock:
//!   1. begin_*  — Idle check, phase → Syncing, snapshot of what to send
//!   2. (remote call, lock released)
//!   3. finish_* — apply the outcome, phase → Idle

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::debug;

use tracker_engine::aggregate::PeriodBuckets;
use tracker_engine::domain::Projections;
use tracker_engine::engine::TrackerEngine;
use tracker_engine::events::Event;
use tracker_engine::invariants::{validate_stored, LogInvariantError};
use tracker_engine::log::{MergeOutcome, StoredLog};
use tracker_engine::period::{Granularity, PeriodCalendar};
use tracker_engine::timestamp::Timestamp;

use crate::remote::{PullResponse, RemoteError};
use crate::sync::{Direction, SyncError, SyncStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session lock poisoned")]
pub struct SessionPoisoned;

/// The engine and its sync state machines.
#[derive(Debug, Default)]
pub struct Session {
    engine: TrackerEngine,
    sync: SyncStatus,
}

impl Session {
    pub fn new(calendar: PeriodCalendar) -> Self {
        Self {
            engine: TrackerEngine::new(calendar),
            sync: SyncStatus::default(),
        }
    }

    // -- Local writes ----------------------------------------------------

    /// Append a locally created event. Returns the id it was stored under.
    pub fn add_event(&mut self, event: Event) -> Timestamp {
        self.engine.append(event)
    }

    // -- Push ------------------------------------------------------------

    pub fn begin_push(&mut self) -> Result<Vec<Event>, SyncError> {
        self.sync.direction_mut(Direction::Push).begin(Direction::Push)?;
        Ok(self.engine.log().pending_events())
    }

    pub fn finish_push(&mut self, pushed: &[Timestamp], result: Result<(), RemoteError>) {
        match result {
            Ok(()) => {
                self.engine.log_mut().acknowledge_pushed(pushed);
                self.sync.push.succeed();
            }
            Err(_) => self.sync.push.fail(),
        }
    }

    // -- Pull ------------------------------------------------------------

    /// Returns the cursor to resume from.
    pub fn begin_pull(&mut self) -> Result<Option<String>, SyncError> {
        self.sync.direction_mut(Direction::Pull).begin(Direction::Pull)?;
        Ok(self.engine.log().next_cursor().map(str::to_string))
    }

    /// Merge a pulled page, or record the failure. Either way the log
    /// counts as loaded from the server afterwards.
    pub fn finish_pull(&mut self, result: Result<PullResponse, RemoteError>) -> Option<MergeOutcome> {
        match result {
            Ok(page) => {
                let outcome = self.engine.merge_from_remote(page.events, page.cursor);
                self.sync.pull.succeed();
                Some(outcome)
            }
            Err(_) => {
                self.engine.log_mut().mark_loaded_from_server();
                self.sync.pull.fail();
                None
            }
        }
    }

    // -- Storage ---------------------------------------------------------

    /// The persisted part of the session. Sync state is left out.
    pub fn state_to_store(&self) -> StoredLog {
        self.engine.log().to_stored()
    }

    /// Replace the log with a stored snapshot. Refuses snapshots that
    /// break log invariants and leaves the session untouched.
    pub fn load_from_storage(&mut self, stored: StoredLog) -> Result<(), LogInvariantError> {
        validate_stored(&stored)?;
        debug!(events = stored.ordered_ids.len(), "session: loaded from storage");
        self.engine.log_mut().load_stored(stored);
        Ok(())
    }

    /// Forget every event and reset sync state. Refused while either
    /// direction is syncing, so an in-flight result can never land in the
    /// cleared log.
    pub fn clear(&mut self) -> Result<(), SyncError> {
        for direction in [Direction::Push, Direction::Pull] {
            if self.sync.direction_mut(direction).is_syncing() {
                return Err(SyncError::AlreadySyncing(direction));
            }
        }
        self.engine.log_mut().clear();
        self.sync = SyncStatus::default();
        debug!("session: cleared");
        Ok(())
    }

    // -- Reads -----------------------------------------------------------

    pub fn projections(&mut self) -> Arc<Projections> {
        self.engine.projections()
    }

    pub fn mean_moods_by(&mut self, granularity: Granularity) -> PeriodBuckets {
        self.engine.mean_moods_by(granularity)
    }

    pub fn engine(&self) -> &TrackerEngine {
        &self.engine
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync
    }
}

/// Thread-safe session handle using Mutex.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` under the lock. The guard never escapes `f`.
    pub fn with<T>(&self, f: impl FnOnce(&mut Session) -> T) -> Result<T, SessionPoisoned> {
        let mut session = self.inner.lock().map_err(|_| SessionPoisoned)?;
        Ok(f(&mut session))
    }

    pub fn add_event(&self, event: Event) -> Result<Timestamp, SessionPoisoned> {
        self.with(|s| s.add_event(event))
    }

    pub fn projections(&self) -> Result<Arc<Projections>, SessionPoisoned> {
        self.with(|s| s.projections())
    }

    pub fn mean_moods_by(&self, granularity: Granularity) -> Result<PeriodBuckets, SessionPoisoned> {
        self.with(|s| s.mean_moods_by(granularity))
    }

    pub fn sync_status(&self) -> Result<SyncStatus, SessionPoisoned> {
        self.with(|s| s.sync_status())
    }

    pub fn clear(&self) -> Result<(), SyncError> {
        self.with(|s| s.clear())?
    }
}
