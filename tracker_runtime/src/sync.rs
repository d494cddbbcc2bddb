//! Sync coordinator — push local events to the remote, pull remote
//! events into the log.
//!
//! Each direction is a small state machine:
//!
//!   Idle ──begin──▶ Syncing ──succeed/fail──▶ Idle (+ error flag)
//!
//! Starting a direction that is already syncing is rejected. The session
//! lock is taken only around the synchronous steps, never across an await.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use tracker_engine::log::MergeOutcome;

use crate::remote::{RemoteApi, RemoteError};
use crate::session::{SessionPoisoned, SharedSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Push,
    Pull,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Push => f.write_str("push"),
            Direction::Pull => f.write_str("pull"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0} already in progress")]
    AlreadySyncing(Direction),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    SessionPoisoned(#[from] SessionPoisoned),
}

// ── State machine ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing,
}

/// Phase plus the outcome of the last finished attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncDirection {
    pub phase: SyncPhase,
    pub error: bool,
}

impl SyncDirection {
    /// Idle -> Syncing. Clears the previous error.
    pub fn begin(&mut self, direction: Direction) -> Result<(), SyncError> {
        if self.phase == SyncPhase::Syncing {
            return Err(SyncError::AlreadySyncing(direction));
        }
        self.phase = SyncPhase::Syncing;
        self.error = false;
        Ok(())
    }

    pub fn succeed(&mut self) {
        self.phase = SyncPhase::Idle;
        self.error = false;
    }

    pub fn fail(&mut self) {
        self.phase = SyncPhase::Idle;
        self.error = true;
    }

    pub fn is_syncing(&self) -> bool {
        self.phase == SyncPhase::Syncing
    }
}

/// Both directions. Transient: never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub push: SyncDirection,
    pub pull: SyncDirection,
}

impl SyncStatus {
    pub fn direction_mut(&mut self, direction: Direction) -> &mut SyncDirection {
        match direction {
            Direction::Push => &mut self.push,
            Direction::Pull => &mut self.pull,
        }
    }
}

// ── Coordinator ────────────────────────────────────────────────────

/// Drives push and pull for one session against one remote.
pub struct SyncCoordinator<R: RemoteApi> {
    session: SharedSession,
    remote: Arc<R>,
}

impl<R: RemoteApi> Clone for SyncCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            remote: Arc::clone(&self.remote),
        }
    }
}

impl<R: RemoteApi> SyncCoordinator<R> {
    pub fn new(session: SharedSession, remote: Arc<R>) -> Self {
        Self { session, remote }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Send every pending event. Returns how many were acknowledged.
    ///
    /// Only the ids sent are acknowledged; events appended while the push
    /// was in flight stay queued for the next push.
    pub async fn push(&self) -> Result<usize, SyncError> {
        let pending = self.session.with(|s| s.begin_push())??;
        if pending.is_empty() {
            self.session.with(|s| s.finish_push(&[], Ok(())))?;
            return Ok(0);
        }

        let ids: Vec<_> = pending.iter().map(|e| e.id).collect();
        let result = self.remote.push(&pending).await;
        let outcome = result.clone();
        self.session.with(|s| s.finish_push(&ids, result))?;

        match outcome {
            Ok(()) => {
                info!(pushed = ids.len(), "push: acknowledged");
                Ok(ids.len())
            }
            Err(e) => {
                warn!(error = %e, queued = ids.len(), "push: failed, events stay queued");
                Err(e.into())
            }
        }
    }

    /// Fetch one page after the stored cursor and merge it.
    pub async fn pull(&self) -> Result<MergeOutcome, SyncError> {
        let cursor = self.session.with(|s| s.begin_pull())??;

        let result = self.remote.pull(cursor).await;
        match result {
            Ok(page) => {
                let received = page.events.len();
                let outcome = self.session.with(|s| s.finish_pull(Ok(page)))?;
                info!(received, ?outcome, "pull: merged");
                Ok(outcome.unwrap_or(MergeOutcome::Empty))
            }
            Err(e) => {
                self.session.with(|s| s.finish_pull(Err(e.clone())))?;
                warn!(error = %e, "pull: failed");
                Err(e.into())
            }
        }
    }

    /// Pull pages until the remote returns an empty one, then push.
    pub async fn sync(&self) -> Result<usize, SyncError> {
        while self.pull().await? != MergeOutcome::Empty {}
        self.push().await
    }
}
