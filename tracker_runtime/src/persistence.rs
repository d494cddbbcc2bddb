//! Persistence collaborator — where the encoded snapshot lives between runs.
//!
//! The store only moves strings. Encoding, validation and replacing the
//! session's log happen here, around the store call, with the session
//! lock released during I/O.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::session::{SessionPoisoned, SharedSession};
use crate::snapshot_codec::{encode_snapshot, restore_snapshot, SnapshotError};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend failed: {0}")]
    Backend(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    SessionPoisoned(#[from] SessionPoisoned),
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// The last saved snapshot, if any.
    async fn load(&self) -> Result<Option<String>, PersistenceError>;

    async fn save(&self, snapshot: String) -> Result<(), PersistenceError>;
}

/// Keeps the snapshot in memory. For tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: String) -> Self {
        Self {
            slot: Mutex::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, snapshot: String) -> Result<(), PersistenceError> {
        *self.slot.lock().await = Some(snapshot);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session <-> store
// ---------------------------------------------------------------------------

/// Encode the session's log and hand it to the store.
pub async fn persist_session<S: StateStore + ?Sized>(
    session: &SharedSession,
    store: &S,
) -> Result<(), PersistenceError> {
    let stored = session.with(|s| s.state_to_store())?;
    let json = encode_snapshot(&stored)?;
    store.save(json).await?;
    info!(events = stored.ordered_ids.len(), "persist: snapshot saved");
    Ok(())
}

/// Load the stored snapshot, validate it and replace the session's log.
/// Returns `false` when the store is empty.
pub async fn restore_session<S: StateStore + ?Sized>(
    session: &SharedSession,
    store: &S,
) -> Result<bool, PersistenceError> {
    let Some(json) = store.load().await? else {
        return Ok(false);
    };
    let stored = restore_snapshot(&json)?;
    let events = stored.ordered_ids.len();
    session
        .with(|s| s.load_from_storage(stored))?
        .map_err(SnapshotError::from)?;
    info!(events, "restore: snapshot loaded");
    Ok(true)
}
