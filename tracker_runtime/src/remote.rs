//! Remote API collaborator — the authority events are pushed to and
//! pulled from.
//!
//! Transport is out of scope here; `RemoteApi` is the seam. `MemoryRemote`
//! is an in-process authority used by tests and the replay binary.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use tracker_engine::events::Event;
use tracker_engine::timestamp::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("remote unavailable: {0}")]
    Unavailable(String),
    #[error("remote rejected request: {0}")]
    Rejected(String),
    #[error("invalid cursor {0:?}")]
    InvalidCursor(String),
}

/// One page of a pull. `cursor` resumes after this page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullResponse {
    pub events: Vec<Event>,
    pub cursor: Option<String>,
}

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Events the caller has not seen since `cursor`, in no particular order.
    async fn pull(&self, cursor: Option<String>) -> Result<PullResponse, RemoteError>;

    /// Store `events`. Re-sending an already stored id is not an error.
    async fn push(&self, events: &[Event]) -> Result<(), RemoteError>;
}

// ---------------------------------------------------------------------------
// In-memory authority
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RemoteState {
    /// Arrival order. The cursor is an index into it.
    arrivals: Vec<Timestamp>,
    events: BTreeMap<Timestamp, Event>,
}

/// In-process authority. Pages come back newest-first so callers cannot
/// rely on ordering.
#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<RemoteState>,
    page_size: usize,
    failing: AtomicBool,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new(100)
    }
}

impl MemoryRemote {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Mutex::new(RemoteState::default()),
            page_size: page_size.max(1),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every following call fail with `RemoteError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Store events as if another device had pushed them.
    pub async fn seed(&self, events: Vec<Event>) {
        let mut state = self.state.lock().await;
        for event in events {
            insert(&mut state, event);
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.events.len()
    }

    pub async fn contains(&self, id: &Timestamp) -> bool {
        self.state.lock().await.events.contains_key(id)
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("memory remote switched off".to_string()));
        }
        Ok(())
    }
}

fn insert(state: &mut RemoteState, event: Event) {
    if state.events.contains_key(&event.id) {
        return;
    }
    state.arrivals.push(event.id);
    state.events.insert(event.id, event);
}

#[async_trait]
impl RemoteApi for MemoryRemote {
    async fn pull(&self, cursor: Option<String>) -> Result<PullResponse, RemoteError> {
        self.check_available()?;
        let state = self.state.lock().await;

        let start = match cursor {
            None => 0,
            Some(c) => c
                .parse::<usize>()
                .ok()
                .filter(|i| *i <= state.arrivals.len())
                .ok_or(RemoteError::InvalidCursor(c))?,
        };
        let end = (start + self.page_size).min(state.arrivals.len());

        let mut events: Vec<Event> = state.arrivals[start..end]
            .iter()
            .filter_map(|id| state.events.get(id).cloned())
            .collect();
        events.reverse();

        Ok(PullResponse {
            events,
            cursor: Some(end.to_string()),
        })
    }

    async fn push(&self, events: &[Event]) -> Result<(), RemoteError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        for event in events {
            insert(&mut state, event.clone());
        }
        Ok(())
    }
}
