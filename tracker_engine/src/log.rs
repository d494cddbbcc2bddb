//! Tracker Engine — Event Log
//!
//! Owns the ordered set of events. Two ways in:
//!   - `append`            local events; ids bumped to stay strictly increasing
//!   - `merge_from_remote` remote batches; deduplicated, fully re-sorted
//!
//! The log only grows. A Delete event is itself stored.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::Event;
use crate::timestamp::Timestamp;

/// The persisted shape of the log. Sync flags are transient and never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLog {
    pub ordered_ids: Vec<Timestamp>,
    pub by_id: BTreeMap<Timestamp, Event>,
    pub has_loaded_from_server: bool,
    pub ids_pending_push: Vec<Timestamp>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// What a remote merge did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The batch was empty.
    Empty,
    /// Every id in the batch was already stored.
    AlreadyPresent,
    /// `inserted` new events were stored and the ids re-sorted.
    Merged { inserted: usize },
}

/// Append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    ordered_ids: Vec<Timestamp>,
    by_id: BTreeMap<Timestamp, Event>,
    next_cursor: Option<String>,
    has_loaded_from_server: bool,
    ids_pending_push: Vec<Timestamp>,
    /// Bumped whenever the stored event set changes.
    version: u64,
    /// Bumped whenever `ordered_ids` is rebuilt rather than extended.
    epoch: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Local append ----------------------------------------------------

    /// Append a locally created event and queue it for push.
    ///
    /// If the submitted id is not strictly after the last stored id, the
    /// event is re-stamped to `last + 1ms`. Returns the id actually stored.
    pub fn append(&mut self, mut event: Event) -> Timestamp {
        if let Some(last) = self.last_id().copied() {
            if event.id <= last {
                let bumped = last.next_millisecond();
                debug!(submitted = %event.id, stored = %bumped, "append: id bumped past last event");
                event.id = bumped;
            }
        }
        let id = event.id;
        self.ordered_ids.push(id);
        self.by_id.insert(id, event);
        self.ids_pending_push.push(id);
        self.version += 1;
        id
    }

    // -- Remote merge ----------------------------------------------------

    /// Reconcile a pulled batch into the log.
    ///
    /// The remote gives no ordering guarantee, so a non-trivial merge
    /// re-sorts the full id set. Ids already stored keep their event.
    pub fn merge_from_remote(&mut self, batch: Vec<Event>, cursor: Option<String>) -> MergeOutcome {
        self.next_cursor = cursor;
        self.has_loaded_from_server = true;

        if batch.is_empty() {
            return MergeOutcome::Empty;
        }
        if batch.iter().all(|e| self.by_id.contains_key(&e.id)) {
            debug!(batch = batch.len(), "merge: batch already present");
            return MergeOutcome::AlreadyPresent;
        }

        let was_empty = self.ordered_ids.is_empty();
        let mut incoming: Vec<Timestamp> = Vec::with_capacity(batch.len());
        let mut inserted = 0usize;
        for event in batch {
            incoming.push(event.id);
            if !self.by_id.contains_key(&event.id) {
                self.by_id.insert(event.id, event);
                inserted += 1;
            }
        }

        self.ordered_ids = if was_empty {
            incoming.sort();
            incoming.dedup();
            incoming
        } else {
            let union: BTreeSet<Timestamp> = self
                .ordered_ids
                .iter()
                .copied()
                .chain(incoming)
                .collect();
            union.into_iter().collect()
        };

        self.version += 1;
        self.epoch += 1;
        debug!(inserted, total = self.ordered_ids.len(), "merge: re-sorted log");
        MergeOutcome::Merged { inserted }
    }

    /// A pull attempt finished without data (e.g. it failed). Loading
    /// indicators must still resolve.
    pub fn mark_loaded_from_server(&mut self) {
        self.has_loaded_from_server = true;
    }

    // -- Push queue ------------------------------------------------------

    /// Events still waiting for the remote, in queue order.
    pub fn pending_events(&self) -> Vec<Event> {
        self.ids_pending_push
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect()
    }

    /// Drop acknowledged ids from the push queue. Ids appended after the
    /// push started stay queued.
    pub fn acknowledge_pushed(&mut self, pushed: &[Timestamp]) {
        let pushed: BTreeSet<&Timestamp> = pushed.iter().collect();
        self.ids_pending_push.retain(|id| !pushed.contains(id));
    }

    // -- Snapshot --------------------------------------------------------

    /// The persisted fields of the log.
    pub fn to_stored(&self) -> StoredLog {
        StoredLog {
            ordered_ids: self.ordered_ids.clone(),
            by_id: self.by_id.clone(),
            has_loaded_from_server: self.has_loaded_from_server,
            ids_pending_push: self.ids_pending_push.clone(),
            next_cursor: self.next_cursor.clone(),
        }
    }

    /// Replace every persisted field with `stored`. No merge logic runs;
    /// callers validate the snapshot first.
    pub fn load_stored(&mut self, stored: StoredLog) {
        self.ordered_ids = stored.ordered_ids;
        self.by_id = stored.by_id;
        self.has_loaded_from_server = stored.has_loaded_from_server;
        self.ids_pending_push = stored.ids_pending_push;
        self.next_cursor = stored.next_cursor;
        self.version += 1;
        self.epoch += 1;
    }

    pub fn from_stored(stored: StoredLog) -> Self {
        let mut log = Self::new();
        log.load_stored(stored);
        log
    }

    /// Forget everything (e.g. on sign-out).
    pub fn clear(&mut self) {
        let version = self.version + 1;
        let epoch = self.epoch + 1;
        *self = Self::default();
        self.version = version;
        self.epoch = epoch;
    }

    // -- Accessors -------------------------------------------------------

    pub fn ordered_ids(&self) -> &[Timestamp] {
        &self.ordered_ids
    }

    pub fn get(&self, id: &Timestamp) -> Option<&Event> {
        self.by_id.get(id)
    }

    pub fn by_id(&self) -> &BTreeMap<Timestamp, Event> {
        &self.by_id
    }

    /// Events in log order.
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.ordered_ids.iter().filter_map(move |id| self.by_id.get(id))
    }

    pub fn last_id(&self) -> Option<&Timestamp> {
        self.ordered_ids.last()
    }

    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }

    pub fn ids_pending_push(&self) -> &[Timestamp] {
        &self.ids_pending_push
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    pub fn has_loaded_from_server(&self) -> bool {
        self.has_loaded_from_server
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
