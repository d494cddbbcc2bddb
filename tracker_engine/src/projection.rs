//! Tracker Engine — Category Projector
//!
//! ALL projection logic lives here.
//! A single left-to-right fold over the log, dispatching exhaustively on
//! `(category, operation)`. Inconsistent events are skipped with a
//! diagnostic; the fold never aborts.

use tracing::warn;

use crate::domain::{
    AllProjection, CategoryProjection, Entry, FoldDiagnostic, Projections, TrackedRecord,
};
use crate::events::{Event, EventKind, Operation, Update};
use crate::timestamp::Timestamp;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fold `events` (in log order) from empty projections.
pub fn fold<'a>(events: impl IntoIterator<Item = &'a Event>) -> Projections {
    let mut projections = Projections::default();
    for event in events {
        fold_into(&mut projections, event);
    }
    projections
}

/// Apply a single event on top of `projections`.
pub fn fold_into(projections: &mut Projections, event: &Event) {
    let p = projections;
    let diagnostic = match &event.kind {
        EventKind::Moods(op) => fold_operation(event.id, op, &mut p.moods, &mut p.all),
        EventKind::Meditations(op) => {
            fold_operation(event.id, op, &mut p.meditations, &mut p.all)
        }
        EventKind::Weights(op) => fold_operation(event.id, op, &mut p.weights, &mut p.all),
        EventKind::Sleeps(op) => fold_operation(event.id, op, &mut p.sleeps, &mut p.all),
        EventKind::PushUps(op) => fold_operation(event.id, op, &mut p.push_ups, &mut p.all),
    };
    if let Some(d) = diagnostic {
        warn!(diagnostic = %d, "fold: event skipped");
        p.diagnostics.push(d);
    }
}

// ---------------------------------------------------------------------------
// Operation handlers (private)
// ---------------------------------------------------------------------------

fn fold_operation<R: TrackedRecord>(
    event_id: Timestamp,
    op: &Operation<R>,
    category: &mut CategoryProjection<R>,
    all: &mut AllProjection,
) -> Option<FoldDiagnostic> {
    match op {
        Operation::Create(record) => {
            apply_create(event_id, record, category, all);
            None
        }
        Operation::Delete(target) => apply_delete(event_id, *target, category, all),
        Operation::Update(update) => apply_update(event_id, update, category, all),
    }
}

fn apply_create<R: TrackedRecord>(
    event_id: Timestamp,
    record: &R,
    category: &mut CategoryProjection<R>,
    all: &mut AllProjection,
) {
    let entry = Entry::new(record.clone());
    category.ordered_ids.push(event_id);
    all.ordered_ids.push(event_id);
    all.by_id.insert(event_id, R::tag(entry.clone()));
    category.by_id.insert(event_id, entry);
}

fn apply_delete<R: TrackedRecord>(
    event_id: Timestamp,
    target: Timestamp,
    category: &mut CategoryProjection<R>,
    all: &mut AllProjection,
) -> Option<FoldDiagnostic> {
    // Deletes usually hit recent records, so search from the end.
    let Some(pos) = category.ordered_ids.iter().rposition(|id| *id == target) else {
        return Some(FoldDiagnostic::DeleteTargetMissing {
            event_id,
            category: R::CATEGORY,
            target_id: target,
        });
    };
    category.ordered_ids.remove(pos);
    category.by_id.remove(&target);
    if let Some(pos) = all.ordered_ids.iter().rposition(|id| *id == target) {
        all.ordered_ids.remove(pos);
    }
    all.by_id.remove(&target);
    None
}

fn apply_update<R: TrackedRecord>(
    event_id: Timestamp,
    update: &Update<R::Patch>,
    category: &mut CategoryProjection<R>,
    all: &mut AllProjection,
) -> Option<FoldDiagnostic> {
    let target = update.target_id;
    let Some(entry) = category.by_id.get_mut(&target) else {
        return Some(FoldDiagnostic::UpdateTargetMissing {
            event_id,
            category: R::CATEGORY,
            target_id: target,
        });
    };
    entry.record.apply_patch(&update.patch);
    entry.updated_at = Some(event_id);
    all.by_id.insert(target, R::tag(entry.clone()));
    None
}
