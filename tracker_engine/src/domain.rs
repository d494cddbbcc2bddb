//! Tracker Engine — Core Domain Types
//!
//! Pure data. No fold logic lives here beyond field-wise patch merging.
//! Wire field names follow the application's JSON (camelCase).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

// ── Categories ─────────────────────────────────────────────────────

/// A tracked category. The wire name is the second segment of an event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "moods")]
    Moods,
    #[serde(rename = "meditations")]
    Meditations,
    #[serde(rename = "weights")]
    Weights,
    #[serde(rename = "sleeps")]
    Sleeps,
    #[serde(rename = "push-ups")]
    PushUps,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Moods,
        Category::Meditations,
        Category::Weights,
        Category::Sleeps,
        Category::PushUps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Moods => "moods",
            Category::Meditations => "meditations",
            Category::Weights => "weights",
            Category::Sleeps => "sleeps",
            Category::PushUps => "push-ups",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown category {:?}", s))
    }
}

// ── Records ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub mood: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meditation {
    pub seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sleep {
    /// Local calendar date, `YYYY-MM-DD`.
    pub date_awoke: String,
    pub minutes_slept: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushUp {
    pub value: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

// ── Patches (Update payload fields) ────────────────────────────────
//
// Every field is optional: present fields overwrite, absent fields are kept.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeditationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_awoke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_slept: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushUpPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

fn overwrite<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

fn overwrite_optional<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *slot = value.clone();
    }
}

// ── TrackedRecord ──────────────────────────────────────────────────

/// A record type that belongs to exactly one category and can absorb a patch.
pub trait TrackedRecord:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Patch: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync;

    const CATEGORY: Category;

    /// Overwrite the fields present in `patch`, leave the rest untouched.
    fn apply_patch(&mut self, patch: &Self::Patch);

    /// Tag an entry for the combined all-categories projection.
    fn tag(entry: Entry<Self>) -> TrackedEntry;
}

impl TrackedRecord for Mood {
    type Patch = MoodPatch;
    const CATEGORY: Category = Category::Moods;

    fn apply_patch(&mut self, patch: &MoodPatch) {
        overwrite(&mut self.mood, &patch.mood);
        overwrite_optional(&mut self.description, &patch.description);
        overwrite_optional(&mut self.exploration, &patch.exploration);
        overwrite_optional(&mut self.location, &patch.location);
    }

    fn tag(entry: Entry<Self>) -> TrackedEntry {
        TrackedEntry::Moods(entry)
    }
}

impl TrackedRecord for Meditation {
    type Patch = MeditationPatch;
    const CATEGORY: Category = Category::Meditations;

    fn apply_patch(&mut self, patch: &MeditationPatch) {
        overwrite(&mut self.seconds, &patch.seconds);
        overwrite_optional(&mut self.location, &patch.location);
    }

    fn tag(entry: Entry<Self>) -> TrackedEntry {
        TrackedEntry::Meditations(entry)
    }
}

impl TrackedRecord for Weight {
    type Patch = WeightPatch;
    const CATEGORY: Category = Category::Weights;

    fn apply_patch(&mut self, patch: &WeightPatch) {
        overwrite(&mut self.value, &patch.value);
        overwrite_optional(&mut self.location, &patch.location);
    }

    fn tag(entry: Entry<Self>) -> TrackedEntry {
        TrackedEntry::Weights(entry)
    }
}

impl TrackedRecord for Sleep {
    type Patch = SleepPatch;
    const CATEGORY: Category = Category::Sleeps;

    fn apply_patch(&mut self, patch: &SleepPatch) {
        overwrite(&mut self.date_awoke, &patch.date_awoke);
        overwrite(&mut self.minutes_slept, &patch.minutes_slept);
    }

    fn tag(entry: Entry<Self>) -> TrackedEntry {
        TrackedEntry::Sleeps(entry)
    }
}

impl TrackedRecord for PushUp {
    type Patch = PushUpPatch;
    const CATEGORY: Category = Category::PushUps;

    fn apply_patch(&mut self, patch: &PushUpPatch) {
        overwrite(&mut self.value, &patch.value);
        overwrite_optional(&mut self.location, &patch.location);
    }

    fn tag(entry: Entry<Self>) -> TrackedEntry {
        TrackedEntry::PushUps(entry)
    }
}

// ── Projections ────────────────────────────────────────────────────

/// A projected record plus the id of the last Update applied to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry<R> {
    #[serde(flatten)]
    pub record: R,
    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl<R> Entry<R> {
    pub fn new(record: R) -> Self {
        Self { record, updated_at: None }
    }
}

/// An entry of the combined projection, tagged with its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum TrackedEntry {
    #[serde(rename = "moods")]
    Moods(Entry<Mood>),
    #[serde(rename = "meditations")]
    Meditations(Entry<Meditation>),
    #[serde(rename = "weights")]
    Weights(Entry<Weight>),
    #[serde(rename = "sleeps")]
    Sleeps(Entry<Sleep>),
    #[serde(rename = "push-ups")]
    PushUps(Entry<PushUp>),
}

impl TrackedEntry {
    pub fn category(&self) -> Category {
        match self {
            TrackedEntry::Moods(_) => Category::Moods,
            TrackedEntry::Meditations(_) => Category::Meditations,
            TrackedEntry::Weights(_) => Category::Weights,
            TrackedEntry::Sleeps(_) => Category::Sleeps,
            TrackedEntry::PushUps(_) => Category::PushUps,
        }
    }

    /// Where the record was made. Sleeps never carry one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            TrackedEntry::Moods(e) => e.record.location.as_ref(),
            TrackedEntry::Meditations(e) => e.record.location.as_ref(),
            TrackedEntry::Weights(e) => e.record.location.as_ref(),
            TrackedEntry::Sleeps(_) => None,
            TrackedEntry::PushUps(e) => e.record.location.as_ref(),
        }
    }
}

/// CRUD-reduced view: ids in log order plus the current value of each.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection<E> {
    pub ordered_ids: Vec<Timestamp>,
    pub by_id: BTreeMap<Timestamp, E>,
}

impl<E> Default for Projection<E> {
    fn default() -> Self {
        Self {
            ordered_ids: Vec::new(),
            by_id: BTreeMap::new(),
        }
    }
}

impl<E> Projection<E> {
    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }

    pub fn get(&self, id: &Timestamp) -> Option<&E> {
        self.by_id.get(id)
    }

    /// Entries in log order.
    pub fn iter(&self) -> impl Iterator<Item = (&Timestamp, &E)> + '_ {
        self.ordered_ids
            .iter()
            .filter_map(move |id| self.by_id.get(id).map(|e| (id, e)))
    }
}

pub type CategoryProjection<R> = Projection<Entry<R>>;
pub type AllProjection = Projection<TrackedEntry>;

/// Non-fatal inconsistency met while folding. The offending event is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum FoldDiagnostic {
    DeleteTargetMissing {
        event_id: Timestamp,
        category: Category,
        target_id: Timestamp,
    },
    UpdateTargetMissing {
        event_id: Timestamp,
        category: Category,
        target_id: Timestamp,
    },
}

impl fmt::Display for FoldDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldDiagnostic::DeleteTargetMissing { event_id, category, target_id } => write!(
                f,
                "delete {} could not find {} in {}",
                event_id, target_id, category
            ),
            FoldDiagnostic::UpdateTargetMissing { event_id, category, target_id } => write!(
                f,
                "update {} could not find {} in {}",
                event_id, target_id, category
            ),
        }
    }
}

/// The fold of the whole log: one projection per category plus the combined one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projections {
    pub all: AllProjection,
    pub moods: CategoryProjection<Mood>,
    pub meditations: CategoryProjection<Meditation>,
    pub weights: CategoryProjection<Weight>,
    pub sleeps: CategoryProjection<Sleep>,
    #[serde(rename = "push-ups")]
    pub push_ups: CategoryProjection<PushUp>,
    #[serde(skip)]
    pub diagnostics: Vec<FoldDiagnostic>,
}

impl Projections {
    pub fn category_len(&self, category: Category) -> usize {
        match category {
            Category::Moods => self.moods.len(),
            Category::Meditations => self.meditations.len(),
            Category::Weights => self.weights.len(),
            Category::Sleeps => self.sleeps.len(),
            Category::PushUps => self.push_ups.len(),
        }
    }
}
