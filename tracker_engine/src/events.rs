//! Tracker Engine — Event Definitions
//!
//! Events are pure data. They carry intent and payload only.
//! They contain ZERO fold logic.
//!
//! Wire shape (what the remote API and the persisted log carry):
//!   `{ "createdAt": <id>, "type": "v1/<category>/<operation>", "payload": ... }`
//!
//! In memory the `type` string is replaced by an exhaustive union over
//! `(category, operation)`, so every consumer matches it at compile time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    Category, Meditation, Mood, PushUp, Sleep, TrackedRecord, Weight,
};
use crate::timestamp::{Timestamp, TimestampError};

/// Schema prefix of every event type. Other prefixes are rejected on decode.
pub const SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("bad event id: {0}")]
    Id(#[from] TimestampError),
    #[error("unknown event type {0:?}")]
    UnknownType(String),
    #[error("unsupported schema version in event type {0:?}")]
    SchemaVersion(String),
    #[error("bad payload for {event_type}: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

// ── Operations ─────────────────────────────────────────────────────

/// Update payload: the target id plus the fields to overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update<P> {
    #[serde(rename = "id")]
    pub target_id: Timestamp,
    #[serde(flatten)]
    pub patch: P,
}

/// One CRUD instruction against a single record of category `R`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation<R: TrackedRecord> {
    Create(R),
    Update(Update<R::Patch>),
    Delete(Timestamp),
}

impl<R: TrackedRecord> Operation<R> {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create(_) => "create",
            Operation::Update(_) => "update",
            Operation::Delete(_) => "delete",
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Operation::Create(record) => serde_json::to_value(record),
            Operation::Update(update) => serde_json::to_value(update),
            Operation::Delete(target) => serde_json::to_value(target),
        }
    }

    fn from_payload(operation: &str, payload: Value) -> Result<Option<Self>, serde_json::Error> {
        let op = match operation {
            "create" => Operation::Create(serde_json::from_value(payload)?),
            "update" => Operation::Update(serde_json::from_value(payload)?),
            "delete" => Operation::Delete(serde_json::from_value(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(op))
    }
}

// ── Event ──────────────────────────────────────────────────────────

/// Exhaustive `(category, operation)` union.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Moods(Operation<Mood>),
    Meditations(Operation<Meditation>),
    Weights(Operation<Weight>),
    Sleeps(Operation<Sleep>),
    PushUps(Operation<PushUp>),
}

impl EventKind {
    pub fn category(&self) -> Category {
        match self {
            EventKind::Moods(_) => Category::Moods,
            EventKind::Meditations(_) => Category::Meditations,
            EventKind::Weights(_) => Category::Weights,
            EventKind::Sleeps(_) => Category::Sleeps,
            EventKind::PushUps(_) => Category::PushUps,
        }
    }

    pub fn operation_name(&self) -> &'static str {
        match self {
            EventKind::Moods(op) => op.name(),
            EventKind::Meditations(op) => op.name(),
            EventKind::Weights(op) => op.name(),
            EventKind::Sleeps(op) => op.name(),
            EventKind::PushUps(op) => op.name(),
        }
    }

    /// Wire type string, e.g. `v1/moods/create`.
    pub fn event_type(&self) -> String {
        format!("{}/{}/{}", SCHEMA_VERSION, self.category(), self.operation_name())
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            EventKind::Moods(op) => op.payload(),
            EventKind::Meditations(op) => op.payload(),
            EventKind::Weights(op) => op.payload(),
            EventKind::Sleeps(op) => op.payload(),
            EventKind::PushUps(op) => op.payload(),
        }
    }

    fn decode(event_type: &str, payload: Value) -> Result<Self, EventDecodeError> {
        let mut parts = event_type.splitn(3, '/');
        let (version, category, operation) = match (parts.next(), parts.next(), parts.next()) {
            (Some(v), Some(c), Some(o)) => (v, c, o),
            _ => return Err(EventDecodeError::UnknownType(event_type.to_string())),
        };
        if version != SCHEMA_VERSION {
            return Err(EventDecodeError::SchemaVersion(event_type.to_string()));
        }
        let category: Category = category
            .parse()
            .map_err(|_| EventDecodeError::UnknownType(event_type.to_string()))?;

        let payload_err = |source| EventDecodeError::Payload {
            event_type: event_type.to_string(),
            source,
        };
        let kind = match category {
            Category::Moods => Operation::from_payload(operation, payload)
                .map_err(payload_err)?
                .map(EventKind::Moods),
            Category::Meditations => Operation::from_payload(operation, payload)
                .map_err(payload_err)?
                .map(EventKind::Meditations),
            Category::Weights => Operation::from_payload(operation, payload)
                .map_err(payload_err)?
                .map(EventKind::Weights),
            Category::Sleeps => Operation::from_payload(operation, payload)
                .map_err(payload_err)?
                .map(EventKind::Sleeps),
            Category::PushUps => Operation::from_payload(operation, payload)
                .map_err(payload_err)?
                .map(EventKind::PushUps),
        };
        kind.ok_or_else(|| EventDecodeError::UnknownType(event_type.to_string()))
    }
}

/// An immutable, timestamp-identified instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub struct Event {
    pub id: Timestamp,
    pub kind: EventKind,
}

impl Event {
    pub fn new(id: Timestamp, kind: EventKind) -> Self {
        Self { id, kind }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Convert to the wire `serde_json::Value`.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parse an event from its wire `serde_json::Value`.
    pub fn from_value(v: Value) -> Result<Self, EventDecodeError> {
        let wire: WireEvent = serde_json::from_value(v).map_err(|source| {
            EventDecodeError::Payload {
                event_type: "<envelope>".to_string(),
                source,
            }
        })?;
        Event::try_from(wire)
    }
}

/// Wire envelope. Payload stays untyped until the type string is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    created_at: String,
    #[serde(rename = "type")]
    event_type: String,
    payload: Value,
}

impl TryFrom<WireEvent> for Event {
    type Error = EventDecodeError;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let id = Timestamp::parse(&wire.created_at)?;
        let kind = EventKind::decode(&wire.event_type, wire.payload)?;
        Ok(Event { id, kind })
    }
}

impl From<Event> for WireEvent {
    fn from(event: Event) -> Self {
        WireEvent {
            created_at: event.id.to_canonical(),
            event_type: event.kind.event_type(),
            // Typed records always serialize; Null is unreachable.
            payload: event.kind.payload().unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MoodPatch;
    use serde_json::json;

    #[test]
    fn test_decode_mood_create() {
        let e = Event::from_value(json!({
            "createdAt": "2020-10-10T08:00:00.000Z",
            "type": "v1/moods/create",
            "payload": { "mood": 5, "description": "calm" },
        }))
        .unwrap();
        assert_eq!(e.category(), Category::Moods);
        match e.kind {
            EventKind::Moods(Operation::Create(m)) => {
                assert_eq!(m.mood, 5.0);
                assert_eq!(m.description.as_deref(), Some("calm"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_decode_update_splits_target_from_fields() {
        let e = Event::from_value(json!({
            "createdAt": "2020-10-10T08:04:00.000Z",
            "type": "v1/moods/update",
            "payload": { "id": "2020-10-10T08:01:00.000Z", "mood": 10 },
        }))
        .unwrap();
        match e.kind {
            EventKind::Moods(Operation::Update(u)) => {
                assert_eq!(u.target_id.to_string(), "2020-10-10T08:01:00.000Z");
                assert_eq!(u.patch, MoodPatch { mood: Some(10.0), ..Default::default() });
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_decode_delete_and_push_ups() {
        let e = Event::from_value(json!({
            "createdAt": "2021-01-01T00:00:00.000Z",
            "type": "v1/push-ups/delete",
            "payload": "2020-12-31T00:00:00.000Z",
        }))
        .unwrap();
        assert_eq!(e.kind.event_type(), "v1/push-ups/delete");
    }

    #[test]
    fn test_wire_form_is_stable() {
        let original = json!({
            "createdAt": "2020-10-10T08:00:00.000Z",
            "type": "v1/sleeps/create",
            "payload": { "dateAwoke": "2020-10-10", "minutesSlept": 480 },
        });
        let e = Event::from_value(original.clone()).unwrap();
        assert_eq!(e.to_value(), original);
    }

    #[test]
    fn test_unknown_type_and_schema_rejected() {
        let bad_category = Event::from_value(json!({
            "createdAt": "2020-10-10T08:00:00.000Z",
            "type": "v1/naps/create",
            "payload": {},
        }));
        assert!(matches!(bad_category, Err(EventDecodeError::UnknownType(_))));

        let bad_schema = Event::from_value(json!({
            "createdAt": "2020-10-10T08:00:00.000Z",
            "type": "v2/moods/create",
            "payload": { "mood": 1 },
        }));
        assert!(matches!(bad_schema, Err(EventDecodeError::SchemaVersion(_))));

        let bad_op = Event::from_value(json!({
            "createdAt": "2020-10-10T08:00:00.000Z",
            "type": "v1/moods/archive",
            "payload": { "mood": 1 },
        }));
        assert!(matches!(bad_op, Err(EventDecodeError::UnknownType(_))));
    }

    #[test]
    fn test_bad_payload_rejected() {
        let r = Event::from_value(json!({
            "createdAt": "2020-10-10T08:00:00.000Z",
            "type": "v1/weights/create",
            "payload": { "value": "heavy" },
        }));
        assert!(matches!(r, Err(EventDecodeError::Payload { .. })));
    }
}
