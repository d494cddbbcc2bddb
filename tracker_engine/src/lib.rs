#![forbid(unsafe_code)]

//! Deterministic core of the tracker store: the append-only event log,
//! the per-category projection fold and period aggregation.
//! Synchronous and I/O free; the runtime crate drives it.

pub mod timestamp;
pub mod domain;
pub mod events;
pub mod log;
pub mod invariants;
pub mod projection;
pub mod hashing;
pub mod period;
pub mod aggregate;
pub mod queries;
pub mod engine;

pub use domain::{Category, Projections};
pub use engine::TrackerEngine;
pub use events::{Event, EventKind, Operation};
pub use log::EventLog;
pub use period::{Granularity, PeriodCalendar};
pub use timestamp::Timestamp;
