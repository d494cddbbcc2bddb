#![forbid(unsafe_code)]

//! Tracker Runtime
//!
//! Wraps the synchronous tracker engine with sessions, push/pull sync
//! against a remote, snapshot persistence, replay verification,
//! configuration and tracing setup.
//!
//! No domain logic lives here. Log, fold and aggregation rules are all
//! delegated to `tracker_engine`.

pub mod config;
pub mod telemetry;
pub mod remote;
pub mod session;
pub mod sync;
pub mod snapshot_codec;
pub mod persistence;
pub mod replay;
