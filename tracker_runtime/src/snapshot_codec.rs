//! Snapshot Codec — deterministic encoder/decoder for the persisted log.
//!
//! Pure codec layer. No side-effects, no timestamps, no envelope.
//!
//! - `encode_snapshot`:  StoredLog → JSON string
//! - `decode_snapshot`:  JSON string → StoredLog (no validation)
//! - `restore_snapshot`: decode + log invariant validation
//! - `snapshot_hash`:    SHA-256 of the encoded JSON (lowercase hex)

use thiserror::Error;

use tracker_engine::hashing::sha256_hex;
use tracker_engine::invariants::{validate_stored, LogInvariantError};
use tracker_engine::log::StoredLog;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// All possible snapshot codec failures.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("SerializationError: {0}")]
    Serialization(#[source] serde_json::Error),
    /// Malformed JSON, missing fields or an undecodable event.
    #[error("DeserializationError: {0}")]
    Deserialization(#[source] serde_json::Error),
    #[error("InvariantViolation: {0}")]
    InvariantViolation(#[from] LogInvariantError),
}

// ---------------------------------------------------------------------------
// Encoder / decoder
// ---------------------------------------------------------------------------

/// Encode a stored log. Ids and `byId` keys come out in time order, so
/// identical logs encode byte-for-byte identically.
pub fn encode_snapshot(stored: &StoredLog) -> Result<String, SnapshotError> {
    serde_json::to_string(stored).map_err(SnapshotError::Serialization)
}

/// Decode without validation. Use `restore_snapshot` for untrusted input.
pub fn decode_snapshot(json: &str) -> Result<StoredLog, SnapshotError> {
    serde_json::from_str::<StoredLog>(json).map_err(SnapshotError::Deserialization)
}

/// Decode and validate log invariants.
pub fn restore_snapshot(json: &str) -> Result<StoredLog, SnapshotError> {
    let stored = decode_snapshot(json)?;
    validate_stored(&stored)?;
    Ok(stored)
}

/// Integrity hash of a snapshot file, not of the projections it folds to.
pub fn snapshot_hash(stored: &StoredLog) -> Result<String, SnapshotError> {
    let json = encode_snapshot(stored)?;
    Ok(sha256_hex(json.as_bytes()))
}
