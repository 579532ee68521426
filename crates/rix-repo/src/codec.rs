//! Record codec: readings to and from stored blobs.
//!
//! Blobs are the JSON document form of [`Reading`]. Binary payloads are
//! stripped before encoding, so a stored binary reading always carries an
//! empty `binaryValue`.

use bytes::Bytes;
use rix_types::{BaseReading, Reading, SimpleReading};

use crate::error::{RepoError, RepoResult};

/// Drop the parts of a reading that are never persisted.
pub fn strip_payload(reading: &mut Reading) {
    match reading {
        Reading::Simple(_) => {}
        Reading::Binary(binary) => binary.binary_value = Vec::new(),
    }
}

/// Serialize a reading into its stored form.
pub fn encode(reading: &Reading) -> RepoResult<Bytes> {
    serde_json::to_vec(reading)
        .map(Bytes::from)
        .map_err(|e| RepoError::ContractInvalid {
            reason: format!("{} reading parsing failed", reading.kind()),
            source: Some(e),
        })
}

/// Decode a full tagged reading.
pub fn decode_reading(key: &str, blob: &[u8]) -> RepoResult<Reading> {
    serde_json::from_slice(blob)
        .map_err(|e| RepoError::database(format!("reading format parsing failed for {key}"), e))
}

/// Decode a blob as a simple reading, whatever variant it was stored as.
pub fn decode_simple(key: &str, blob: &[u8]) -> RepoResult<SimpleReading> {
    serde_json::from_slice(blob)
        .map_err(|e| RepoError::database(format!("reading format parsing failed for {key}"), e))
}

/// Decode only the shared fields. Enough to locate a reading's indexes.
pub fn decode_base(blob: &[u8]) -> Result<BaseReading, serde_json::Error> {
    serde_json::from_slice(blob)
}
