//! Versioned codec for the persisted monitoring snapshot
//!
//! Layout:
//! ```text
//! [magic "BMST": 4][version: 1][length: 4 LE][payload: N bytes JSON][crc32: 4 LE]
//! ```
//!
//! Decoding reports *why* a blob was rejected so the caller can log an
//! incompatible snapshot more quietly than a corrupt one.

use crate::domain::{InsideStatus, Region};
use crc32fast::Hasher;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::io::{Error as IoError, ErrorKind, Result as IoResult};

/// Current snapshot format version
pub const CODEC_VERSION: u8 = 1;

/// Magic bytes identifying a monitoring snapshot
pub const MAGIC: [u8; 4] = *b"BMST";

const HEADER_LEN: usize = MAGIC.len() + 1 + 4;
const TRAILER_LEN: usize = 4;

/// Payloads above this are treated as corrupt
const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Why a blob could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Written by a different format version or schema
    #[error("incompatible snapshot version {found} (expected {expected})")]
    IncompatibleVersion { found: u8, expected: u8 },
    /// Truncated, checksum mismatch, bad magic or similar damage
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Persisted form of one region's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedRegion {
    pub region: Region,
    pub status: InsideStatus,
    pub last_seen_ms: Option<u64>,
}

/// Persisted form of the whole registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub regions: Vec<PersistedRegion>,
}

/// Serialize a value with header and checksum
///
/// Payloads `decode` would reject as oversized are refused here.
pub fn encode<T: Serialize>(value: &T) -> IoResult<Vec<u8>> {
    let data = serde_json::to_vec(value)
        .map_err(|e| IoError::new(ErrorKind::InvalidData, format!("serialization failed: {}", e)))?;
    if data.len() > MAX_PAYLOAD_SIZE {
        return Err(IoError::new(
            ErrorKind::InvalidData,
            format!("payload size {} exceeds maximum {}", data.len(), MAX_PAYLOAD_SIZE),
        ));
    }

    let mut hasher = Hasher::new();
    hasher.update(&data);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() + TRAILER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(CODEC_VERSION);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&crc.to_le_bytes());

    Ok(out)
}

/// Deserialize a value, verifying magic, version, length and checksum
///
/// A payload that passes the checksum but does not fit the current schema
/// is reported as `IncompatibleVersion`: it was written intact, just not by
/// this version of the code.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    if bytes.len() < MAGIC.len() {
        return Err(DecodeError::Corrupt(format!("blob too short ({} bytes)", bytes.len())));
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(DecodeError::Corrupt(format!(
            "invalid magic bytes: expected {:?}, got {:?}",
            MAGIC,
            &bytes[..MAGIC.len()]
        )));
    }

    let Some(&version) = bytes.get(MAGIC.len()) else {
        return Err(DecodeError::Corrupt("missing version byte".to_string()));
    };
    if version != CODEC_VERSION {
        return Err(DecodeError::IncompatibleVersion { found: version, expected: CODEC_VERSION });
    }

    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(DecodeError::Corrupt(format!("blob truncated ({} bytes)", bytes.len())));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[MAGIC.len() + 1..HEADER_LEN]);
    let len = u32::from_le_bytes(len_bytes) as usize;

    if len > MAX_PAYLOAD_SIZE {
        return Err(DecodeError::Corrupt(format!(
            "payload size {} exceeds maximum {}",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    if bytes.len() != HEADER_LEN + len + TRAILER_LEN {
        return Err(DecodeError::Corrupt(format!(
            "length mismatch: header says {} payload bytes, blob has {}",
            len,
            bytes.len().saturating_sub(HEADER_LEN + TRAILER_LEN)
        )));
    }

    let data = &bytes[HEADER_LEN..HEADER_LEN + len];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[HEADER_LEN + len..]);
    let stored_crc = u32::from_le_bytes(crc_bytes);

    let mut hasher = Hasher::new();
    hasher.update(data);
    let computed_crc = hasher.finalize();

    if stored_crc != computed_crc {
        return Err(DecodeError::Corrupt(format!(
            "CRC mismatch: stored={:08x}, computed={:08x}",
            stored_crc, computed_crc
        )));
    }

    serde_json::from_slice(data)
        .map_err(|_| DecodeError::IncompatibleVersion { found: version, expected: CODEC_VERSION })
}
