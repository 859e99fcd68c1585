//! # Snapshot Format
//!
//! Binary encoding of a [`Snapshot`] for export/import.
//!
//! Format: Header (5 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("TATM")
//! - 1 byte: Version
//!
//! File I/O lives in the app layer; these are pure transformations.
//!
//! Size and header are checked before the payload is decoded, and the
//! decoded snapshot is validated (dangling references, id counters)
//! before it is returned.

use crate::store::Snapshot;
use crate::{TatameError, primitives};

/// Maximum accepted snapshot size, checked before decoding.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 64 * 1024 * 1024; // 64 MB

const HEADER_LEN: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// Header preceding every snapshot payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), TatameError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(TatameError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(TatameError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TatameError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(TatameError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a snapshot as header + payload.
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, TatameError> {
    let payload =
        postcard::to_stdvec(snapshot).map_err(|e| TatameError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&SnapshotHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode and validate a snapshot.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, TatameError> {
    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(TatameError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let snapshot: Snapshot = postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        TatameError::DeserializationError(format!("Failed to decode snapshot: {}", e))
    })?;
    snapshot.validate()?;
    Ok(snapshot)
}

// =============================================================================
// TESTS
// =============================================================================
