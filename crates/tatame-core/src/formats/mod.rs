//! # Formats Module
//!
//! Byte-level encodings for moving a whole ledger between processes.

pub mod snapshot;

pub use snapshot::{
    MAX_SNAPSHOT_PAYLOAD_SIZE, SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes,
};
