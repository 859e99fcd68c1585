//! # Storage Module
//!
//! Disk-backed implementations of the `Store` trait.

mod redb_store;

pub use redb_store::RedbStore;
