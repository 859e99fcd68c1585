//! # tatame-core
//!
//! The academy engine for Tatame - THE LOGIC.
//!
//! Two pure validators sit at the center:
//! - `geofence`: Haversine distance and fence membership for check-ins
//! - `progression`: belt/degree eligibility from elapsed calendar months
//!
//! Around them, the `Ledger` keeps academies, members, check-ins and
//! graduations in a `Store` (in memory or in redb).
//!
//! ## Architectural Constraints
//!
//! - NO async, NO network dependencies
//! - NO logging: errors are returned, the app layer decides what to log
//! - "Today" is always a parameter; the core never reads the clock

// =============================================================================
// MODULES
// =============================================================================

pub mod attendance;
pub mod belts;
pub mod checkin;
pub mod formats;
pub mod geofence;
pub mod ledger;
pub mod primitives;
pub mod progression;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Academy, AcademyId, CheckIn, Coordinate, GeoFence, GraduationRecord, Member, MemberId,
    ProgressionState, Role, TatameError,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use attendance::AttendanceCounters;
pub use belts::{BeltRule, BeltSchema, DegreeRule};
pub use geofence::{FenceCheck, distance_meters, is_within_fence};
pub use progression::{
    EligibilityResult, ProgressionEngine, Promotion, TargetKind, compute_eligibility,
    elapsed_months,
};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use ledger::{CheckInReceipt, Ledger, NewMember, PendingGraduation};
pub use storage::RedbStore;
pub use store::{MemoryStore, Snapshot, Store};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
