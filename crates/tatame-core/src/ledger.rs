//! # Ledger
//!
//! The academy ledger: one facade over a storage backend that every
//! front end (HTTP, CLI, tests) drives.
//!
//! The ledger owns the workflow rules that span several records:
//! - members are always addressed through their academy
//! - check-ins go through the fence policy and bump attendance counters
//! - graduations are computed by the progression engine, confirmed by an
//!   approver of the same academy, and stored with their history record
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile unless exported)
//! - `Persistent`: `RedbStore` for disk-backed ACID storage

use crate::belts::{BeltRule, BeltSchema};
use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::geofence::FenceCheck;
use crate::primitives::{DEFAULT_FENCE_RADIUS_METERS, MAX_NAME_LENGTH};
use crate::progression::{EligibilityResult, ProgressionEngine};
use crate::storage::RedbStore;
use crate::store::{MemoryStore, Snapshot, Store};
use crate::{
    Academy, AcademyId, AttendanceCounters, CheckIn, Coordinate, GeoFence, GraduationRecord,
    Member, MemberId, ProgressionState, Role, TatameError, checkin,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage backend for a Ledger.
#[derive(Debug)]
enum StorageBackend {
    /// In-memory records (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed records using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn Store {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn Store {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

// =============================================================================
// INPUT / OUTPUT RECORDS
// =============================================================================

/// Enrolment request.
///
/// `belt` defaults to the first belt of the academy schema and
/// `last_graduation` defaults to the enrolment day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub belt: Option<String>,
    #[serde(default)]
    pub degree: u32,
    #[serde(default)]
    pub last_graduation: Option<NaiveDate>,
}

/// An accepted check-in and the counters it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInReceipt {
    pub check_in: CheckIn,
    pub attendance: AttendanceCounters,
}

/// A member waiting for a professor to confirm a graduation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingGraduation {
    pub member: Member,
    pub eligibility: EligibilityResult,
}

fn clean_name(name: &str, what: &str) -> Result<String, TatameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TatameError::InvalidInput(format!(
            "{} name must not be empty",
            what
        )));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(TatameError::InvalidInput(format!(
            "{} name length {} exceeds maximum {} bytes",
            what,
            name.len(),
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

// =============================================================================
// LEDGER
// =============================================================================

/// Facade over the record store.
///
/// Note: Ledger does NOT implement Clone; the redb handle cannot be cloned.
#[derive(Debug, Default)]
pub struct Ledger {
    backend: StorageBackend,
}

impl Ledger {
    /// Empty ledger with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or create a redb-backed ledger.
    pub fn open_persistent(path: impl AsRef<Path>) -> Result<Self, TatameError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
        })
    }

    /// In-memory ledger seeded from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, TatameError> {
        Ok(Self {
            backend: StorageBackend::InMemory(MemoryStore::from_snapshot(snapshot)?),
        })
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn store(&self) -> &dyn Store {
        self.backend.store()
    }

    fn store_mut(&mut self) -> &mut dyn Store {
        self.backend.store_mut()
    }

    // -------------------------------------------------------------------------
    // Academies
    // -------------------------------------------------------------------------

    /// Register an academy. `radius_meters` defaults to 100 m.
    pub fn create_academy(
        &mut self,
        name: &str,
        center: Coordinate,
        radius_meters: Option<f64>,
    ) -> Result<Academy, TatameError> {
        let name = clean_name(name, "academy")?;
        let fence = GeoFence::new(
            center,
            radius_meters.unwrap_or(DEFAULT_FENCE_RADIUS_METERS),
        )?;
        self.store_mut().create_academy(name, fence)
    }

    pub fn academy(&self, id: AcademyId) -> Result<Academy, TatameError> {
        self.store()
            .academy(id)?
            .ok_or(TatameError::AcademyNotFound(id))
    }

    pub fn academies(&self) -> Result<Vec<Academy>, TatameError> {
        self.store().academies()
    }

    /// Distance from `point` to the academy and whether it is inside the
    /// fence. Nothing is recorded.
    pub fn fence_check(
        &self,
        academy: AcademyId,
        point: Coordinate,
    ) -> Result<FenceCheck, TatameError> {
        let point = point.validated()?;
        Ok(self.academy(academy)?.fence.check(point))
    }

    // -------------------------------------------------------------------------
    // Belt schema
    // -------------------------------------------------------------------------

    /// Validate and replace the academy's belt ladder.
    pub fn set_belt_schema(
        &mut self,
        academy: AcademyId,
        belts: Vec<BeltRule>,
    ) -> Result<BeltSchema, TatameError> {
        self.academy(academy)?;
        let schema = BeltSchema::new(belts)?;
        self.store_mut().put_schema(academy, &schema)?;
        Ok(schema)
    }

    /// The academy's ladder; empty when none was configured.
    pub fn belt_schema(&self, academy: AcademyId) -> Result<BeltSchema, TatameError> {
        self.academy(academy)?;
        Ok(self.store().schema(academy)?.unwrap_or_default())
    }

    // -------------------------------------------------------------------------
    // Members
    // -------------------------------------------------------------------------

    /// Enrol a member with zeroed attendance counters.
    pub fn enroll(
        &mut self,
        academy: AcademyId,
        request: NewMember,
        today: NaiveDate,
    ) -> Result<Member, TatameError> {
        let schema = self.belt_schema(academy)?;
        let name = clean_name(&request.name, "member")?;

        let belt = match request.belt {
            Some(belt) => clean_name(&belt, "belt")?,
            None => schema
                .belts()
                .first()
                .map(|b| b.name.clone())
                .ok_or_else(|| {
                    TatameError::InvalidInput(
                        "belt is required when the academy has no belt schema".to_string(),
                    )
                })?,
        };
        if let Some(rule) = schema.find(&belt) {
            if request.degree > rule.max_degrees {
                return Err(TatameError::InvalidInput(format!(
                    "belt '{}' has at most {} degrees",
                    belt, rule.max_degrees
                )));
            }
        }

        let last_graduation = request.last_graduation.unwrap_or(today);
        if last_graduation > today {
            return Err(TatameError::InvalidInput(format!(
                "last graduation {} is in the future",
                last_graduation
            )));
        }

        let progression = ProgressionState::new(belt, request.degree, last_graduation);
        self.store_mut()
            .create_member(academy, name, request.role, progression)
    }

    /// A member, which must belong to `academy`.
    pub fn member(&self, academy: AcademyId, id: MemberId) -> Result<Member, TatameError> {
        let member = self
            .store()
            .member(id)?
            .ok_or(TatameError::MemberNotFound(id))?;
        if member.academy != academy {
            return Err(TatameError::MemberNotInAcademy {
                member: id,
                academy,
            });
        }
        Ok(member)
    }

    pub fn members(&self, academy: AcademyId) -> Result<Vec<Member>, TatameError> {
        self.academy(academy)?;
        self.store().members(academy)
    }

    // -------------------------------------------------------------------------
    // Attendance
    // -------------------------------------------------------------------------

    /// Record a check-in at `point` on `today`.
    ///
    /// On success both attendance counters are incremented in the same
    /// write as the check-in record.
    pub fn check_in(
        &mut self,
        academy: AcademyId,
        member: MemberId,
        point: Coordinate,
        today: NaiveDate,
    ) -> Result<CheckInReceipt, TatameError> {
        let fence = self.academy(academy)?.fence;
        let mut member = self.member(academy, member)?;
        let last = self.store().last_check_in(member.id)?;

        let record = checkin::admit(member.id, &fence, point, last, today)?;
        member.attendance = member.attendance.record_check_in();

        if !self.store_mut().commit_check_in(&member, &record)? {
            return Err(TatameError::AlreadyCheckedIn(today));
        }
        Ok(CheckInReceipt {
            check_in: record,
            attendance: member.attendance,
        })
    }

    /// Check-in history, oldest first.
    pub fn check_ins(
        &self,
        academy: AcademyId,
        member: MemberId,
    ) -> Result<Vec<CheckIn>, TatameError> {
        let member = self.member(academy, member)?;
        self.store().check_ins(member.id)
    }

    // -------------------------------------------------------------------------
    // Progression
    // -------------------------------------------------------------------------

    /// Eligibility of one member as of `now`.
    pub fn eligibility(
        &self,
        academy: AcademyId,
        member: MemberId,
        now: NaiveDate,
    ) -> Result<EligibilityResult, TatameError> {
        let schema = self.belt_schema(academy)?;
        let member = self.member(academy, member)?;
        Ok(ProgressionEngine::new(&schema).eligibility(&member.progression, now))
    }

    /// Members of `academy` eligible for their next rank, by member id.
    pub fn pending_graduations(
        &self,
        academy: AcademyId,
        now: NaiveDate,
    ) -> Result<Vec<PendingGraduation>, TatameError> {
        let schema = self.belt_schema(academy)?;
        let engine = ProgressionEngine::new(&schema);

        let mut pending: Vec<_> = self
            .store()
            .members(academy)?
            .into_iter()
            .filter_map(|member| {
                let eligibility = engine.eligibility(&member.progression, now);
                eligibility.is_eligible.then_some(PendingGraduation {
                    member,
                    eligibility,
                })
            })
            .collect();
        pending.sort_by_key(|p| p.member.id);
        Ok(pending)
    }

    /// Confirm the member's computed next rank.
    ///
    /// The approver must be a professor or admin of the same academy and
    /// cannot approve their own graduation.
    pub fn confirm_graduation(
        &mut self,
        academy: AcademyId,
        member: MemberId,
        approver: MemberId,
        today: NaiveDate,
    ) -> Result<GraduationRecord, TatameError> {
        let schema = self.belt_schema(academy)?;
        let mut member = self.member(academy, member)?;

        let approver = self
            .store()
            .member(approver)?
            .ok_or(TatameError::MemberNotFound(approver))?;
        if approver.academy != academy {
            return Err(TatameError::NotAuthorized(format!(
                "member {} is not part of academy {}",
                approver.id, academy
            )));
        }
        if !approver.role.can_approve_graduations() {
            return Err(TatameError::NotAuthorized(format!(
                "role '{}' cannot approve graduations",
                approver.role
            )));
        }
        if approver.id == member.id {
            return Err(TatameError::NotAuthorized(
                "members cannot approve their own graduation".to_string(),
            ));
        }

        let promotion = ProgressionEngine::new(&schema).promote(&member.progression, today)?;
        let record = GraduationRecord {
            member: member.id,
            from_belt: promotion.from.belt.clone(),
            from_degree: promotion.from.degree,
            to_belt: promotion.to.belt.clone(),
            to_degree: promotion.to.degree,
            date: today,
            approved_by: approver.id,
        };
        member.attendance = promotion.reset_counters(member.attendance);
        member.progression = promotion.to;

        self.store_mut().commit_graduation(&member, &record)?;
        Ok(record)
    }

    /// Graduation history, oldest first.
    pub fn graduations(
        &self,
        academy: AcademyId,
        member: MemberId,
    ) -> Result<Vec<GraduationRecord>, TatameError> {
        let member = self.member(academy, member)?;
        self.store().graduations(member.id)
    }

    // -------------------------------------------------------------------------
    // Export / import
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> Result<Snapshot, TatameError> {
        self.store().snapshot()
    }

    /// Encode every record as a `TATM` snapshot.
    pub fn export_bytes(&self) -> Result<Vec<u8>, TatameError> {
        snapshot_to_bytes(&self.snapshot()?)
    }

    /// Load a `TATM` snapshot into this (empty) ledger.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<Snapshot, TatameError> {
        let snapshot = snapshot_from_bytes(bytes)?;
        self.store_mut().restore(snapshot.clone())?;
        Ok(snapshot)
    }

    /// Compact the redb file. Returns `false` for in-memory ledgers.
    pub fn compact(&mut self) -> Result<bool, TatameError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(false),
            StorageBackend::Persistent(store) => {
                store.compact()?;
                Ok(true)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
