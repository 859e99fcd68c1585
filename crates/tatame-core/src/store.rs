//! # Record Store
//!
//! The `Store` trait is the persistence seam between the ledger and its
//! backends. `MemoryStore` keeps everything in `BTreeMap`s;
//! `storage::RedbStore` keeps the same records on disk.
//!
//! Every fallible operation returns `Result<T, TatameError>` so both
//! backends can be driven uniformly.

use crate::belts::BeltSchema;
use crate::{
    Academy, AcademyId, AttendanceCounters, CheckIn, GeoFence, GraduationRecord, Member, MemberId,
    ProgressionState, Role, TatameError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Persistence operations used by the ledger.
///
/// Id allocation belongs to the store: ids are never reused.
pub trait Store {
    /// Create an academy and assign it a fresh id.
    fn create_academy(&mut self, name: String, fence: GeoFence) -> Result<Academy, TatameError>;

    fn academy(&self, id: AcademyId) -> Result<Option<Academy>, TatameError>;

    /// All academies, ordered by id.
    fn academies(&self) -> Result<Vec<Academy>, TatameError>;

    /// Replace an academy's belt schema.
    fn put_schema(&mut self, academy: AcademyId, schema: &BeltSchema) -> Result<(), TatameError>;

    fn schema(&self, academy: AcademyId) -> Result<Option<BeltSchema>, TatameError>;

    /// Enrol a member with zeroed attendance counters.
    fn create_member(
        &mut self,
        academy: AcademyId,
        name: String,
        role: Role,
        progression: ProgressionState,
    ) -> Result<Member, TatameError>;

    fn member(&self, id: MemberId) -> Result<Option<Member>, TatameError>;

    /// Members of one academy, ordered by id.
    fn members(&self, academy: AcademyId) -> Result<Vec<Member>, TatameError>;

    /// Date of the member's most recent check-in.
    fn last_check_in(&self, member: MemberId) -> Result<Option<NaiveDate>, TatameError>;

    /// Store a check-in together with the member's updated counters.
    ///
    /// Both writes happen atomically. Returns `Ok(false)` and writes nothing
    /// when a check-in for the same member and day already exists.
    fn commit_check_in(&mut self, member: &Member, record: &CheckIn) -> Result<bool, TatameError>;

    /// Check-ins of one member, oldest first.
    fn check_ins(&self, member: MemberId) -> Result<Vec<CheckIn>, TatameError>;

    /// Store a promoted member together with its graduation record.
    fn commit_graduation(
        &mut self,
        member: &Member,
        record: &GraduationRecord,
    ) -> Result<(), TatameError>;

    /// Graduations of one member, oldest first.
    fn graduations(&self, member: MemberId) -> Result<Vec<GraduationRecord>, TatameError>;

    /// Copy every record out of the store.
    fn snapshot(&self) -> Result<Snapshot, TatameError>;

    /// Load a snapshot into an EMPTY store.
    fn restore(&mut self, snapshot: Snapshot) -> Result<(), TatameError>;
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Backend-independent dump of a store, used for export/import.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_academy_id: u64,
    pub last_member_id: u64,
    pub academies: Vec<Academy>,
    pub schemas: Vec<(AcademyId, BeltSchema)>,
    pub members: Vec<Member>,
    pub check_ins: Vec<CheckIn>,
    pub graduations: Vec<GraduationRecord>,
}

impl Snapshot {
    /// Check that every record points at something that exists, that the
    /// id counters are ahead of every stored id, that fences and check-in
    /// points are well-formed and that no member has two check-ins on one day.
    pub fn validate(&self) -> Result<(), TatameError> {
        let academies: BTreeMap<AcademyId, &Academy> =
            self.academies.iter().map(|a| (a.id, a)).collect();
        let members: BTreeMap<MemberId, &Member> = self.members.iter().map(|m| (m.id, m)).collect();

        if academies.len() != self.academies.len() || members.len() != self.members.len() {
            return Err(TatameError::DeserializationError(
                "snapshot contains duplicate ids".to_string(),
            ));
        }
        if academies.keys().any(|id| id.0 > self.last_academy_id)
            || members.keys().any(|id| id.0 > self.last_member_id)
        {
            return Err(TatameError::DeserializationError(
                "snapshot id counters are behind stored ids".to_string(),
            ));
        }
        if let Some((id, _)) = self.schemas.iter().find(|(id, _)| !academies.contains_key(id)) {
            return Err(TatameError::AcademyNotFound(*id));
        }
        if let Some(member) = self.members.iter().find(|m| !academies.contains_key(&m.academy)) {
            return Err(TatameError::AcademyNotFound(member.academy));
        }
        let dangling = self
            .check_ins
            .iter()
            .map(|c| c.member)
            .chain(self.graduations.iter().map(|g| g.member))
            .find(|id| !members.contains_key(id));
        if let Some(id) = dangling {
            return Err(TatameError::MemberNotFound(id));
        }

        for academy in &self.academies {
            GeoFence::new(academy.fence.center, academy.fence.radius_meters)?;
        }
        let mut days = BTreeSet::new();
        for check_in in &self.check_ins {
            check_in.point.validated()?;
            if !days.insert((check_in.member, check_in.date)) {
                return Err(TatameError::DeserializationError(format!(
                    "snapshot has two check-ins for member {} on {}",
                    check_in.member, check_in.date
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.academies.is_empty() && self.members.is_empty()
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile store. `BTreeMap` keeps every listing deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    academies: BTreeMap<AcademyId, Academy>,
    schemas: BTreeMap<AcademyId, BeltSchema>,
    members: BTreeMap<MemberId, Member>,
    check_ins: BTreeMap<(MemberId, NaiveDate), CheckIn>,
    graduations: BTreeMap<MemberId, Vec<GraduationRecord>>,
    last_academy_id: u64,
    last_member_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a validated snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, TatameError> {
        let mut store = Self::new();
        store.restore(snapshot)?;
        Ok(store)
    }

    fn require_member(&self, id: MemberId) -> Result<(), TatameError> {
        if self.members.contains_key(&id) {
            Ok(())
        } else {
            Err(TatameError::MemberNotFound(id))
        }
    }
}

impl Store for MemoryStore {
    fn create_academy(&mut self, name: String, fence: GeoFence) -> Result<Academy, TatameError> {
        self.last_academy_id = self.last_academy_id.saturating_add(1);
        let academy = Academy {
            id: AcademyId(self.last_academy_id),
            name,
            fence,
        };
        self.academies.insert(academy.id, academy.clone());
        Ok(academy)
    }

    fn academy(&self, id: AcademyId) -> Result<Option<Academy>, TatameError> {
        Ok(self.academies.get(&id).cloned())
    }

    fn academies(&self) -> Result<Vec<Academy>, TatameError> {
        Ok(self.academies.values().cloned().collect())
    }

    fn put_schema(&mut self, academy: AcademyId, schema: &BeltSchema) -> Result<(), TatameError> {
        if !self.academies.contains_key(&academy) {
            return Err(TatameError::AcademyNotFound(academy));
        }
        self.schemas.insert(academy, schema.clone());
        Ok(())
    }

    fn schema(&self, academy: AcademyId) -> Result<Option<BeltSchema>, TatameError> {
        Ok(self.schemas.get(&academy).cloned())
    }

    fn create_member(
        &mut self,
        academy: AcademyId,
        name: String,
        role: Role,
        progression: ProgressionState,
    ) -> Result<Member, TatameError> {
        if !self.academies.contains_key(&academy) {
            return Err(TatameError::AcademyNotFound(academy));
        }
        self.last_member_id = self.last_member_id.saturating_add(1);
        let member = Member {
            id: MemberId(self.last_member_id),
            academy,
            name,
            role,
            progression,
            attendance: AttendanceCounters::new(),
        };
        self.members.insert(member.id, member.clone());
        Ok(member)
    }

    fn member(&self, id: MemberId) -> Result<Option<Member>, TatameError> {
        Ok(self.members.get(&id).cloned())
    }

    fn members(&self, academy: AcademyId) -> Result<Vec<Member>, TatameError> {
        Ok(self
            .members
            .values()
            .filter(|m| m.academy == academy)
            .cloned()
            .collect())
    }

    fn last_check_in(&self, member: MemberId) -> Result<Option<NaiveDate>, TatameError> {
        Ok(self
            .check_ins
            .range((member, NaiveDate::MIN)..=(member, NaiveDate::MAX))
            .next_back()
            .map(|((_, date), _)| *date))
    }

    fn commit_check_in(&mut self, member: &Member, record: &CheckIn) -> Result<bool, TatameError> {
        self.require_member(member.id)?;
        let key = (record.member, record.date);
        if self.check_ins.contains_key(&key) {
            return Ok(false);
        }
        self.check_ins.insert(key, record.clone());
        self.members.insert(member.id, member.clone());
        Ok(true)
    }

    fn check_ins(&self, member: MemberId) -> Result<Vec<CheckIn>, TatameError> {
        Ok(self
            .check_ins
            .range((member, NaiveDate::MIN)..=(member, NaiveDate::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn commit_graduation(
        &mut self,
        member: &Member,
        record: &GraduationRecord,
    ) -> Result<(), TatameError> {
        self.require_member(member.id)?;
        self.members.insert(member.id, member.clone());
        self.graduations
            .entry(record.member)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    fn graduations(&self, member: MemberId) -> Result<Vec<GraduationRecord>, TatameError> {
        Ok(self.graduations.get(&member).cloned().unwrap_or_default())
    }

    fn snapshot(&self) -> Result<Snapshot, TatameError> {
        Ok(Snapshot {
            last_academy_id: self.last_academy_id,
            last_member_id: self.last_member_id,
            academies: self.academies.values().cloned().collect(),
            schemas: self
                .schemas
                .iter()
                .map(|(id, schema)| (*id, schema.clone()))
                .collect(),
            members: self.members.values().cloned().collect(),
            check_ins: self.check_ins.values().cloned().collect(),
            graduations: self.graduations.values().flatten().cloned().collect(),
        })
    }

    fn restore(&mut self, snapshot: Snapshot) -> Result<(), TatameError> {
        if !self.academies.is_empty() || !self.members.is_empty() {
            return Err(TatameError::InvalidInput(
                "snapshots can only be imported into an empty store".to_string(),
            ));
        }
        snapshot.validate()?;

        self.last_academy_id = snapshot.last_academy_id;
        self.last_member_id = snapshot.last_member_id;
        self.academies = snapshot.academies.into_iter().map(|a| (a.id, a)).collect();
        self.schemas = snapshot.schemas.into_iter().collect();
        self.members = snapshot.members.into_iter().map(|m| (m.id, m)).collect();
        self.check_ins = snapshot
            .check_ins
            .into_iter()
            .map(|c| ((c.member, c.date), c))
            .collect();
        self.graduations.clear();
        for record in snapshot.graduations {
            self.graduations.entry(record.member).or_default().push(record);
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coordinate;

    fn fence() -> GeoFence {
        GeoFence::new(Coordinate::new(-23.6183, -45.4211).expect("coord"), 100.0).expect("fence")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn seeded() -> (MemoryStore, Academy, Member) {
        let mut store = MemoryStore::new();
        let academy = store.create_academy("Tatame Centro".into(), fence()).expect("academy");
        let member = store
            .create_member(
                academy.id,
                "Helena".into(),
                Role::Student,
                ProgressionState::new("Branca", 0, date(2024, 1, 1)),
            )
            .expect("member");
        (store, academy, member)
    }

    fn record(member: MemberId, day: NaiveDate) -> CheckIn {
        CheckIn {
            member,
            date: day,
            point: Coordinate::new(-23.6183, -45.4211).expect("coord"),
            distance_meters: 0.0,
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let (mut store, academy, member) = seeded();
        assert_eq!(academy.id, AcademyId(1));
        assert_eq!(member.id, MemberId(1));
        let second = store.create_academy("Filial".into(), fence()).expect("academy");
        assert_eq!(second.id, AcademyId(2));
    }

    #[test]
    fn member_requires_existing_academy() {
        let mut store = MemoryStore::new();
        let result = store.create_member(
            AcademyId(9),
            "Ghost".into(),
            Role::Student,
            ProgressionState::new("Branca", 0, date(2024, 1, 1)),
        );
        assert!(matches!(result, Err(TatameError::AcademyNotFound(AcademyId(9)))));
    }

    #[test]
    fn members_are_scoped_by_academy() {
        let (mut store, academy, _) = seeded();
        let other = store.create_academy("Filial".into(), fence()).expect("academy");
        store
            .create_member(
                other.id,
                "Caio".into(),
                Role::Professor,
                ProgressionState::new("Preta", 1, date(2020, 1, 1)),
            )
            .expect("member");

        assert_eq!(store.members(academy.id).expect("members").len(), 1);
        assert_eq!(store.members(other.id).expect("members").len(), 1);
    }

    #[test]
    fn check_in_is_unique_per_day() {
        let (mut store, _, member) = seeded();
        let day = date(2024, 3, 15);
        assert!(store.commit_check_in(&member, &record(member.id, day)).expect("first"));
        assert!(!store.commit_check_in(&member, &record(member.id, day)).expect("second"));
        assert_eq!(store.check_ins(member.id).expect("list").len(), 1);
    }

    #[test]
    fn last_check_in_is_latest_date() {
        let (mut store, _, member) = seeded();
        for day in [date(2024, 3, 2), date(2024, 3, 9), date(2024, 3, 5)] {
            store.commit_check_in(&member, &record(member.id, day)).expect("commit");
        }
        assert_eq!(store.last_check_in(member.id).expect("last"), Some(date(2024, 3, 9)));
        let dates: Vec<_> = store
            .check_ins(member.id)
            .expect("list")
            .into_iter()
            .map(|c| c.date)
            .collect();
        assert_eq!(dates, vec![date(2024, 3, 2), date(2024, 3, 5), date(2024, 3, 9)]);
    }

    #[test]
    fn snapshot_restores_into_empty_store() {
        let (mut store, academy, member) = seeded();
        store
            .put_schema(academy.id, &BeltSchema::ibjjf_adult())
            .expect("schema");
        store
            .commit_check_in(&member, &record(member.id, date(2024, 3, 2)))
            .expect("commit");

        let snapshot = store.snapshot().expect("snapshot");
        let restored = MemoryStore::from_snapshot(snapshot.clone()).expect("restore");
        assert_eq!(restored.snapshot().expect("snapshot"), snapshot);

        let mut occupied = restored;
        assert!(occupied.restore(snapshot).is_err());
    }

    #[test]
    fn snapshot_validation_catches_dangling_member() {
        let (store, _, _) = seeded();
        let mut snapshot = store.snapshot().expect("snapshot");
        snapshot.check_ins.push(record(MemberId(99), date(2024, 1, 1)));
        assert!(matches!(
            snapshot.validate(),
            Err(TatameError::MemberNotFound(MemberId(99)))
        ));
    }
}
