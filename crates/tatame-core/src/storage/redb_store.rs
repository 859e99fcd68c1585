//! # redb-backed Record Storage
//!
//! A disk-backed `Store` using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are postcard-encoded. Composite keys keep per-member data
//! contiguous so history listings are single range scans.
//!
//! ## Check-in uniqueness
//!
//! Check-ins are keyed by `(member_id, day_number)`. The existence check
//! and the insert happen inside the same write transaction, so two racing
//! check-ins for the same member and day cannot both commit.

use crate::belts::BeltSchema;
use crate::store::{Snapshot, Store};
use crate::{
    Academy, AcademyId, AttendanceCounters, CheckIn, GeoFence, GraduationRecord, Member, MemberId,
    ProgressionState, Role, TatameError,
};
use chrono::{Datelike, NaiveDate};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for academies: AcademyId(u64) -> serialized Academy
const ACADEMIES: TableDefinition<u64, &[u8]> = TableDefinition::new("academies");

/// Table for belt schemas: AcademyId(u64) -> serialized BeltSchema
const SCHEMAS: TableDefinition<u64, &[u8]> = TableDefinition::new("schemas");

/// Table for members: (academy_id, member_id) -> serialized Member
const MEMBERS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("members");

/// Reverse index: member_id -> academy_id
const MEMBER_ACADEMY: TableDefinition<u64, u64> = TableDefinition::new("member_academy");

/// Table for check-ins: (member_id, days since CE) -> serialized CheckIn
const CHECK_INS: TableDefinition<(u64, i32), &[u8]> = TableDefinition::new("check_ins");

/// Table for graduations: (member_id, sequence) -> serialized GraduationRecord
const GRADUATIONS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("graduations");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const LAST_ACADEMY_ID: &str = "last_academy_id";
const LAST_MEMBER_ID: &str = "last_member_id";

fn io_err(e: impl std::fmt::Display) -> TatameError {
    TatameError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TatameError> {
    postcard::to_allocvec(value).map_err(|e| TatameError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TatameError> {
    postcard::from_bytes(bytes).map_err(|e| TatameError::DeserializationError(e.to_string()))
}

fn day_key(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

fn day_from_key(day: i32) -> Result<NaiveDate, TatameError> {
    NaiveDate::from_num_days_from_ce_opt(day)
        .ok_or_else(|| TatameError::DeserializationError(format!("invalid day key {}", day)))
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TatameError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            write_txn.open_table(ACADEMIES).map_err(io_err)?;
            write_txn.open_table(SCHEMAS).map_err(io_err)?;
            write_txn.open_table(MEMBERS).map_err(io_err)?;
            write_txn.open_table(MEMBER_ACADEMY).map_err(io_err)?;
            write_txn.open_table(CHECK_INS).map_err(io_err)?;
            write_txn.open_table(GRADUATIONS).map_err(io_err)?;
            write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), TatameError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn metadata(&self, key: &str) -> Result<u64, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(METADATA).map_err(io_err)?;
        Ok(table.get(key).map_err(io_err)?.map(|v| v.value()).unwrap_or(0))
    }

    /// Write a member row (both the record and the reverse index).
    fn write_member(txn: &redb::WriteTransaction, member: &Member) -> Result<(), TatameError> {
        let bytes = encode(member)?;
        let mut members = txn.open_table(MEMBERS).map_err(io_err)?;
        members
            .insert((member.academy.0, member.id.0), bytes.as_slice())
            .map_err(io_err)?;
        let mut index = txn.open_table(MEMBER_ACADEMY).map_err(io_err)?;
        index.insert(member.id.0, member.academy.0).map_err(io_err)?;
        Ok(())
    }

    fn write_graduation(
        txn: &redb::WriteTransaction,
        record: &GraduationRecord,
    ) -> Result<(), TatameError> {
        let mut table = txn.open_table(GRADUATIONS).map_err(io_err)?;
        let next_seq = match table
            .range((record.member.0, 0u64)..=(record.member.0, u64::MAX))
            .map_err(io_err)?
            .next_back()
        {
            Some(entry) => {
                let (key, _) = entry.map_err(io_err)?;
                key.value().1.saturating_add(1)
            }
            None => 0,
        };
        let bytes = encode(record)?;
        table
            .insert((record.member.0, next_seq), bytes.as_slice())
            .map_err(io_err)?;
        Ok(())
    }

    fn require_member(&self, id: MemberId) -> Result<(), TatameError> {
        if self.member(id)?.is_some() {
            Ok(())
        } else {
            Err(TatameError::MemberNotFound(id))
        }
    }

    fn require_academy(&self, id: AcademyId) -> Result<(), TatameError> {
        if self.academy(id)?.is_some() {
            Ok(())
        } else {
            Err(TatameError::AcademyNotFound(id))
        }
    }
}

// =============================================================================
// STORE TRAIT IMPLEMENTATION
// =============================================================================

impl Store for RedbStore {
    fn create_academy(&mut self, name: String, fence: GeoFence) -> Result<Academy, TatameError> {
        let academy = Academy {
            id: AcademyId(self.metadata(LAST_ACADEMY_ID)?.saturating_add(1)),
            name,
            fence,
        };
        let bytes = encode(&academy)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(ACADEMIES).map_err(io_err)?;
            table.insert(academy.id.0, bytes.as_slice()).map_err(io_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(LAST_ACADEMY_ID, academy.id.0).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        Ok(academy)
    }

    fn academy(&self, id: AcademyId) -> Result<Option<Academy>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ACADEMIES).map_err(io_err)?;
        match table.get(id.0).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn academies(&self) -> Result<Vec<Academy>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(ACADEMIES).map_err(io_err)?;
        let mut academies = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, data) = entry.map_err(io_err)?;
            academies.push(decode(data.value())?);
        }
        Ok(academies)
    }

    fn put_schema(&mut self, academy: AcademyId, schema: &BeltSchema) -> Result<(), TatameError> {
        self.require_academy(academy)?;
        let bytes = encode(schema)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SCHEMAS).map_err(io_err)?;
            table.insert(academy.0, bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn schema(&self, academy: AcademyId) -> Result<Option<BeltSchema>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SCHEMAS).map_err(io_err)?;
        match table.get(academy.0).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn create_member(
        &mut self,
        academy: AcademyId,
        name: String,
        role: Role,
        progression: ProgressionState,
    ) -> Result<Member, TatameError> {
        self.require_academy(academy)?;
        let member = Member {
            id: MemberId(self.metadata(LAST_MEMBER_ID)?.saturating_add(1)),
            academy,
            name,
            role,
            progression,
            attendance: AttendanceCounters::new(),
        };

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            Self::write_member(&write_txn, &member)?;
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(LAST_MEMBER_ID, member.id.0).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        Ok(member)
    }

    fn member(&self, id: MemberId) -> Result<Option<Member>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let index = read_txn.open_table(MEMBER_ACADEMY).map_err(io_err)?;
        let Some(academy) = index.get(id.0).map_err(io_err)?.map(|v| v.value()) else {
            return Ok(None);
        };
        let members = read_txn.open_table(MEMBERS).map_err(io_err)?;
        match members.get((academy, id.0)).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn members(&self, academy: AcademyId) -> Result<Vec<Member>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(MEMBERS).map_err(io_err)?;
        let mut members = Vec::new();
        for entry in table
            .range((academy.0, 0u64)..=(academy.0, u64::MAX))
            .map_err(io_err)?
        {
            let (_, data) = entry.map_err(io_err)?;
            members.push(decode(data.value())?);
        }
        Ok(members)
    }

    fn last_check_in(&self, member: MemberId) -> Result<Option<NaiveDate>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CHECK_INS).map_err(io_err)?;
        let last = table
            .range((member.0, i32::MIN)..=(member.0, i32::MAX))
            .map_err(io_err)?
            .next_back();
        match last {
            Some(entry) => {
                let (key, _) = entry.map_err(io_err)?;
                Ok(Some(day_from_key(key.value().1)?))
            }
            None => Ok(None),
        }
    }

    fn commit_check_in(&mut self, member: &Member, record: &CheckIn) -> Result<bool, TatameError> {
        self.require_member(member.id)?;
        let bytes = encode(record)?;
        let key = (record.member.0, day_key(record.date));

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(CHECK_INS).map_err(io_err)?;
            if table.get(key).map_err(io_err)?.is_some() {
                drop(table);
                write_txn.abort().map_err(io_err)?;
                return Ok(false);
            }
            table.insert(key, bytes.as_slice()).map_err(io_err)?;
            Self::write_member(&write_txn, member)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(true)
    }

    fn check_ins(&self, member: MemberId) -> Result<Vec<CheckIn>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CHECK_INS).map_err(io_err)?;
        let mut records = Vec::new();
        for entry in table
            .range((member.0, i32::MIN)..=(member.0, i32::MAX))
            .map_err(io_err)?
        {
            let (_, data) = entry.map_err(io_err)?;
            records.push(decode(data.value())?);
        }
        Ok(records)
    }

    fn commit_graduation(
        &mut self,
        member: &Member,
        record: &GraduationRecord,
    ) -> Result<(), TatameError> {
        self.require_member(member.id)?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        Self::write_member(&write_txn, member)?;
        Self::write_graduation(&write_txn, record)?;
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn graduations(&self, member: MemberId) -> Result<Vec<GraduationRecord>, TatameError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(GRADUATIONS).map_err(io_err)?;
        let mut records = Vec::new();
        for entry in table
            .range((member.0, 0u64)..=(member.0, u64::MAX))
            .map_err(io_err)?
        {
            let (_, data) = entry.map_err(io_err)?;
            records.push(decode(data.value())?);
        }
        Ok(records)
    }

    fn snapshot(&self) -> Result<Snapshot, TatameError> {
        let academies = self.academies()?;
        let mut schemas = Vec::new();
        let mut members = Vec::new();
        let mut check_ins = Vec::new();
        let mut graduations = Vec::new();

        for academy in &academies {
            if let Some(schema) = self.schema(academy.id)? {
                schemas.push((academy.id, schema));
            }
            for member in self.members(academy.id)? {
                check_ins.extend(self.check_ins(member.id)?);
                graduations.extend(self.graduations(member.id)?);
                members.push(member);
            }
        }
        members.sort_by_key(|m| m.id);

        Ok(Snapshot {
            last_academy_id: self.metadata(LAST_ACADEMY_ID)?,
            last_member_id: self.metadata(LAST_MEMBER_ID)?,
            academies,
            schemas,
            members,
            check_ins,
            graduations,
        })
    }

    fn restore(&mut self, snapshot: Snapshot) -> Result<(), TatameError> {
        if !self.academies()?.is_empty() {
            return Err(TatameError::InvalidInput(
                "snapshots can only be imported into an empty store".to_string(),
            ));
        }
        snapshot.validate()?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut academies = write_txn.open_table(ACADEMIES).map_err(io_err)?;
            for academy in &snapshot.academies {
                let bytes = encode(academy)?;
                academies.insert(academy.id.0, bytes.as_slice()).map_err(io_err)?;
            }
            let mut schemas = write_txn.open_table(SCHEMAS).map_err(io_err)?;
            for (id, schema) in &snapshot.schemas {
                let bytes = encode(schema)?;
                schemas.insert(id.0, bytes.as_slice()).map_err(io_err)?;
            }
            let mut check_ins = write_txn.open_table(CHECK_INS).map_err(io_err)?;
            for record in &snapshot.check_ins {
                let bytes = encode(record)?;
                check_ins
                    .insert((record.member.0, day_key(record.date)), bytes.as_slice())
                    .map_err(io_err)?;
            }
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(LAST_ACADEMY_ID, snapshot.last_academy_id)
                .map_err(io_err)?;
            meta.insert(LAST_MEMBER_ID, snapshot.last_member_id)
                .map_err(io_err)?;
        }
        for member in &snapshot.members {
            Self::write_member(&write_txn, member)?;
        }
        for record in &snapshot.graduations {
            Self::write_graduation(&write_txn, record)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::Coordinate;
    use tempfile::tempdir;

    fn fence() -> GeoFence {
        GeoFence::new(Coordinate::new(-23.6183, -45.4211).expect("coord"), 100.0).expect("fence")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn check_in(member: MemberId, day: NaiveDate) -> CheckIn {
        CheckIn {
            member,
            date: day,
            point: Coordinate::new(-23.6183, -45.4211).expect("coord"),
            distance_meters: 1.5,
        }
    }

    fn enrol(store: &mut RedbStore, academy: AcademyId, name: &str) -> Member {
        store
            .create_member(
                academy,
                name.to_string(),
                Role::Student,
                ProgressionState::new("Branca", 0, date(2024, 1, 1)),
            )
            .expect("member")
    }

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let academy = store.create_academy("Centro".into(), fence()).expect("academy");
        assert_eq!(academy.id, AcademyId(1));
        assert_eq!(store.academy(academy.id).expect("get"), Some(academy.clone()));
        assert!(store.academy(AcademyId(2)).expect("get").is_none());

        let member = enrol(&mut store, academy.id, "Helena");
        assert_eq!(store.member(member.id).expect("get"), Some(member.clone()));
        assert_eq!(store.members(academy.id).expect("list"), vec![member]);
    }

    #[test]
    fn members_are_scoped_by_academy() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let a = store.create_academy("A".into(), fence()).expect("academy");
        let b = store.create_academy("B".into(), fence()).expect("academy");
        enrol(&mut store, a.id, "one");
        enrol(&mut store, b.id, "two");
        enrol(&mut store, a.id, "three");

        let names: Vec<_> = store
            .members(a.id)
            .expect("list")
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["one", "three"]);
    }

    #[test]
    fn schema_round_trip() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let academy = store.create_academy("Centro".into(), fence()).expect("academy");

        assert!(store.schema(academy.id).expect("get").is_none());
        store
            .put_schema(academy.id, &BeltSchema::ibjjf_adult())
            .expect("put");
        assert_eq!(
            store.schema(academy.id).expect("get"),
            Some(BeltSchema::ibjjf_adult())
        );
        assert!(matches!(
            store.put_schema(AcademyId(42), &BeltSchema::empty()),
            Err(TatameError::AcademyNotFound(AcademyId(42)))
        ));
    }

    #[test]
    fn check_in_uniqueness_and_counter_update() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let academy = store.create_academy("Centro".into(), fence()).expect("academy");
        let mut member = enrol(&mut store, academy.id, "Helena");

        member.attendance = member.attendance.record_check_in();
        let day = date(2024, 3, 15);
        assert!(store.commit_check_in(&member, &check_in(member.id, day)).expect("first"));

        let mut again = member.clone();
        again.attendance = again.attendance.record_check_in();
        assert!(!store.commit_check_in(&again, &check_in(member.id, day)).expect("second"));

        let stored = store.member(member.id).expect("get").unwrap();
        assert_eq!(stored.attendance.days_since_last_degree, 1);
        assert_eq!(store.last_check_in(member.id).expect("last"), Some(day));
    }

    #[test]
    fn check_ins_ordered_by_date() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let academy = store.create_academy("Centro".into(), fence()).expect("academy");
        let member = enrol(&mut store, academy.id, "Helena");

        for day in [date(2024, 3, 9), date(2023, 12, 31), date(2024, 1, 2)] {
            store.commit_check_in(&member, &check_in(member.id, day)).expect("commit");
        }
        let dates: Vec<_> = store
            .check_ins(member.id)
            .expect("list")
            .into_iter()
            .map(|c| c.date)
            .collect();
        assert_eq!(dates, vec![date(2023, 12, 31), date(2024, 1, 2), date(2024, 3, 9)]);
        assert_eq!(store.last_check_in(member.id).expect("last"), Some(date(2024, 3, 9)));
    }

    #[test]
    fn graduations_append_in_order() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let academy = store.create_academy("Centro".into(), fence()).expect("academy");
        let mut member = enrol(&mut store, academy.id, "Helena");

        for degree in 1..=3 {
            let record = GraduationRecord {
                member: member.id,
                from_belt: "Branca".into(),
                from_degree: degree - 1,
                to_belt: "Branca".into(),
                to_degree: degree,
                date: date(2024, degree * 2, 1),
                approved_by: MemberId(99),
            };
            member.progression.degree = degree;
            store.commit_graduation(&member, &record).expect("commit");
        }

        let degrees: Vec<_> = store
            .graduations(member.id)
            .expect("list")
            .into_iter()
            .map(|g| g.to_degree)
            .collect();
        assert_eq!(degrees, vec![1, 2, 3]);
        assert_eq!(store.member(member.id).unwrap().unwrap().progression.degree, 3);
    }

    #[test]
    fn unknown_member_writes_fail() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let academy = store.create_academy("Centro".into(), fence()).expect("academy");
        let mut ghost = enrol(&mut store, academy.id, "Helena");
        ghost.id = MemberId(77);
        assert!(matches!(
            store.commit_check_in(&ghost, &check_in(ghost.id, date(2024, 1, 1))),
            Err(TatameError::MemberNotFound(MemberId(77)))
        ));
    }

    #[test]
    fn recovery_persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        // Phase 1: Create data
        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            let academy = store.create_academy("Centro".into(), fence()).expect("academy");
            let member = enrol(&mut store, academy.id, "Helena");
            store
                .commit_check_in(&member, &check_in(member.id, date(2024, 2, 1)))
                .expect("commit");
        }
        // Store dropped here, simulating process exit

        // Phase 2: Reopen, verify and keep allocating ids
        {
            let mut store = RedbStore::open(&db_path).expect("reopen db");
            assert_eq!(store.academies().expect("list").len(), 1);
            assert_eq!(store.check_ins(MemberId(1)).expect("list").len(), 1);

            let second = store.create_academy("Filial".into(), fence()).expect("academy");
            assert_eq!(second.id, AcademyId(2));
            let member = enrol(&mut store, second.id, "Caio");
            assert_eq!(member.id, MemberId(2));
        }
    }

    #[test]
    fn recovery_compact_and_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store.create_academy("Centro".into(), fence()).expect("academy");
            store.compact().expect("compact");
        }
        let store = RedbStore::open(&db_path).expect("reopen db");
        assert_eq!(store.academies().expect("list").len(), 1);
    }

    #[test]
    fn snapshot_round_trip_through_fresh_database() {
        let temp = tempdir().expect("temp dir");
        let mut source = RedbStore::open(temp.path().join("a.redb")).expect("open db");
        let academy = source.create_academy("Centro".into(), fence()).expect("academy");
        source
            .put_schema(academy.id, &BeltSchema::ibjjf_adult())
            .expect("schema");
        let member = enrol(&mut source, academy.id, "Helena");
        source
            .commit_check_in(&member, &check_in(member.id, date(2024, 2, 1)))
            .expect("commit");

        let snapshot = source.snapshot().expect("snapshot");
        let mut target = RedbStore::open(temp.path().join("b.redb")).expect("open db");
        target.restore(snapshot.clone()).expect("restore");
        assert_eq!(target.snapshot().expect("snapshot"), snapshot);

        assert!(target.restore(snapshot).is_err());
    }
}
