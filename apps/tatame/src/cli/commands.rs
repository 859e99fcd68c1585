//! # CLI Command Implementations
//!
//! Every command opens the configured ledger, performs one operation and,
//! for the `file` backend, writes the snapshot back.

use crate::api::{
    self, AcademyResponse, AppState, BeltSchemaBody, CheckInResponse, EligibilityResponse,
    GraduationResponse, MemberResponse, PendingEntry, PendingResponse,
};
use crate::config::{AppConfig, Backend, StorageConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tatame_core::{
    AcademyId, BeltRule, BeltSchema, Coordinate, EligibilityResult, Ledger, MemberId, NewMember,
    TargetKind, TatameError, distance_meters, formats::MAX_SNAPSHOT_PAYLOAD_SIZE,
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum belt ladder file size (1 MB).
const MAX_BELT_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum snapshot file size (64 MB).
const MAX_SNAPSHOT_FILE_SIZE: u64 = MAX_SNAPSHOT_PAYLOAD_SIZE as u64;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TatameError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TatameError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TatameError::InvalidInput(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, TatameError> {
    let canonical = path.canonicalize().map_err(|e| {
        TatameError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TatameError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path, which must be an existing directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, TatameError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        TatameError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(TatameError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| TatameError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server. The `file` backend is written back after shutdown.
pub async fn cmd_server(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), TatameError> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let ledger = open_ledger(&config.storage)?;

    let state = AppState::new(ledger)
        .with_clock(config.checkin.clock())
        .with_default_radius(config.checkin.default_radius_meters);

    println!("Tatame Academy Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", host);
    println!("  Port:       {}", port);
    println!("  Backend:    {}", config.storage.backend);
    println!("  Database:   {:?}", config.storage.database);
    println!("  Radius:     {} m", config.checkin.default_radius_meters);
    println!("  UTC offset: {} min", config.checkin.utc_offset_minutes);
    println!();
    println!("Endpoints:");
    println!("  GET|POST /academies                          - List / register");
    println!("  GET|PUT  /academies/{{id}}/belts               - Belt ladder");
    println!("  GET|POST /academies/{{id}}/members             - List / enrol");
    println!("  POST     /academies/{{id}}/members/{{mid}}/checkins");
    println!("  GET      /academies/{{id}}/members/{{mid}}/eligibility");
    println!("  POST     /academies/{{id}}/members/{{mid}}/graduations");
    println!("  GET      /academies/{{id}}/pending");
    println!("  GET      /export                              - TATM snapshot");
    println!("  GET      /health                              - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state.clone()).await?;

    let ledger = state.ledger.read().await;
    save_ledger(&ledger, &config.storage)?;
    tracing::info!(event = "ledger_saved", backend = %config.storage.backend, "Ledger saved");
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<(), TatameError> {
    let db_path = &config.storage.database;
    if db_path.exists() {
        if !force {
            return Err(TatameError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| TatameError::IoError(format!("Remove old database: {}", e)))?;
    }

    match config.storage.backend {
        Backend::Redb => {
            Ledger::open_persistent(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        Backend::File => {
            save_ledger(&Ledger::new(), &config.storage)?;
            println!("Initialized new file database at {:?}", db_path);
        }
    }
    Ok(())
}

// =============================================================================
// ACADEMY COMMANDS
// =============================================================================

pub fn cmd_academies(config: &AppConfig, json_mode: bool) -> Result<(), TatameError> {
    let ledger = open_ledger(&config.storage)?;
    let academies: Vec<AcademyResponse> =
        ledger.academies()?.into_iter().map(Into::into).collect();

    if json_mode {
        print_json(&serde_json::json!({ "academies": academies }));
        return Ok(());
    }

    if academies.is_empty() {
        println!("No academies registered. Use `tatame add-academy` to create one.");
        return Ok(());
    }
    println!("{:>4}  {:<30} {:>11} {:>12} {:>8}", "ID", "Name", "Latitude", "Longitude", "Radius");
    for a in &academies {
        println!(
            "{:>4}  {:<30} {:>11.6} {:>12.6} {:>6.0} m",
            a.id, a.name, a.latitude, a.longitude, a.radius_meters
        );
    }
    Ok(())
}

pub fn cmd_add_academy(
    config: &AppConfig,
    json_mode: bool,
    name: &str,
    latitude: f64,
    longitude: f64,
    radius: Option<f64>,
) -> Result<(), TatameError> {
    let center = Coordinate::new(latitude, longitude)?;
    let radius = radius.unwrap_or(config.checkin.default_radius_meters);

    let academy = mutate(&config.storage, |ledger| {
        ledger.create_academy(name, center, Some(radius))
    })?;
    let academy = AcademyResponse::from(academy);

    if json_mode {
        print_json(&academy);
    } else {
        println!(
            "Registered academy {} '{}' ({:.6}, {:.6}), radius {} m",
            academy.id, academy.name, academy.latitude, academy.longitude, academy.radius_meters
        );
    }
    Ok(())
}

// =============================================================================
// BELT COMMANDS
// =============================================================================

/// Belt ladder file: either `{"belts": [...]}` (JSON or TOML `[[belts]]`)
/// or a bare JSON array.
#[derive(Deserialize)]
#[serde(untagged)]
enum BeltFile {
    Wrapped { belts: Vec<BeltRule> },
    Bare(Vec<BeltRule>),
}

impl From<BeltFile> for Vec<BeltRule> {
    fn from(file: BeltFile) -> Self {
        match file {
            BeltFile::Wrapped { belts } | BeltFile::Bare(belts) => belts,
        }
    }
}

/// Read a ladder from a `.toml` file, or JSON otherwise.
pub fn read_belt_file(path: &Path) -> Result<Vec<BeltRule>, TatameError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, MAX_BELT_FILE_SIZE)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| TatameError::IoError(format!("Read belt file: {}", e)))?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let file: BeltFile = if is_toml {
        toml::from_str(&text)
            .map_err(|e| TatameError::InvalidSchema(format!("Invalid TOML belt file: {}", e)))?
    } else {
        serde_json::from_str(&text)
            .map_err(|e| TatameError::InvalidSchema(format!("Invalid JSON belt file: {}", e)))?
    };
    Ok(file.into())
}

pub fn cmd_load_belts(
    config: &AppConfig,
    json_mode: bool,
    academy: u64,
    file: Option<&Path>,
) -> Result<(), TatameError> {
    let belts = match file {
        Some(path) => read_belt_file(path)?,
        None => BeltSchema::ibjjf_adult().into(),
    };

    let schema = mutate(&config.storage, |ledger| {
        ledger.set_belt_schema(AcademyId(academy), belts)
    })?;

    if json_mode {
        print_json(&BeltSchemaBody {
            belts: schema.into(),
        });
    } else {
        println!("Loaded {} belts for academy {}", schema.len(), academy);
        print_ladder(schema.belts());
    }
    Ok(())
}

pub fn cmd_belts(config: &AppConfig, json_mode: bool, academy: u64) -> Result<(), TatameError> {
    let ledger = open_ledger(&config.storage)?;
    let schema = ledger.belt_schema(AcademyId(academy))?;

    if json_mode {
        print_json(&BeltSchemaBody {
            belts: schema.into(),
        });
    } else if schema.is_empty() {
        println!("Academy {} has no belt schema. Use `tatame load-belts`.", academy);
    } else {
        print_ladder(schema.belts());
    }
    Ok(())
}

fn print_ladder(belts: &[BeltRule]) {
    println!("{:>5}  {:<12} {:>10} {:>8}  Degrees (months)", "Order", "Belt", "Min months", "Max deg");
    for belt in belts {
        let degrees: Vec<String> = belt
            .degrees
            .iter()
            .map(|d| format!("{}:{}", d.degree_number, d.min_months))
            .collect();
        println!(
            "{:>5}  {:<12} {:>10} {:>8}  {}",
            belt.order,
            belt.name,
            belt.required_months(),
            belt.max_degrees,
            degrees.join(" ")
        );
    }
}

// =============================================================================
// MEMBER COMMANDS
// =============================================================================

pub fn cmd_add_member(
    config: &AppConfig,
    json_mode: bool,
    academy: u64,
    request: NewMember,
) -> Result<(), TatameError> {
    let today = config.checkin.clock().today();
    let member = mutate(&config.storage, |ledger| {
        ledger.enroll(AcademyId(academy), request, today)
    })?;
    let member = MemberResponse::from(member);

    if json_mode {
        print_json(&member);
    } else {
        println!(
            "Enrolled member {} '{}' as {} ({} {}, since {})",
            member.id, member.name, member.role, member.belt, member.degree, member.last_graduation
        );
    }
    Ok(())
}

pub fn cmd_members(config: &AppConfig, json_mode: bool, academy: u64) -> Result<(), TatameError> {
    let ledger = open_ledger(&config.storage)?;
    let members: Vec<MemberResponse> = ledger
        .members(AcademyId(academy))?
        .into_iter()
        .map(Into::into)
        .collect();

    if json_mode {
        print_json(&serde_json::json!({ "members": members }));
        return Ok(());
    }

    if members.is_empty() {
        println!("Academy {} has no members.", academy);
        return Ok(());
    }
    println!(
        "{:>4}  {:<24} {:<10} {:<12} {:>3} {:<10} {:>6} {:>6}",
        "ID", "Name", "Role", "Belt", "Deg", "Since", "DegDays", "BeltDays"
    );
    for m in &members {
        println!(
            "{:>4}  {:<24} {:<10} {:<12} {:>3} {:<10} {:>7} {:>8}",
            m.id,
            m.name,
            m.role.as_str(),
            m.belt,
            m.degree,
            m.last_graduation.to_string(),
            m.days_since_last_degree,
            m.days_since_last_belt_change
        );
    }
    Ok(())
}

// =============================================================================
// CHECK-IN COMMAND
// =============================================================================

pub fn cmd_check_in(
    config: &AppConfig,
    json_mode: bool,
    academy: u64,
    member: u64,
    latitude: f64,
    longitude: f64,
) -> Result<(), TatameError> {
    let point = Coordinate::new(latitude, longitude)?;
    let today = config.checkin.clock().today();

    let receipt = mutate(&config.storage, |ledger| {
        ledger.check_in(AcademyId(academy), MemberId(member), point, today)
    })?;
    let response = CheckInResponse::from(receipt);

    if json_mode {
        print_json(&response);
    } else {
        println!(
            "Check-in recorded for member {} on {} ({:.1} m from the academy)",
            response.member_id, response.check_in.date, response.check_in.distance_meters
        );
        println!(
            "Days since last degree: {}, since last belt change: {}",
            response.days_since_last_degree, response.days_since_last_belt_change
        );
    }
    Ok(())
}

// =============================================================================
// PROGRESSION COMMANDS
// =============================================================================

fn describe_eligibility(result: &EligibilityResult) -> String {
    match result.next_target_kind {
        TargetKind::None => "no promotion target (unconfigured belt or top of ladder)".to_string(),
        TargetKind::Degree | TargetKind::Belt => {
            let kind = if result.next_target_kind == TargetKind::Belt {
                "belt"
            } else {
                "degree"
            };
            if result.is_eligible {
                format!(
                    "ELIGIBLE for {} {} ({}/{} months)",
                    kind, result.next_target_label, result.months_elapsed, result.months_required
                )
            } else {
                format!(
                    "{} {} in {} months ({}/{} months)",
                    kind,
                    result.next_target_label,
                    result.months_remaining,
                    result.months_elapsed,
                    result.months_required
                )
            }
        }
    }
}

pub fn cmd_eligibility(
    config: &AppConfig,
    json_mode: bool,
    academy: u64,
    member: u64,
    as_of: Option<NaiveDate>,
) -> Result<(), TatameError> {
    let as_of = as_of.unwrap_or_else(|| config.checkin.clock().today());
    let ledger = open_ledger(&config.storage)?;
    let eligibility = ledger.eligibility(AcademyId(academy), MemberId(member), as_of)?;

    if json_mode {
        print_json(&EligibilityResponse {
            member_id: member,
            as_of,
            eligibility,
        });
    } else {
        println!(
            "Member {} as of {}: {}",
            member,
            as_of,
            describe_eligibility(&eligibility)
        );
    }
    Ok(())
}

pub fn cmd_pending(
    config: &AppConfig,
    json_mode: bool,
    academy: u64,
    as_of: Option<NaiveDate>,
) -> Result<(), TatameError> {
    let as_of = as_of.unwrap_or_else(|| config.checkin.clock().today());
    let ledger = open_ledger(&config.storage)?;
    let pending: Vec<PendingEntry> = ledger
        .pending_graduations(AcademyId(academy), as_of)?
        .into_iter()
        .map(Into::into)
        .collect();

    if json_mode {
        print_json(&PendingResponse { as_of, pending });
        return Ok(());
    }

    if pending.is_empty() {
        println!("No members eligible for graduation as of {}.", as_of);
        return Ok(());
    }
    println!("Eligible for graduation as of {}:", as_of);
    for entry in &pending {
        println!(
            "  {:>4}  {:<24} {} {} -> {}",
            entry.member.id,
            entry.member.name,
            entry.member.belt,
            entry.member.degree,
            entry.eligibility.next_target_label
        );
    }
    Ok(())
}

pub fn cmd_graduate(
    config: &AppConfig,
    json_mode: bool,
    academy: u64,
    member: u64,
    approver: u64,
) -> Result<(), TatameError> {
    let today = config.checkin.clock().today();
    let record = mutate(&config.storage, |ledger| {
        ledger.confirm_graduation(AcademyId(academy), MemberId(member), MemberId(approver), today)
    })?;
    let record = GraduationResponse::from(record);

    if json_mode {
        print_json(&record);
    } else {
        println!(
            "Member {} graduated from {} {} to {} {} on {} (approved by {})",
            record.member_id,
            record.from_belt,
            record.from_degree,
            record.to_belt,
            record.to_degree,
            record.date,
            record.approved_by
        );
    }
    Ok(())
}

// =============================================================================
// DISTANCE COMMAND
// =============================================================================

pub fn cmd_distance(json_mode: bool, from: (f64, f64), to: (f64, f64)) -> Result<(), TatameError> {
    let a = Coordinate::new(from.0, from.1)?;
    let b = Coordinate::new(to.0, to.1)?;
    let meters = distance_meters(a, b);

    if json_mode {
        print_json(&serde_json::json!({ "distance_meters": meters }));
    } else {
        println!("{:.2} m", meters);
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT / COMPACT COMMANDS
// =============================================================================

/// Write the whole ledger to a `TATM` snapshot file.
pub fn cmd_export(config: &AppConfig, output: &Path) -> Result<(), TatameError> {
    let validated_output = validate_output_path(output)?;
    let ledger = open_ledger(&config.storage)?;
    let data = ledger.export_bytes()?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| TatameError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);
    Ok(())
}

/// Load a `TATM` snapshot into the (empty) configured database.
pub fn cmd_import(config: &AppConfig, input: &Path) -> Result<(), TatameError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_SNAPSHOT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| TatameError::IoError(format!("Read file: {}", e)))?;

    let snapshot = mutate(&config.storage, |ledger| ledger.import_bytes(&data))?;

    println!(
        "Imported {} academies, {} members, {} check-ins, {} graduations",
        snapshot.academies.len(),
        snapshot.members.len(),
        snapshot.check_ins.len(),
        snapshot.graduations.len()
    );
    Ok(())
}

/// Reclaim free pages in the redb database file.
pub fn cmd_compact(config: &AppConfig) -> Result<(), TatameError> {
    if config.storage.backend != Backend::Redb {
        return Err(TatameError::InvalidInput(
            "compact requires the redb backend".to_string(),
        ));
    }
    if !config.storage.database.exists() {
        return Err(TatameError::IoError(format!(
            "Database not found: {:?}",
            config.storage.database
        )));
    }

    let mut ledger = open_ledger(&config.storage)?;
    ledger.compact()?;
    tracing::info!(event = "database_compacted", "Database compacted");
    println!("Compacted {:?}", config.storage.database);
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the ledger for the configured backend.
///
/// `redb` opens (or creates) the database. `file` loads the snapshot file
/// into memory, or starts empty when it does not exist yet.
pub fn open_ledger(storage: &StorageConfig) -> Result<Ledger, TatameError> {
    match storage.backend {
        Backend::Redb => Ledger::open_persistent(&storage.database),
        Backend::File => {
            let path = &storage.database;
            if !path.exists() {
                return Ok(Ledger::new());
            }
            validate_file_size(path, MAX_SNAPSHOT_FILE_SIZE)?;
            let data = std::fs::read(path)
                .map_err(|e| TatameError::IoError(format!("Read db: {}", e)))?;
            let mut ledger = Ledger::new();
            ledger.import_bytes(&data)?;
            Ok(ledger)
        }
    }
}

/// Persist an in-memory ledger to the snapshot file. No-op for `redb`.
pub fn save_ledger(ledger: &Ledger, storage: &StorageConfig) -> Result<(), TatameError> {
    if ledger.is_persistent() {
        return Ok(());
    }
    let data = ledger.export_bytes()?;
    std::fs::write(&storage.database, &data)
        .map_err(|e| TatameError::IoError(format!("Write db: {}", e)))
}

/// Open, apply one change, save.
fn mutate<T>(
    storage: &StorageConfig,
    change: impl FnOnce(&mut Ledger) -> Result<T, TatameError>,
) -> Result<T, TatameError> {
    let mut ledger = open_ledger(storage)?;
    let outcome = change(&mut ledger)?;
    save_ledger(&ledger, storage)?;
    Ok(outcome)
}

// =============================================================================
// TESTS
// =============================================================================
