//! # Core Type Definitions
//!
//! This module contains the records the engine reads and produces:
//! - Identifiers (`AcademyId`, `MemberId`)
//! - Geography (`Coordinate`, `GeoFence`)
//! - Membership (`Role`, `Academy`, `Member`, `ProgressionState`)
//! - History records (`CheckIn`, `GraduationRecord`)
//! - Error types (`TatameError`)
//!
//! ## Validation
//!
//! Geographic types validate their ranges at construction. Everything
//! downstream (distance, fence membership) assumes validated input and
//! stays infallible.

use crate::attendance::AttendanceCounters;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for an academy (a gym location).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AcademyId(pub u64);

/// Unique identifier for a member of an academy.
///
/// Member ids are unique across the whole store, not only per academy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u64);

impl std::fmt::Display for AcademyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// GEOGRAPHY
// =============================================================================

/// A point on the Earth's surface, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a validated coordinate.
    ///
    /// Returns `TatameError::InvalidCoordinate` if either component is not
    /// finite or lies outside latitude [-90, 90] / longitude [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, TatameError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(TatameError::InvalidCoordinate(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(TatameError::InvalidCoordinate(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Re-check a coordinate that arrived through deserialization.
    pub fn validated(self) -> Result<Self, TatameError> {
        Self::new(self.latitude, self.longitude)
    }
}

/// A circular zone around an academy, used to accept check-ins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub center: Coordinate,
    pub radius_meters: f64,
}

impl GeoFence {
    /// Create a fence. The radius must be finite and strictly positive.
    pub fn new(center: Coordinate, radius_meters: f64) -> Result<Self, TatameError> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(TatameError::InvalidFence(format!(
                "radius {} must be a positive number of meters",
                radius_meters
            )));
        }
        Ok(Self {
            center: center.validated()?,
            radius_meters,
        })
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Access role of a member inside an academy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Professor,
    Admin,
}

impl Role {
    /// Professors and admins confirm graduations; students never do.
    #[must_use]
    pub fn can_approve_graduations(&self) -> bool {
        matches!(self, Role::Professor | Role::Admin)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professor => "professor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = TatameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" | "aluno" => Ok(Role::Student),
            "professor" => Ok(Role::Professor),
            "admin" => Ok(Role::Admin),
            other => Err(TatameError::InvalidInput(format!("unknown role '{}'", other))),
        }
    }
}

/// A gym location with its check-in fence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Academy {
    pub id: AcademyId,
    pub name: String,
    pub fence: GeoFence,
}

/// Where a member currently stands on the belt ladder.
///
/// `belt` is free text: it either names an entry of the academy's
/// `BeltSchema` or is a legacy/unconfigured belt, in which case no
/// eligibility can be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub belt: String,
    pub degree: u32,
    pub last_graduation: NaiveDate,
}

impl ProgressionState {
    #[must_use]
    pub fn new(belt: impl Into<String>, degree: u32, last_graduation: NaiveDate) -> Self {
        Self {
            belt: belt.into(),
            degree,
            last_graduation,
        }
    }
}

/// A person enrolled in an academy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub academy: AcademyId,
    pub name: String,
    pub role: Role,
    pub progression: ProgressionState,
    pub attendance: AttendanceCounters,
}

// =============================================================================
// HISTORY RECORDS
// =============================================================================

/// One accepted check-in. At most one exists per member per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub member: MemberId,
    pub date: NaiveDate,
    pub point: Coordinate,
    pub distance_meters: f64,
}

/// A confirmed promotion, kept as an append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraduationRecord {
    pub member: MemberId,
    pub from_belt: String,
    pub from_degree: u32,
    pub to_belt: String,
    pub to_degree: u32,
    pub date: NaiveDate,
    pub approved_by: MemberId,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Tatame system.
///
/// - No silent failures
/// - Use `Result<T, TatameError>` for fallible operations
/// - An unconfigured belt is NOT an error: it yields an eligibility
///   result with no target
#[derive(Debug, Error)]
pub enum TatameError {
    /// Latitude/longitude outside their valid ranges.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// A fence with a non-positive or non-finite radius.
    #[error("Invalid fence: {0}")]
    InvalidFence(String),

    /// A belt/degree schema that breaks ordering or numbering rules.
    #[error("Invalid belt schema: {0}")]
    InvalidSchema(String),

    /// Any other malformed request field.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Academy not found: {0}")]
    AcademyNotFound(AcademyId),

    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("Member {member} does not belong to academy {academy}")]
    MemberNotInAcademy { member: MemberId, academy: AcademyId },

    /// The check-in point is farther from the academy than its radius.
    #[error("Outside check-in zone: {distance_meters:.1} m from academy (limit {radius_meters:.1} m)")]
    OutsideFence {
        distance_meters: f64,
        radius_meters: f64,
    },

    /// The member already has a check-in for this calendar day.
    #[error("Already checked in on {0}")]
    AlreadyCheckedIn(NaiveDate),

    /// The current belt is unconfigured, or the member is at the top.
    #[error("No next degree or belt is configured for this member")]
    NoPromotionTarget,

    #[error("Not yet eligible: {months_remaining} month(s) remaining")]
    NotEligible { months_remaining: u32 },

    /// The acting member's role does not allow the operation.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_accepts_bounds() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
        assert!(Coordinate::new(-23.6183, -45.4211).is_ok());
    }

    #[test]
    fn coordinate_rejects_out_of_range() {
        assert!(matches!(
            Coordinate::new(90.5, 0.0),
            Err(TatameError::InvalidCoordinate(_))
        ));
        assert!(matches!(
            Coordinate::new(0.0, -180.1),
            Err(TatameError::InvalidCoordinate(_))
        ));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn fence_requires_positive_radius() {
        let center = Coordinate::new(0.0, 0.0).expect("valid");
        assert!(GeoFence::new(center, 100.0).is_ok());
        assert!(matches!(
            GeoFence::new(center, 0.0),
            Err(TatameError::InvalidFence(_))
        ));
        assert!(GeoFence::new(center, -5.0).is_err());
        assert!(GeoFence::new(center, f64::NAN).is_err());
    }

    #[test]
    fn fence_revalidates_deserialized_center() {
        let center = Coordinate {
            latitude: 123.0,
            longitude: 0.0,
        };
        assert!(GeoFence::new(center, 10.0).is_err());
    }

    #[test]
    fn role_parsing_and_permissions() {
        assert_eq!("Professor".parse::<Role>().expect("parse"), Role::Professor);
        assert_eq!("aluno".parse::<Role>().expect("parse"), Role::Student);
        assert!("sensei".parse::<Role>().is_err());

        assert!(!Role::Student.can_approve_graduations());
        assert!(Role::Professor.can_approve_graduations());
        assert!(Role::Admin.can_approve_graduations());
    }
}
