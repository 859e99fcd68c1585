//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tatame_core::{
    Academy, BeltRule, CheckIn, CheckInReceipt, EligibilityResult, FenceCheck, GraduationRecord,
    Member, NewMember, PendingGraduation, Role, TatameError,
};

// =============================================================================
// ERRORS
// =============================================================================

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}

/// A core error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub TatameError);

impl ApiError {
    /// HTTP status for each error kind.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TatameError::InvalidCoordinate(_)
            | TatameError::InvalidFence(_)
            | TatameError::InvalidSchema(_)
            | TatameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TatameError::AcademyNotFound(_)
            | TatameError::MemberNotFound(_)
            | TatameError::MemberNotInAcademy { .. } => StatusCode::NOT_FOUND,
            TatameError::OutsideFence { .. } | TatameError::NotAuthorized(_) => {
                StatusCode::FORBIDDEN
            }
            TatameError::AlreadyCheckedIn(_) => StatusCode::CONFLICT,
            TatameError::NotEligible { .. } | TatameError::NoPromotionTarget => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            TatameError::SerializationError(_)
            | TatameError::DeserializationError(_)
            | TatameError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TatameError> for ApiError {
    fn from(err: TatameError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(event = "storage_error", error = %self.0, "Request failed");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ACADEMIES
// =============================================================================

/// Academy creation request. `radius_meters` falls back to the configured default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAcademyRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub radius_meters: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademyResponse {
    pub id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl From<Academy> for AcademyResponse {
    fn from(academy: Academy) -> Self {
        Self {
            id: academy.id.0,
            name: academy.name,
            latitude: academy.fence.center.latitude,
            longitude: academy.fence.center.longitude,
            radius_meters: academy.fence.radius_meters,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademyListResponse {
    pub academies: Vec<AcademyResponse>,
}

// =============================================================================
// BELT SCHEMA
// =============================================================================

/// Belt ladder, used both to replace and to read a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeltSchemaBody {
    pub belts: Vec<BeltRule>,
}

// =============================================================================
// FENCE DIAGNOSTICS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointQuery {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FenceResponse {
    pub within_fence: bool,
    pub distance_meters: f64,
    pub radius_meters: f64,
}

impl FenceResponse {
    pub fn new(check: FenceCheck, radius_meters: f64) -> Self {
        Self {
            within_fence: check.within_fence,
            distance_meters: check.distance_meters,
            radius_meters,
        }
    }
}

// =============================================================================
// MEMBERS
// =============================================================================

/// Enrolment request. Omitted fields take the academy's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
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

impl From<EnrollRequest> for NewMember {
    fn from(request: EnrollRequest) -> Self {
        Self {
            name: request.name,
            role: request.role,
            belt: request.belt,
            degree: request.degree,
            last_graduation: request.last_graduation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: u64,
    pub academy_id: u64,
    pub name: String,
    pub role: Role,
    pub belt: String,
    pub degree: u32,
    pub last_graduation: NaiveDate,
    pub days_since_last_degree: u32,
    pub days_since_last_belt_change: u32,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id.0,
            academy_id: member.academy.0,
            name: member.name,
            role: member.role,
            belt: member.progression.belt,
            degree: member.progression.degree,
            last_graduation: member.progression.last_graduation,
            days_since_last_degree: member.attendance.days_since_last_degree,
            days_since_last_belt_change: member.attendance.days_since_last_belt_change,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberResponse>,
}

// =============================================================================
// CHECK-INS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInJson {
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_meters: f64,
}

impl From<CheckIn> for CheckInJson {
    fn from(record: CheckIn) -> Self {
        Self {
            date: record.date,
            latitude: record.point.latitude,
            longitude: record.point.longitude,
            distance_meters: record.distance_meters,
        }
    }
}

/// Accepted check-in with the member's updated counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub success: bool,
    pub member_id: u64,
    pub check_in: CheckInJson,
    pub days_since_last_degree: u32,
    pub days_since_last_belt_change: u32,
}

impl From<CheckInReceipt> for CheckInResponse {
    fn from(receipt: CheckInReceipt) -> Self {
        Self {
            success: true,
            member_id: receipt.check_in.member.0,
            check_in: receipt.check_in.into(),
            days_since_last_degree: receipt.attendance.days_since_last_degree,
            days_since_last_belt_change: receipt.attendance.days_since_last_belt_change,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInListResponse {
    pub check_ins: Vec<CheckInJson>,
}

// =============================================================================
// ELIGIBILITY
// =============================================================================

/// Optional evaluation date (`?as_of=YYYY-MM-DD`); defaults to today.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AsOfQuery {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityResponse {
    pub member_id: u64,
    pub as_of: NaiveDate,
    #[serde(flatten)]
    pub eligibility: EligibilityResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingEntry {
    pub member: MemberResponse,
    pub eligibility: EligibilityResult,
}

impl From<PendingGraduation> for PendingEntry {
    fn from(pending: PendingGraduation) -> Self {
        Self {
            member: pending.member.into(),
            eligibility: pending.eligibility,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResponse {
    pub as_of: NaiveDate,
    pub pending: Vec<PendingEntry>,
}

// =============================================================================
// GRADUATIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraduationRequest {
    pub approver_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraduationResponse {
    pub member_id: u64,
    pub from_belt: String,
    pub from_degree: u32,
    pub to_belt: String,
    pub to_degree: u32,
    pub date: NaiveDate,
    pub approved_by: u64,
}

impl From<GraduationRecord> for GraduationResponse {
    fn from(record: GraduationRecord) -> Self {
        Self {
            member_id: record.member.0,
            from_belt: record.from_belt,
            from_degree: record.from_degree,
            to_belt: record.to_belt,
            to_degree: record.to_degree,
            date: record.date,
            approved_by: record.approved_by.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraduationListResponse {
    pub graduations: Vec<GraduationResponse>,
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>, // Base64 encoded TATM snapshot
    pub size_bytes: usize,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: &[u8]) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                data,
            )),
            size_bytes: data.len(),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            size_bytes: 0,
            error: Some(msg.into()),
        }
    }
}
