//! # API Endpoint Handlers
//!
//! Each handler parses the request, takes the ledger lock, calls exactly
//! one ledger operation and maps the outcome. Errors become
//! `{"success": false, "error": ...}` through [`ApiError`].

use super::{
    AppState,
    types::{
        AcademyListResponse, AcademyResponse, ApiError, AsOfQuery, BeltSchemaBody,
        CheckInListResponse, CheckInResponse, CreateAcademyRequest, EligibilityResponse,
        EnrollRequest, ExportResponse, FenceResponse, GraduationListResponse, GraduationRequest,
        GraduationResponse, HealthResponse, MemberListResponse, MemberResponse, PendingResponse,
        PointQuery,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tatame_core::{AcademyId, Coordinate, MemberId, TatameError};

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// ACADEMY HANDLERS
// =============================================================================

/// List every academy.
pub async fn list_academies_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<AcademyListResponse>> {
    let ledger = state.ledger.read().await;
    let academies = ledger.academies()?.into_iter().map(Into::into).collect();
    Ok(Json(AcademyListResponse { academies }))
}

/// Register an academy.
pub async fn create_academy_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateAcademyRequest>,
) -> ApiResult<(StatusCode, Json<AcademyResponse>)> {
    let center = Coordinate::new(request.latitude, request.longitude)?;
    let radius = request
        .radius_meters
        .unwrap_or(state.default_radius_meters);

    let mut ledger = state.ledger.write().await;
    let academy = ledger.create_academy(&request.name, center, Some(radius))?;
    tracing::info!(
        event = "academy_created",
        academy_id = academy.id.0,
        radius_meters = radius,
        "Academy registered"
    );
    Ok((StatusCode::CREATED, Json(academy.into())))
}

pub async fn get_academy_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
) -> ApiResult<Json<AcademyResponse>> {
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.academy(AcademyId(academy))?.into()))
}

/// Distance and fence membership for an arbitrary point. Records nothing.
pub async fn fence_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
    Query(point): Query<PointQuery>,
) -> ApiResult<Json<FenceResponse>> {
    let point = Coordinate::new(point.latitude, point.longitude)?;
    let ledger = state.ledger.read().await;
    let academy = ledger.academy(AcademyId(academy))?;
    let check = ledger.fence_check(academy.id, point)?;
    Ok(Json(FenceResponse::new(check, academy.fence.radius_meters)))
}

// =============================================================================
// BELT SCHEMA HANDLERS
// =============================================================================

pub async fn get_belts_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
) -> ApiResult<Json<BeltSchemaBody>> {
    let ledger = state.ledger.read().await;
    let schema = ledger.belt_schema(AcademyId(academy))?;
    Ok(Json(BeltSchemaBody {
        belts: schema.into(),
    }))
}

/// Replace the academy's belt ladder. The stored (sorted) ladder is returned.
pub async fn put_belts_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
    Json(body): Json<BeltSchemaBody>,
) -> ApiResult<Json<BeltSchemaBody>> {
    let mut ledger = state.ledger.write().await;
    let schema = ledger.set_belt_schema(AcademyId(academy), body.belts)?;
    tracing::info!(
        event = "belt_schema_replaced",
        academy_id = academy,
        belts = schema.len(),
        "Belt schema replaced"
    );
    Ok(Json(BeltSchemaBody {
        belts: schema.into(),
    }))
}

// =============================================================================
// MEMBER HANDLERS
// =============================================================================

pub async fn list_members_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
) -> ApiResult<Json<MemberListResponse>> {
    let ledger = state.ledger.read().await;
    let members = ledger
        .members(AcademyId(academy))?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(MemberListResponse { members }))
}

pub async fn enroll_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
    Json(request): Json<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<MemberResponse>)> {
    let today = state.today();
    let mut ledger = state.ledger.write().await;
    let member = ledger.enroll(AcademyId(academy), request.into(), today)?;
    tracing::info!(
        event = "member_enrolled",
        academy_id = academy,
        member_id = member.id.0,
        "Member enrolled"
    );
    Ok((StatusCode::CREATED, Json(member.into())))
}

pub async fn get_member_handler(
    State(state): State<AppState>,
    Path((academy, member)): Path<(u64, u64)>,
) -> ApiResult<Json<MemberResponse>> {
    let ledger = state.ledger.read().await;
    Ok(Json(
        ledger.member(AcademyId(academy), MemberId(member))?.into(),
    ))
}

// =============================================================================
// CHECK-IN HANDLERS
// =============================================================================

/// Record today's check-in at the given location.
pub async fn check_in_handler(
    State(state): State<AppState>,
    Path((academy, member)): Path<(u64, u64)>,
    Json(point): Json<PointQuery>,
) -> ApiResult<(StatusCode, Json<CheckInResponse>)> {
    let today = state.today();
    let point = Coordinate::new(point.latitude, point.longitude)?;

    let mut ledger = state.ledger.write().await;
    match ledger.check_in(AcademyId(academy), MemberId(member), point, today) {
        Ok(receipt) => {
            tracing::info!(
                event = "check_in_accepted",
                academy_id = academy,
                member_id = member,
                distance_meters = receipt.check_in.distance_meters,
                "Check-in recorded"
            );
            Ok((StatusCode::CREATED, Json(receipt.into())))
        }
        Err(e) => {
            if matches!(
                e,
                TatameError::OutsideFence { .. } | TatameError::AlreadyCheckedIn(_)
            ) {
                tracing::warn!(
                    event = "check_in_rejected",
                    academy_id = academy,
                    member_id = member,
                    reason = %e,
                    "Check-in rejected"
                );
            }
            Err(e.into())
        }
    }
}

pub async fn list_check_ins_handler(
    State(state): State<AppState>,
    Path((academy, member)): Path<(u64, u64)>,
) -> ApiResult<Json<CheckInListResponse>> {
    let ledger = state.ledger.read().await;
    let check_ins = ledger
        .check_ins(AcademyId(academy), MemberId(member))?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(CheckInListResponse { check_ins }))
}

// =============================================================================
// PROGRESSION HANDLERS
// =============================================================================

pub async fn eligibility_handler(
    State(state): State<AppState>,
    Path((academy, member)): Path<(u64, u64)>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<Json<EligibilityResponse>> {
    let as_of = query.as_of.unwrap_or_else(|| state.today());
    let ledger = state.ledger.read().await;
    let eligibility = ledger.eligibility(AcademyId(academy), MemberId(member), as_of)?;
    Ok(Json(EligibilityResponse {
        member_id: member,
        as_of,
        eligibility,
    }))
}

/// Members waiting for a professor to confirm their next rank.
pub async fn pending_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<Json<PendingResponse>> {
    let as_of = query.as_of.unwrap_or_else(|| state.today());
    let ledger = state.ledger.read().await;
    let pending = ledger
        .pending_graduations(AcademyId(academy), as_of)?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(PendingResponse { as_of, pending }))
}

/// Confirm the member's next degree or belt.
pub async fn graduate_handler(
    State(state): State<AppState>,
    Path((academy, member)): Path<(u64, u64)>,
    Json(request): Json<GraduationRequest>,
) -> ApiResult<(StatusCode, Json<GraduationResponse>)> {
    let today = state.today();
    let mut ledger = state.ledger.write().await;
    let record = ledger.confirm_graduation(
        AcademyId(academy),
        MemberId(member),
        MemberId(request.approver_id),
        today,
    )?;
    tracing::info!(
        event = "graduation_confirmed",
        academy_id = academy,
        member_id = member,
        approver_id = request.approver_id,
        to_belt = %record.to_belt,
        to_degree = record.to_degree,
        "Graduation confirmed"
    );
    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn list_graduations_handler(
    State(state): State<AppState>,
    Path((academy, member)): Path<(u64, u64)>,
) -> ApiResult<Json<GraduationListResponse>> {
    let ledger = state.ledger.read().await;
    let graduations = ledger
        .graduations(AcademyId(academy), MemberId(member))?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(GraduationListResponse { graduations }))
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export the whole ledger as a base64 `TATM` snapshot.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    match ledger.export_bytes() {
        Ok(data) => (StatusCode::OK, Json(ExportResponse::success(&data))),
        Err(e) => {
            tracing::error!(event = "export_failed", error = %e, "Export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResponse::error(format!("Export failed: {}", e))),
            )
        }
    }
}
