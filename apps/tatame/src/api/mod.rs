//! # Tatame HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET|POST /academies` - List / register academies
//! - `GET /academies/{id}` - Academy details
//! - `GET|PUT /academies/{id}/belts` - Read / replace the belt ladder
//! - `GET /academies/{id}/fence?latitude=..&longitude=..` - Fence diagnostics
//! - `GET|POST /academies/{id}/members` - List / enrol members
//! - `GET /academies/{id}/members/{mid}` - Member details
//! - `GET|POST /academies/{id}/members/{mid}/checkins` - History / check in
//! - `GET /academies/{id}/members/{mid}/eligibility?as_of=..` - Next rank verdict
//! - `GET|POST /academies/{id}/members/{mid}/graduations` - History / confirm
//! - `GET /academies/{id}/pending?as_of=..` - Eligible members awaiting approval
//! - `GET /export` - Base64 `TATM` snapshot of the whole ledger
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `TATAME_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `TATAME_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `TATAME_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AcademyListResponse, AcademyResponse, ApiError, AsOfQuery, BeltSchemaBody, CheckInJson,
    CheckInListResponse, CheckInResponse, CreateAcademyRequest, EligibilityResponse,
    EnrollRequest, ErrorResponse, ExportResponse, FenceResponse, GraduationListResponse,
    GraduationRequest, GraduationResponse, HealthResponse, MemberListResponse, MemberResponse,
    PendingEntry, PendingResponse, PointQuery,
};

use crate::config::Clock;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use chrono::NaiveDate;
use std::sync::Arc;
use tatame_core::{Ledger, TatameError, primitives::DEFAULT_FENCE_RADIUS_METERS};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum accepted request body (1 MB).
const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    /// Source of "today" for check-ins, enrolment and graduations.
    pub clock: Clock,
    /// Radius for academies registered without one.
    pub default_radius_meters: f64,
}

impl AppState {
    /// State over `ledger` with the UTC wall clock and a 100 m default radius.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            clock: Clock::default(),
            default_radius_meters: DEFAULT_FENCE_RADIUS_METERS,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_default_radius(mut self, radius_meters: f64) -> Self {
        self.default_radius_meters = radius_meters;
        self
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

/// Build CORS layer from `TATAME_CORS_ORIGINS`.
///
/// - `*`: any origin (development only)
/// - unset: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("TATAME_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (TATAME_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", origin);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in TATAME_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                cors_for(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No TATAME_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Restrictive CORS layer for local front ends.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();
    cors_for(origins)
}

fn cors_for(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if `TATAME_API_KEY` is set)
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set TATAME_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/academies",
            get(handlers::list_academies_handler).post(handlers::create_academy_handler),
        )
        .route("/academies/{id}", get(handlers::get_academy_handler))
        .route(
            "/academies/{id}/belts",
            get(handlers::get_belts_handler).put(handlers::put_belts_handler),
        )
        .route("/academies/{id}/fence", get(handlers::fence_handler))
        .route(
            "/academies/{id}/members",
            get(handlers::list_members_handler).post(handlers::enroll_handler),
        )
        .route(
            "/academies/{id}/members/{mid}",
            get(handlers::get_member_handler),
        )
        .route(
            "/academies/{id}/members/{mid}/checkins",
            get(handlers::list_check_ins_handler).post(handlers::check_in_handler),
        )
        .route(
            "/academies/{id}/members/{mid}/eligibility",
            get(handlers::eligibility_handler),
        )
        .route(
            "/academies/{id}/members/{mid}/graduations",
            get(handlers::list_graduations_handler).post(handlers::graduate_handler),
        )
        .route("/academies/{id}/pending", get(handlers::pending_handler))
        .route("/export", get(handlers::export_handler));

    // Innermost first: auth runs after the rate limiter
    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve until Ctrl+C.
///
/// The caller keeps its own clone of `state` to persist the ledger after
/// shutdown.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), TatameError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TatameError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Tatame HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TatameError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
