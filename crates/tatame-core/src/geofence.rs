//! # Geofence Validator
//!
//! Great-circle distance and circular zone membership.
//!
//! Both operations are pure and total over validated coordinates: they
//! never fail, never allocate and always return a finite, non-negative
//! distance. Range checking happens earlier, in `Coordinate::new`.

use crate::primitives::EARTH_RADIUS_METERS;
use crate::{Coordinate, GeoFence};
use serde::{Deserialize, Serialize};

/// Result of testing a point against a fence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FenceCheck {
    pub within_fence: bool,
    pub distance_meters: f64,
}

/// Haversine distance between two coordinates, in meters.
///
/// `h` is clamped to [0, 1] so rounding near antipodal points can never
/// push `sqrt(1 - h)` into NaN.
#[must_use]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let sin_lat = (d_lat / 2.0).sin();
    let sin_lon = (d_lon / 2.0).sin();
    let h = (sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lon * sin_lon).clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Test whether `point` lies inside `fence`. The boundary is inclusive.
#[must_use]
pub fn is_within_fence(point: Coordinate, fence: &GeoFence) -> FenceCheck {
    let distance = distance_meters(point, fence.center);
    FenceCheck {
        within_fence: distance <= fence.radius_meters,
        distance_meters: distance,
    }
}

impl GeoFence {
    /// Method form of [`is_within_fence`].
    #[must_use]
    pub fn check(&self, point: Coordinate) -> FenceCheck {
        is_within_fence(point, self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
