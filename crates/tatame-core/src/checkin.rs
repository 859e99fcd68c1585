//! # Check-in Policy
//!
//! Decides whether a check-in attempt is accepted:
//! 1. The point must be a valid coordinate.
//! 2. It must lie inside the academy fence (inclusive boundary).
//! 3. The member must not already have a check-in on the same calendar day.
//!
//! The policy is pure. Persisting the accepted record and bumping the
//! counters is the ledger's job, which repeats the same-day check inside
//! its write transaction.

use crate::geofence::is_within_fence;
use crate::{CheckIn, Coordinate, GeoFence, MemberId, TatameError};
use chrono::NaiveDate;

/// Evaluate a check-in attempt and build the record to store.
pub fn admit(
    member: MemberId,
    fence: &GeoFence,
    point: Coordinate,
    last_check_in: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<CheckIn, TatameError> {
    let point = point.validated()?;

    let check = is_within_fence(point, fence);
    if !check.within_fence {
        return Err(TatameError::OutsideFence {
            distance_meters: check.distance_meters,
            radius_meters: fence.radius_meters,
        });
    }

    if last_check_in == Some(today) {
        return Err(TatameError::AlreadyCheckedIn(today));
    }

    Ok(CheckIn {
        member,
        date: today,
        point,
        distance_meters: check.distance_meters,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn academy_fence() -> GeoFence {
        let center = Coordinate::new(-23.6183, -45.4211).expect("center");
        GeoFence::new(center, 100.0).expect("fence")
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("date")
    }

    #[test]
    fn accepts_point_inside_fence() {
        let point = Coordinate::new(-23.6180, -45.4211).expect("point");
        let record = admit(MemberId(7), &academy_fence(), point, None, today()).expect("admit");
        assert_eq!(record.member, MemberId(7));
        assert_eq!(record.date, today());
        assert!(record.distance_meters < 100.0);
    }

    #[test]
    fn rejects_point_outside_fence() {
        let point = Coordinate::new(-23.6200, -45.4211).expect("point");
        let result = admit(MemberId(7), &academy_fence(), point, None, today());
        match result {
            Err(TatameError::OutsideFence {
                distance_meters,
                radius_meters,
            }) => {
                assert!(distance_meters > 100.0);
                assert_eq!(radius_meters, 100.0);
            }
            other => panic!("expected OutsideFence, got {:?}", other),
        }
    }

    #[test]
    fn rejects_second_check_in_same_day() {
        let point = Coordinate::new(-23.6183, -45.4211).expect("point");
        let result = admit(MemberId(7), &academy_fence(), point, Some(today()), today());
        assert!(matches!(result, Err(TatameError::AlreadyCheckedIn(d)) if d == today()));
    }

    #[test]
    fn accepts_after_previous_day() {
        let point = Coordinate::new(-23.6183, -45.4211).expect("point");
        let yesterday = today().pred_opt().expect("yesterday");
        assert!(admit(MemberId(7), &academy_fence(), point, Some(yesterday), today()).is_ok());
    }

    #[test]
    fn rejects_unvalidated_point() {
        let point = Coordinate {
            latitude: -123.0,
            longitude: 0.0,
        };
        let result = admit(MemberId(7), &academy_fence(), point, None, today());
        assert!(matches!(result, Err(TatameError::InvalidCoordinate(_))));
    }
}
