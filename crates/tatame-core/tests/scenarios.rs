//! # End-to-End Scenarios
//!
//! The reference academy walkthroughs: two check-in attempts against a
//! 100 m fence, and two eligibility verdicts on a Branca/Azul ladder.
//! Each scenario runs against the pure engines and again through the
//! `Ledger`.

use chrono::NaiveDate;
use tatame_core::{
    BeltRule, BeltSchema, Coordinate, DegreeRule, GeoFence, Ledger, NewMember, ProgressionState,
    TargetKind, TatameError, compute_eligibility, is_within_fence,
};

/// Meters per degree of latitude on the Haversine sphere.
const METERS_PER_DEGREE: f64 = 111_194.93;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn center() -> Coordinate {
    Coordinate::new(-23.6183, -45.4211).expect("center")
}

fn north_of_center(meters: f64) -> Coordinate {
    Coordinate::new(-23.6183 + meters / METERS_PER_DEGREE, -45.4211).expect("point")
}

fn branca_azul() -> Vec<BeltRule> {
    let degrees = |months: u32| -> Vec<DegreeRule> {
        (1..=4)
            .map(|degree_number| DegreeRule {
                degree_number,
                min_months: months,
            })
            .collect()
    };
    vec![
        BeltRule {
            name: "Branca".into(),
            order: 1,
            min_years: 0,
            min_months: 0,
            max_degrees: 4,
            degrees: degrees(2),
        },
        BeltRule {
            name: "Azul".into(),
            order: 2,
            min_years: 1,
            min_months: 0,
            max_degrees: 4,
            degrees: degrees(4),
        },
    ]
}

// =============================================================================
// SCENARIO 1 + 2: GEOFENCE
// =============================================================================

mod geofence {
    use super::*;

    #[test]
    fn fifty_meters_is_inside() {
        let fence = GeoFence::new(center(), 100.0).expect("fence");
        let check = is_within_fence(north_of_center(50.0), &fence);
        assert!(check.within_fence);
        assert!((check.distance_meters - 50.0).abs() < 0.5);
    }

    #[test]
    fn one_hundred_fifty_meters_is_outside() {
        let fence = GeoFence::new(center(), 100.0).expect("fence");
        let check = is_within_fence(north_of_center(150.0), &fence);
        assert!(!check.within_fence);
        assert!((check.distance_meters - 150.0).abs() < 0.5);
    }

    #[test]
    fn ledger_check_in_follows_fence() {
        let mut ledger = Ledger::new();
        let academy = ledger
            .create_academy("Tatame Ubatuba", center(), Some(100.0))
            .expect("academy")
            .id;
        let member = ledger
            .enroll(
                academy,
                NewMember {
                    name: "Helena".into(),
                    belt: Some("Branca".into()),
                    ..NewMember::default()
                },
                date(2024, 3, 15),
            )
            .expect("member")
            .id;

        let rejected = ledger.check_in(academy, member, north_of_center(150.0), date(2024, 3, 15));
        assert!(matches!(rejected, Err(TatameError::OutsideFence { .. })));

        let receipt = ledger
            .check_in(academy, member, north_of_center(50.0), date(2024, 3, 15))
            .expect("inside");
        assert!((receipt.check_in.distance_meters - 50.0).abs() < 0.5);
        assert_eq!(receipt.attendance.days_since_last_degree, 1);
    }
}

// =============================================================================
// SCENARIO 3 + 4: PROGRESSION
// =============================================================================

mod progression {
    use super::*;

    #[test]
    fn degree_one_after_two_months() {
        let schema = BeltSchema::new(branca_azul()).expect("schema");
        let state = ProgressionState::new("Branca", 0, date(2024, 1, 15));
        let result = compute_eligibility(&state, &schema, date(2024, 3, 15));

        assert_eq!(result.next_target_kind, TargetKind::Degree);
        assert_eq!(result.months_elapsed, 2);
        assert_eq!(result.months_required, 2);
        assert_eq!(result.months_remaining, 0);
        assert!(result.is_eligible);
    }

    #[test]
    fn azul_needs_four_more_months() {
        let schema = BeltSchema::new(branca_azul()).expect("schema");
        let state = ProgressionState::new("Branca", 4, date(2024, 1, 15));
        let result = compute_eligibility(&state, &schema, date(2024, 9, 15));

        assert_eq!(result.next_target_kind, TargetKind::Belt);
        assert_eq!(result.next_target_label, "Azul");
        assert_eq!(result.months_elapsed, 8);
        assert_eq!(result.months_required, 12);
        assert_eq!(result.months_remaining, 4);
        assert!(!result.is_eligible);
    }

    #[test]
    fn ledger_agrees_with_engine() {
        let mut ledger = Ledger::new();
        let academy = ledger
            .create_academy("Tatame Ubatuba", center(), None)
            .expect("academy")
            .id;
        ledger
            .set_belt_schema(academy, branca_azul())
            .expect("schema");
        let today = date(2024, 3, 15);

        let fresh = ledger
            .enroll(
                academy,
                NewMember {
                    name: "Helena".into(),
                    last_graduation: Some(date(2024, 1, 15)),
                    ..NewMember::default()
                },
                today,
            )
            .expect("member");
        let veteran = ledger
            .enroll(
                academy,
                NewMember {
                    name: "Rafa".into(),
                    degree: 4,
                    last_graduation: Some(date(2023, 7, 15)),
                    ..NewMember::default()
                },
                today,
            )
            .expect("member");

        let schema = ledger.belt_schema(academy).expect("schema");
        for member in [&fresh, &veteran] {
            let via_ledger = ledger
                .eligibility(academy, member.id, today)
                .expect("eligibility");
            assert_eq!(
                via_ledger,
                compute_eligibility(&member.progression, &schema, today)
            );
        }

        let pending = ledger.pending_graduations(academy, today).expect("pending");
        let ids: Vec<_> = pending.iter().map(|p| p.member.id).collect();
        assert_eq!(ids, vec![fresh.id]);
        assert_eq!(pending[0].eligibility.next_target_label, "Branca 1");
    }
}
