//! # Progression Engine
//!
//! Turns "time since last graduation" plus an academy's [`BeltSchema`] into
//! an eligibility verdict for the next degree or the next belt.
//!
//! ## Decision order
//!
//! | Step | Condition | Target |
//! |------|-----------|--------|
//! | 1 | current belt not in schema | none |
//! | 2 | degree `current + 1` configured in current belt | degree |
//! | 3 | a belt with a higher `order` exists | next belt |
//! | 4 | otherwise (top of the ladder) | none |
//!
//! A configured next degree always wins over the next belt, even when the
//! student already has enough time for the belt.
//!
//! Every view (student dashboard, professor queue, graduation confirmation)
//! goes through [`ProgressionEngine::eligibility`], so they cannot disagree.

use crate::attendance::AttendanceCounters;
use crate::belts::{BeltRule, BeltSchema};
use crate::{ProgressionState, TatameError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// =============================================================================
// CALENDAR ARITHMETIC
// =============================================================================

/// Whole calendar months between two dates.
///
/// `(years * 12) + months`, minus one when the day of month in `now` has
/// not yet reached the day of month in `since`. Never negative.
///
/// This is calendar arithmetic, not a 30-day approximation:
/// Jan 31 → Mar 1 is one month.
#[must_use]
pub fn elapsed_months(since: NaiveDate, now: NaiveDate) -> u32 {
    let mut months = (i64::from(now.year()) - i64::from(since.year())) * 12
        + (i64::from(now.month()) - i64::from(since.month()));
    if now.day() < since.day() {
        months -= 1;
    }
    months.clamp(0, i64::from(u32::MAX)) as u32
}

// =============================================================================
// ELIGIBILITY RESULT
// =============================================================================

/// What a member is working towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Degree,
    Belt,
    /// Unconfigured belt, or already at the top of the ladder.
    None,
}

/// Eligibility verdict. Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub next_target_kind: TargetKind,
    /// `"<belt> <degree>"` for a degree target, the belt name for a belt
    /// target, empty when there is no target.
    pub next_target_label: String,
    pub months_elapsed: u32,
    pub months_required: u32,
    pub months_remaining: u32,
    pub is_eligible: bool,
}

impl EligibilityResult {
    fn no_target(months_elapsed: u32) -> Self {
        Self {
            next_target_kind: TargetKind::None,
            next_target_label: String::new(),
            months_elapsed,
            months_required: 0,
            months_remaining: 0,
            is_eligible: false,
        }
    }

    fn towards(kind: TargetKind, label: String, months_elapsed: u32, months_required: u32) -> Self {
        Self {
            next_target_kind: kind,
            next_target_label: label,
            months_elapsed,
            months_required,
            months_remaining: months_required.saturating_sub(months_elapsed),
            is_eligible: months_elapsed >= months_required,
        }
    }

    #[must_use]
    pub fn has_target(&self) -> bool {
        self.next_target_kind != TargetKind::None
    }
}

// =============================================================================
// PROMOTION
// =============================================================================

/// A graduation the engine has approved: the state before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub kind: TargetKind,
    pub from: ProgressionState,
    pub to: ProgressionState,
}

impl Promotion {
    /// Counters after this promotion is confirmed.
    #[must_use]
    pub fn reset_counters(&self, counters: AttendanceCounters) -> AttendanceCounters {
        match self.kind {
            TargetKind::Belt => counters.after_belt_promotion(),
            TargetKind::Degree | TargetKind::None => counters.after_degree_promotion(),
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

enum Target<'s> {
    Degree {
        belt: &'s BeltRule,
        number: u32,
        required: u32,
    },
    Belt {
        belt: &'s BeltRule,
    },
}

/// Pure eligibility evaluator over one academy's schema.
#[derive(Debug, Clone, Copy)]
pub struct ProgressionEngine<'s> {
    schema: &'s BeltSchema,
}

impl<'s> ProgressionEngine<'s> {
    #[must_use]
    pub fn new(schema: &'s BeltSchema) -> Self {
        Self { schema }
    }

    /// The next rank for `state`, following the decision table above.
    fn next_target(&self, state: &ProgressionState) -> Option<Target<'s>> {
        let current = self.schema.find(&state.belt)?;
        let next_degree = state.degree.saturating_add(1);

        if let Some(rule) = current.degree(next_degree) {
            return Some(Target::Degree {
                belt: current,
                number: next_degree,
                required: rule.min_months,
            });
        }

        self.schema
            .next_after(current)
            .map(|belt| Target::Belt { belt })
    }

    /// Eligibility of `state` as of `now`.
    #[must_use]
    pub fn eligibility(&self, state: &ProgressionState, now: NaiveDate) -> EligibilityResult {
        let elapsed = elapsed_months(state.last_graduation, now);

        match self.next_target(state) {
            Some(Target::Degree {
                belt,
                number,
                required,
            }) => EligibilityResult::towards(
                TargetKind::Degree,
                format!("{} {}", belt.name, number),
                elapsed,
                required,
            ),
            Some(Target::Belt { belt }) => EligibilityResult::towards(
                TargetKind::Belt,
                belt.name.clone(),
                elapsed,
                belt.required_months(),
            ),
            None => EligibilityResult::no_target(elapsed),
        }
    }

    /// Compute the promotion a professor would confirm on `today`.
    ///
    /// Fails with `NoPromotionTarget` when there is nothing to move to and
    /// with `NotEligible` when the required time has not yet elapsed.
    pub fn promote(
        &self,
        state: &ProgressionState,
        today: NaiveDate,
    ) -> Result<Promotion, TatameError> {
        let verdict = self.eligibility(state, today);
        if !verdict.has_target() {
            return Err(TatameError::NoPromotionTarget);
        }
        if !verdict.is_eligible {
            return Err(TatameError::NotEligible {
                months_remaining: verdict.months_remaining,
            });
        }

        let to = match self.next_target(state) {
            Some(Target::Degree { belt, number, .. }) => {
                ProgressionState::new(belt.name.clone(), number, today)
            }
            Some(Target::Belt { belt }) => ProgressionState::new(belt.name.clone(), 0, today),
            None => return Err(TatameError::NoPromotionTarget),
        };

        Ok(Promotion {
            kind: verdict.next_target_kind,
            from: state.clone(),
            to,
        })
    }
}

/// Free-function form of [`ProgressionEngine::eligibility`].
#[must_use]
pub fn compute_eligibility(
    state: &ProgressionState,
    schema: &BeltSchema,
    now: NaiveDate,
) -> EligibilityResult {
    ProgressionEngine::new(schema).eligibility(state, now)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belts::DegreeRule;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn belt(name: &str, order: u32, min_years: u32, degree_months: &[u32]) -> BeltRule {
        BeltRule {
            name: name.to_string(),
            order,
            min_years,
            min_months: 0,
            max_degrees: 4,
            degrees: (1u32..)
                .zip(degree_months)
                .map(|(degree_number, &min_months)| DegreeRule {
                    degree_number,
                    min_months,
                })
                .collect(),
        }
    }

    fn two_belt_schema() -> BeltSchema {
        BeltSchema::new(vec![
            belt("Branca", 1, 0, &[2, 2, 2, 2]),
            belt("Azul", 2, 1, &[4, 4, 4, 4]),
        ])
        .expect("valid schema")
    }

    #[test]
    fn months_simple() {
        assert_eq!(elapsed_months(date(2024, 1, 15), date(2024, 3, 15)), 2);
        assert_eq!(elapsed_months(date(2024, 1, 15), date(2024, 3, 14)), 1);
    }

    #[test]
    fn months_end_of_month_rollback() {
        assert_eq!(elapsed_months(date(2024, 1, 31), date(2024, 3, 1)), 1);
        assert_eq!(elapsed_months(date(2024, 1, 31), date(2024, 2, 29)), 0);
    }

    #[test]
    fn months_across_year_boundary() {
        assert_eq!(elapsed_months(date(2023, 11, 10), date(2024, 2, 10)), 3);
        assert_eq!(elapsed_months(date(2023, 12, 31), date(2024, 1, 30)), 0);
        assert_eq!(elapsed_months(date(2020, 6, 1), date(2024, 6, 1)), 48);
    }

    #[test]
    fn months_clamped_when_now_precedes_since() {
        assert_eq!(elapsed_months(date(2024, 5, 1), date(2024, 1, 1)), 0);
        assert_eq!(elapsed_months(date(2024, 5, 20), date(2024, 5, 19)), 0);
    }

    #[test]
    fn unconfigured_belt_has_no_target() {
        let schema = two_belt_schema();
        let state = ProgressionState::new("Coral", 0, date(2020, 1, 1));
        let result = compute_eligibility(&state, &schema, date(2024, 1, 1));
        assert_eq!(result.next_target_kind, TargetKind::None);
        assert!(!result.is_eligible);
        assert!(result.next_target_label.is_empty());
        assert_eq!(result.months_elapsed, 48);
        assert_eq!(result.months_required, 0);
        assert_eq!(result.months_remaining, 0);
    }

    #[test]
    fn next_degree_targeted_first() {
        let schema = two_belt_schema();
        let state = ProgressionState::new("Branca", 0, date(2024, 1, 15));
        let result = compute_eligibility(&state, &schema, date(2024, 3, 15));
        assert_eq!(result.next_target_kind, TargetKind::Degree);
        assert_eq!(result.next_target_label, "Branca 1");
        assert_eq!(result.months_elapsed, 2);
        assert_eq!(result.months_required, 2);
        assert_eq!(result.months_remaining, 0);
        assert!(result.is_eligible);
    }

    #[test]
    fn degree_beats_belt_even_when_belt_time_is_met() {
        let schema = two_belt_schema();
        let state = ProgressionState::new("Branca", 2, date(2020, 1, 1));
        let result = compute_eligibility(&state, &schema, date(2024, 1, 1));
        assert_eq!(result.next_target_kind, TargetKind::Degree);
        assert_eq!(result.next_target_label, "Branca 3");
    }

    #[test]
    fn last_degree_moves_to_next_belt() {
        let schema = two_belt_schema();
        let state = ProgressionState::new("Branca", 4, date(2024, 1, 10));
        let result = compute_eligibility(&state, &schema, date(2024, 9, 10));
        assert_eq!(result.next_target_kind, TargetKind::Belt);
        assert_eq!(result.next_target_label, "Azul");
        assert_eq!(result.months_required, 12);
        assert_eq!(result.months_elapsed, 8);
        assert_eq!(result.months_remaining, 4);
        assert!(!result.is_eligible);
    }

    #[test]
    fn top_belt_last_degree_has_no_target() {
        let schema = two_belt_schema();
        let state = ProgressionState::new("Azul", 4, date(2020, 1, 1));
        let result = compute_eligibility(&state, &schema, date(2024, 1, 1));
        assert_eq!(result.next_target_kind, TargetKind::None);
        assert_eq!(result.months_elapsed, 48);
    }

    #[test]
    fn belt_without_degrees_goes_straight_to_next_belt() {
        let schema = BeltSchema::new(vec![belt("Cinza", 1, 0, &[]), belt("Amarela", 2, 0, &[])])
            .expect("valid");
        let state = ProgressionState::new("Cinza", 0, date(2024, 1, 1));
        let result = compute_eligibility(&state, &schema, date(2024, 1, 1));
        assert_eq!(result.next_target_kind, TargetKind::Belt);
        assert!(result.is_eligible);
    }

    #[test]
    fn promote_degree() {
        let schema = two_belt_schema();
        let engine = ProgressionEngine::new(&schema);
        let state = ProgressionState::new("Branca", 1, date(2024, 1, 1));
        let promotion = engine.promote(&state, date(2024, 3, 5)).expect("eligible");
        assert_eq!(promotion.kind, TargetKind::Degree);
        assert_eq!(promotion.to, ProgressionState::new("Branca", 2, date(2024, 3, 5)));
        assert_eq!(promotion.from, state);
    }

    #[test]
    fn promote_belt_resets_degree() {
        let schema = two_belt_schema();
        let engine = ProgressionEngine::new(&schema);
        let state = ProgressionState::new("Branca", 4, date(2023, 1, 1));
        let promotion = engine.promote(&state, date(2024, 1, 1)).expect("eligible");
        assert_eq!(promotion.kind, TargetKind::Belt);
        assert_eq!(promotion.to, ProgressionState::new("Azul", 0, date(2024, 1, 1)));
    }

    #[test]
    fn promote_rejects_early_and_top() {
        let schema = two_belt_schema();
        let engine = ProgressionEngine::new(&schema);

        let early = ProgressionState::new("Branca", 4, date(2024, 1, 10));
        assert!(matches!(
            engine.promote(&early, date(2024, 9, 10)),
            Err(TatameError::NotEligible {
                months_remaining: 4
            })
        ));

        let top = ProgressionState::new("Azul", 4, date(2020, 1, 1));
        assert!(matches!(
            engine.promote(&top, date(2024, 1, 1)),
            Err(TatameError::NoPromotionTarget)
        ));
    }

    #[test]
    fn promotion_counter_reset_depends_on_kind() {
        let counters = AttendanceCounters {
            days_since_last_degree: 30,
            days_since_last_belt_change: 90,
        };
        let from = ProgressionState::new("Branca", 4, date(2023, 1, 1));
        let to = ProgressionState::new("Azul", 0, date(2024, 1, 1));
        let belt = Promotion {
            kind: TargetKind::Belt,
            from: from.clone(),
            to: to.clone(),
        };
        assert_eq!(belt.reset_counters(counters), AttendanceCounters::new());

        let degree = Promotion {
            kind: TargetKind::Degree,
            from,
            to,
        };
        let reset = degree.reset_counters(counters);
        assert_eq!(reset.days_since_last_degree, 0);
        assert_eq!(reset.days_since_last_belt_change, 90);
    }
}
