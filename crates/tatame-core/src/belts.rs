//! # Belt Schema
//!
//! The per-academy belt/degree table, modelled as data rather than an enum
//! because academies edit it.
//!
//! A `BeltSchema` can only be obtained through validation, so the
//! progression engine never sees:
//! - duplicate belt names or duplicate `order` values
//! - degree numbering with gaps, duplicates, or a start other than 1
//! - more configured degrees than `max_degrees`
//!
//! Belts are kept sorted by `order`.

use crate::TatameError;
use crate::primitives::{MAX_BELTS, MAX_DEGREES_PER_BELT, MAX_NAME_LENGTH, MAX_REQUIRED_MONTHS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// RULES
// =============================================================================

/// Minimum time at the previous rank before a degree is awarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeRule {
    pub degree_number: u32,
    pub min_months: u32,
}

/// One belt of the ladder.
///
/// `min_years`/`min_months` are the time a student must spend since the
/// last graduation (usually the last degree of the previous belt) before
/// receiving THIS belt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeltRule {
    pub name: String,
    pub order: u32,
    #[serde(default)]
    pub min_years: u32,
    #[serde(default)]
    pub min_months: u32,
    pub max_degrees: u32,
    #[serde(default)]
    pub degrees: Vec<DegreeRule>,
}

impl BeltRule {
    /// Months required to be promoted into this belt.
    #[must_use]
    pub fn required_months(&self) -> u32 {
        self.min_years
            .saturating_mul(12)
            .saturating_add(self.min_months)
    }

    /// The configured rule for a degree number, if any.
    #[must_use]
    pub fn degree(&self, number: u32) -> Option<&DegreeRule> {
        self.degrees.iter().find(|d| d.degree_number == number)
    }

    fn validate(&mut self) -> Result<(), TatameError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TatameError::InvalidSchema(
                "belt name must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(TatameError::InvalidSchema(format!(
                "belt name length {} exceeds maximum {} bytes",
                name.len(),
                MAX_NAME_LENGTH
            )));
        }
        self.name = name.to_string();

        if self.max_degrees == 0 || self.max_degrees > MAX_DEGREES_PER_BELT {
            return Err(TatameError::InvalidSchema(format!(
                "belt '{}': max_degrees must be between 1 and {}",
                self.name, MAX_DEGREES_PER_BELT
            )));
        }
        if self.required_months() > MAX_REQUIRED_MONTHS {
            return Err(TatameError::InvalidSchema(format!(
                "belt '{}': requires {} months (maximum {})",
                self.name,
                self.required_months(),
                MAX_REQUIRED_MONTHS
            )));
        }

        self.degrees.sort_by_key(|d| d.degree_number);
        if self.degrees.len() > self.max_degrees as usize {
            return Err(TatameError::InvalidSchema(format!(
                "belt '{}': {} degrees configured but max_degrees is {}",
                self.name,
                self.degrees.len(),
                self.max_degrees
            )));
        }
        for (expected, degree) in (1u32..).zip(&self.degrees) {
            if degree.degree_number != expected {
                return Err(TatameError::InvalidSchema(format!(
                    "belt '{}': degree numbers must be contiguous from 1 (expected {}, found {})",
                    self.name, expected, degree.degree_number
                )));
            }
            if degree.min_months > MAX_REQUIRED_MONTHS {
                return Err(TatameError::InvalidSchema(format!(
                    "belt '{}': degree {} requires {} months (maximum {})",
                    self.name, degree.degree_number, degree.min_months, MAX_REQUIRED_MONTHS
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// A validated, order-sorted belt ladder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<BeltRule>", into = "Vec<BeltRule>")]
pub struct BeltSchema {
    belts: Vec<BeltRule>,
}

impl BeltSchema {
    /// Validate and sort a list of belts.
    pub fn new(mut belts: Vec<BeltRule>) -> Result<Self, TatameError> {
        if belts.len() > MAX_BELTS {
            return Err(TatameError::InvalidSchema(format!(
                "{} belts exceeds maximum {}",
                belts.len(),
                MAX_BELTS
            )));
        }

        let mut names = BTreeSet::new();
        let mut orders = BTreeSet::new();
        for belt in &mut belts {
            belt.validate()?;
            if !names.insert(belt.name.clone()) {
                return Err(TatameError::InvalidSchema(format!(
                    "duplicate belt name '{}'",
                    belt.name
                )));
            }
            if !orders.insert(belt.order) {
                return Err(TatameError::InvalidSchema(format!(
                    "duplicate belt order {}",
                    belt.order
                )));
            }
        }

        belts.sort_by_key(|b| b.order);
        Ok(Self { belts })
    }

    /// A schema with no belts: every member is unconfigured.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn belts(&self) -> &[BeltRule] {
        &self.belts
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.belts.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.belts.len()
    }

    /// Look up a belt by exact name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&BeltRule> {
        self.belts.iter().find(|b| b.name == name)
    }

    /// The belt with the smallest `order` greater than `belt.order`.
    #[must_use]
    pub fn next_after(&self, belt: &BeltRule) -> Option<&BeltRule> {
        self.belts.iter().find(|b| b.order > belt.order)
    }

    /// The adult ladder most academies start from.
    ///
    /// Durations are a reasonable starting point, not federation law;
    /// academies replace this table with their own.
    #[must_use]
    pub fn ibjjf_adult() -> Self {
        fn degrees(months: &[u32]) -> Vec<DegreeRule> {
            (1u32..)
                .zip(months)
                .map(|(degree_number, &min_months)| DegreeRule {
                    degree_number,
                    min_months,
                })
                .collect()
        }
        fn belt(name: &str, order: u32, min_years: u32, months: &[u32]) -> BeltRule {
            BeltRule {
                name: name.to_string(),
                order,
                min_years,
                min_months: 0,
                max_degrees: months.len() as u32,
                degrees: degrees(months),
            }
        }

        Self {
            belts: vec![
                belt("Branca", 1, 0, &[2, 2, 2, 2]),
                belt("Azul", 2, 1, &[4, 4, 4, 4]),
                belt("Roxa", 3, 1, &[4, 4, 4, 4]),
                belt("Marrom", 4, 1, &[3, 3, 3, 3]),
                belt("Preta", 5, 1, &[36, 36, 36, 60, 60, 60]),
            ],
        }
    }
}

impl TryFrom<Vec<BeltRule>> for BeltSchema {
    type Error = TatameError;

    fn try_from(belts: Vec<BeltRule>) -> Result<Self, Self::Error> {
        Self::new(belts)
    }
}

impl From<BeltSchema> for Vec<BeltRule> {
    fn from(schema: BeltSchema) -> Self {
        schema.belts
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, order: u32, degree_numbers: &[u32]) -> BeltRule {
        BeltRule {
            name: name.to_string(),
            order,
            min_years: 0,
            min_months: 6,
            max_degrees: 4,
            degrees: degree_numbers
                .iter()
                .map(|&n| DegreeRule {
                    degree_number: n,
                    min_months: 2,
                })
                .collect(),
        }
    }

    #[test]
    fn sorts_by_order() {
        let schema =
            BeltSchema::new(vec![rule("Azul", 20, &[1]), rule("Branca", 10, &[1, 2])])
                .expect("valid");
        let names: Vec<_> = schema.belts().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Branca", "Azul"]);
    }

    #[test]
    fn accepts_degrees_listed_out_of_order() {
        let schema = BeltSchema::new(vec![rule("Branca", 1, &[3, 1, 2])]).expect("valid");
        let numbers: Vec<_> = schema.belts()[0]
            .degrees
            .iter()
            .map(|d| d.degree_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_degree_gap() {
        let result = BeltSchema::new(vec![rule("Branca", 1, &[1, 3])]);
        assert!(matches!(result, Err(TatameError::InvalidSchema(_))));
    }

    #[test]
    fn rejects_degrees_not_starting_at_one() {
        assert!(BeltSchema::new(vec![rule("Branca", 1, &[2, 3])]).is_err());
    }

    #[test]
    fn rejects_duplicate_degree() {
        assert!(BeltSchema::new(vec![rule("Branca", 1, &[1, 1])]).is_err());
    }

    #[test]
    fn rejects_more_degrees_than_max() {
        assert!(BeltSchema::new(vec![rule("Branca", 1, &[1, 2, 3, 4, 5])]).is_err());
    }

    #[test]
    fn rejects_duplicate_order() {
        let result = BeltSchema::new(vec![rule("Branca", 1, &[]), rule("Azul", 1, &[])]);
        assert!(matches!(result, Err(TatameError::InvalidSchema(_))));
    }

    #[test]
    fn rejects_duplicate_name_after_trim() {
        let result = BeltSchema::new(vec![rule("Azul", 1, &[]), rule(" Azul ", 2, &[])]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_max_degrees() {
        let mut belt = rule("Branca", 1, &[]);
        belt.max_degrees = 0;
        assert!(BeltSchema::new(vec![belt]).is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(BeltSchema::new(vec![rule("   ", 1, &[])]).is_err());
    }

    #[test]
    fn next_after_skips_order_gaps() {
        let schema = BeltSchema::new(vec![
            rule("Branca", 1, &[]),
            rule("Roxa", 30, &[]),
            rule("Azul", 7, &[]),
        ])
        .expect("valid");
        let branca = schema.find("Branca").expect("branca");
        assert_eq!(schema.next_after(branca).map(|b| b.name.as_str()), Some("Azul"));
        let roxa = schema.find("Roxa").expect("roxa");
        assert!(schema.next_after(roxa).is_none());
    }

    #[test]
    fn required_months_combines_years() {
        let mut belt = rule("Azul", 2, &[]);
        belt.min_years = 1;
        belt.min_months = 6;
        assert_eq!(belt.required_months(), 18);
    }

    #[test]
    fn default_ladder_is_valid() {
        let ladder = BeltSchema::ibjjf_adult();
        let revalidated = BeltSchema::new(ladder.belts().to_vec()).expect("valid");
        assert_eq!(revalidated, ladder);
        assert_eq!(ladder.len(), 5);
    }

    #[test]
    fn decoding_runs_validation() {
        let invalid = vec![rule("Branca", 1, &[2])];
        let bytes = postcard::to_allocvec(&invalid).expect("encode");
        assert!(postcard::from_bytes::<BeltSchema>(&bytes).is_err());

        let valid = BeltSchema::ibjjf_adult();
        let bytes = postcard::to_allocvec(&valid).expect("encode");
        let decoded: BeltSchema = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, valid);
    }
}
