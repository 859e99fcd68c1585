//! # Attendance Counters
//!
//! Per-member training counters. They start at zero on enrolment, grow
//! by one on every accepted check-in and are zeroed by graduations.

use serde::{Deserialize, Serialize};

/// Training days counted since the last promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceCounters {
    /// Check-ins since the last degree (or belt) promotion.
    pub days_since_last_degree: u32,
    /// Check-ins since the last belt change.
    pub days_since_last_belt_change: u32,
}

impl AttendanceCounters {
    /// Zeroed counters for a new member.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            days_since_last_degree: 0,
            days_since_last_belt_change: 0,
        }
    }

    /// Count one accepted check-in. Saturating.
    #[must_use]
    pub const fn record_check_in(self) -> Self {
        Self {
            days_since_last_degree: self.days_since_last_degree.saturating_add(1),
            days_since_last_belt_change: self.days_since_last_belt_change.saturating_add(1),
        }
    }

    /// Counters after a degree promotion within the same belt.
    #[must_use]
    pub const fn after_degree_promotion(self) -> Self {
        Self {
            days_since_last_degree: 0,
            days_since_last_belt_change: self.days_since_last_belt_change,
        }
    }

    /// Counters after a belt change. Both counters restart.
    #[must_use]
    pub const fn after_belt_promotion(self) -> Self {
        Self::new()
    }
}
