//! # Primitives
//!
//! Hardcoded runtime constants for the Tatame engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Anything an academy may tune (belt durations, fence radius) lives in
//! data, not here.

/// Mean Earth radius used by the Haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Check-in radius applied when an academy is created without one.
pub const DEFAULT_FENCE_RADIUS_METERS: f64 = 100.0;

/// Magic bytes for the Tatame snapshot header.
///
/// - File Header = Magic Bytes ("TATM") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"TATM";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for academy, member and belt names (bytes).
pub const MAX_NAME_LENGTH: usize = 128;

/// Maximum number of belts in one academy schema.
pub const MAX_BELTS: usize = 32;

/// Maximum number of degrees a single belt may define.
pub const MAX_DEGREES_PER_BELT: u32 = 10;

/// Maximum months any degree or belt may require (100 years).
pub const MAX_REQUIRED_MONTHS: u32 = 1200;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"TATM");
    }

    #[test]
    fn default_radius_is_positive() {
        assert!(DEFAULT_FENCE_RADIUS_METERS > 0.0);
    }
}
