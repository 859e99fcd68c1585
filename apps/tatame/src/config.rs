//! # Configuration
//!
//! Optional TOML file, every field defaulted:
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [storage]
//! database = "tatame.db"
//! backend = "redb"        # or "file"
//!
//! [checkin]
//! default_radius_meters = 100.0
//! utc_offset_minutes = -180
//! ```
//!
//! CLI flags override file values. Security settings (`TATAME_API_KEY`,
//! `TATAME_RATE_LIMIT`, `TATAME_CORS_ORIGINS`) stay in the environment.

use chrono::{NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tatame_core::TatameError;
use tatame_core::primitives::DEFAULT_FENCE_RADIUS_METERS;

/// Largest accepted distance from UTC (14 hours).
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Where the ledger lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database (ACID, written on every change)
    #[default]
    Redb,
    /// `TATM` snapshot file (loaded at start, written after changes)
    File,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redb => write!(f, "redb"),
            Self::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database: PathBuf,
    pub backend: Backend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("tatame.db"),
            backend: Backend::Redb,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckInConfig {
    /// Fence radius for academies created without one.
    pub default_radius_meters: f64,
    /// Academy-local time zone, as minutes east of UTC.
    pub utc_offset_minutes: i32,
}

impl Default for CheckInConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: DEFAULT_FENCE_RADIUS_METERS,
            utc_offset_minutes: 0,
        }
    }
}

impl CheckInConfig {
    #[must_use]
    pub fn clock(&self) -> Clock {
        Clock::System {
            utc_offset_minutes: self.utc_offset_minutes,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub checkin: CheckInConfig,
}

impl AppConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, TatameError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            TatameError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(TatameError::InvalidInput(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            TatameError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, TatameError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| TatameError::InvalidInput(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TatameError> {
        let radius = self.checkin.default_radius_meters;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(TatameError::InvalidInput(format!(
                "checkin.default_radius_meters must be positive, got {}",
                radius
            )));
        }
        if self.checkin.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(TatameError::InvalidInput(format!(
                "checkin.utc_offset_minutes must be within ±{}",
                MAX_UTC_OFFSET_MINUTES
            )));
        }
        Ok(())
    }
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of "today" for check-ins and eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock shifted to the academy's local time.
    System { utc_offset_minutes: i32 },
    /// Frozen date, for tests and replays.
    Fixed(NaiveDate),
}

impl Default for Clock {
    fn default() -> Self {
        Self::System {
            utc_offset_minutes: 0,
        }
    }
}

impl Clock {
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::Fixed(date) => *date,
            Self::System { utc_offset_minutes } => {
                let now = Utc::now();
                TimeDelta::try_minutes(i64::from(*utc_offset_minutes))
                    .and_then(|offset| now.checked_add_signed(offset))
                    .unwrap_or(now)
                    .date_naive()
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, Backend::Redb);
        assert_eq!(config.checkin.default_radius_meters, 100.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [storage]
            backend = "file"

            [checkin]
            utc_offset_minutes = -180
            "#,
        )
        .expect("parse");
        assert_eq!(config.storage.backend, Backend::File);
        assert_eq!(config.storage.database, PathBuf::from("tatame.db"));
        assert_eq!(config.checkin.utc_offset_minutes, -180);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(AppConfig::from_toml_str("[server]\nhots = \"0.0.0.0\"").is_err());
    }

    #[test]
    fn rejects_non_positive_radius() {
        let result = AppConfig::from_toml_str("[checkin]\ndefault_radius_meters = 0.0");
        assert!(matches!(result, Err(TatameError::InvalidInput(_))));
    }

    #[test]
    fn rejects_offset_beyond_fourteen_hours() {
        assert!(AppConfig::from_toml_str("[checkin]\nutc_offset_minutes = 900").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tatame.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").expect("write");
        let config = AppConfig::load(&path).expect("load");
        assert_eq!(config.server.port, 9000);

        assert!(AppConfig::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn fixed_clock_is_frozen() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).expect("date");
        assert_eq!(Clock::Fixed(day).today(), day);
    }

    #[test]
    fn system_clock_offset_moves_at_most_one_day() {
        let utc = Clock::default().today();
        let ahead = Clock::System {
            utc_offset_minutes: MAX_UTC_OFFSET_MINUTES,
        }
        .today();
        assert!((ahead - utc).num_days().abs() <= 1);
    }
}
