//! # Tatame CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `academies` / `add-academy` - List / register academies
//! - `belts` / `load-belts` - Show / replace an academy's belt ladder
//! - `members` / `add-member` - List / enrol members
//! - `check-in` - Record a check-in at a location
//! - `eligibility` - Next degree or belt for one member
//! - `pending` - Members eligible for graduation
//! - `graduate` - Confirm a member's next rank
//! - `distance` - Haversine distance between two points
//! - `export` / `import` - `TATM` snapshot files
//! - `compact` - Compact the redb database file

mod commands;

use crate::config::{AppConfig, Backend};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tatame_core::{Role, TatameError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tatame - BJJ academy server
///
/// Geofenced check-ins and belt/degree progression for Jiu-Jitsu academies.
#[derive(Parser, Debug)]
#[command(name = "tatame")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides the config file)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<AppConfig, TatameError> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(database) = &self.database {
            config.storage.database.clone_from(database);
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        Ok(config)
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// List academies
    Academies,

    /// Register an academy
    AddAcademy {
        #[arg(long)]
        name: String,

        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,

        /// Check-in radius in meters (default from config)
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Replace an academy's belt ladder
    LoadBelts {
        #[arg(short, long)]
        academy: u64,

        /// JSON or TOML file with a `belts` list (built-in adult ladder if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show an academy's belt ladder
    Belts {
        #[arg(short, long)]
        academy: u64,
    },

    /// Enrol a member
    AddMember {
        #[arg(short, long)]
        academy: u64,

        #[arg(long)]
        name: String,

        /// student, professor or admin
        #[arg(long, default_value = "student")]
        role: Role,

        /// Current belt (first belt of the ladder if omitted)
        #[arg(long)]
        belt: Option<String>,

        #[arg(long, default_value_t = 0)]
        degree: u32,

        /// Date of the last graduation, YYYY-MM-DD (today if omitted)
        #[arg(long)]
        last_graduation: Option<NaiveDate>,
    },

    /// List an academy's members
    Members {
        #[arg(short, long)]
        academy: u64,
    },

    /// Record today's check-in at a location
    CheckIn {
        #[arg(short, long)]
        academy: u64,

        #[arg(short, long)]
        member: u64,

        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,
    },

    /// Show a member's next degree or belt
    Eligibility {
        #[arg(short, long)]
        academy: u64,

        #[arg(short, long)]
        member: u64,

        /// Evaluation date, YYYY-MM-DD (today if omitted)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// List members eligible for graduation
    Pending {
        #[arg(short, long)]
        academy: u64,

        /// Evaluation date, YYYY-MM-DD (today if omitted)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Confirm a member's next degree or belt
    Graduate {
        #[arg(short, long)]
        academy: u64,

        #[arg(short, long)]
        member: u64,

        /// Member id of the approving professor or admin
        #[arg(long)]
        approver: u64,
    },

    /// Haversine distance between two points, in meters
    Distance {
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        from_lon: f64,

        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        to_lon: f64,
    },

    /// Export the ledger as a TATM snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a TATM snapshot into an empty database
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compact the redb database file
    Compact,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TatameError> {
    let config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&config, host, port).await,
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Academies) | None => cmd_academies(&config, json_mode),
        Some(Commands::AddAcademy {
            name,
            latitude,
            longitude,
            radius,
        }) => cmd_add_academy(&config, json_mode, &name, latitude, longitude, radius),
        Some(Commands::LoadBelts { academy, file }) => {
            cmd_load_belts(&config, json_mode, academy, file.as_deref())
        }
        Some(Commands::Belts { academy }) => cmd_belts(&config, json_mode, academy),
        Some(Commands::AddMember {
            academy,
            name,
            role,
            belt,
            degree,
            last_graduation,
        }) => cmd_add_member(
            &config,
            json_mode,
            academy,
            tatame_core::NewMember {
                name,
                role,
                belt,
                degree,
                last_graduation,
            },
        ),
        Some(Commands::Members { academy }) => cmd_members(&config, json_mode, academy),
        Some(Commands::CheckIn {
            academy,
            member,
            latitude,
            longitude,
        }) => cmd_check_in(&config, json_mode, academy, member, latitude, longitude),
        Some(Commands::Eligibility {
            academy,
            member,
            as_of,
        }) => cmd_eligibility(&config, json_mode, academy, member, as_of),
        Some(Commands::Pending { academy, as_of }) => {
            cmd_pending(&config, json_mode, academy, as_of)
        }
        Some(Commands::Graduate {
            academy,
            member,
            approver,
        }) => cmd_graduate(&config, json_mode, academy, member, approver),
        Some(Commands::Distance {
            from_lat,
            from_lon,
            to_lat,
            to_lon,
        }) => cmd_distance(json_mode, (from_lat, from_lon), (to_lat, to_lon)),
        Some(Commands::Export { output }) => cmd_export(&config, &output),
        Some(Commands::Import { input }) => cmd_import(&config, &input),
        Some(Commands::Compact) => cmd_compact(&config),
    }
}
