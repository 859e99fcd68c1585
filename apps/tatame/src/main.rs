//! # Tatame - BJJ Academy Server
//!
//! Geofenced check-ins and belt/degree progression for Jiu-Jitsu academies.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │             apps/tatame (THE BINARY)          │
//! │                                               │
//! │   ┌─────────────┐        ┌─────────────┐      │
//! │   │    CLI      │        │  HTTP API   │      │
//! │   │   (clap)    │        │   (axum)    │      │
//! │   └──────┬──────┘        └──────┬──────┘      │
//! │          └───────────┬──────────┘             │
//! │                      ▼                        │
//! │              ┌───────────────┐                │
//! │              │  tatame-core  │                │
//! │              │  (THE LOGIC)  │                │
//! │              └───────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! tatame server --host 0.0.0.0 --port 8080
//!
//! tatame add-academy --name "Gracie Barra" --latitude -23.55 --longitude -46.63
//! tatame load-belts --academy 1
//! tatame add-member --academy 1 --name "Helio" --role professor --belt Preta
//! tatame check-in --academy 1 --member 2 --latitude -23.55 --longitude -46.63
//! tatame pending --academy 1
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = tatame::cli::Cli::parse();

    // TATAME_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TATAME_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "tatame=debug,tatame_core=debug,tower_http=debug"
    } else {
        "tatame=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // The banner would break --json-mode output
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = tatame::cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Tatame startup banner.
fn print_banner() {
    println!(
        r#"
  ████████╗ █████╗ ████████╗ █████╗ ███╗   ███╗███████╗
  ╚══██╔══╝██╔══██╗╚══██╔══╝██╔══██╗████╗ ████║██╔════╝
     ██║   ███████║   ██║   ███████║██╔████╔██║█████╗
     ██║   ██╔══██║   ██║   ██╔══██║██║╚██╔╝██║██╔══╝
     ██║   ██║  ██║   ██║   ██║  ██║██║ ╚═╝ ██║███████╗
     ╚═╝   ╚═╝  ╚═╝   ╚═╝   ╚═╝  ╚═╝╚═╝     ╚═╝╚══════╝

  Academy Server v{}

  Check-ins • Belts • Graduations
"#,
        env!("CARGO_PKG_VERSION")
    );
}
