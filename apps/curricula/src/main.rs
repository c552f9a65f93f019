//! # Curricula
//!
//! Command-line front end for stage-graph curricula.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │          apps/curricula (THE BINARY)          │
//! │                                               │
//! │  ┌─────────────┐  ┌────────┐  ┌────────────┐  │
//! │  │    CLI      │  │ config │  │  foraging  │  │
//! │  │  (clap)     │  │ (toml) │  │  (rules)   │  │
//! │  └──────┬──────┘  └───┬────┘  └─────┬──────┘  │
//! │         └─────────────┼─────────────┘         │
//! │                       ▼                       │
//! │               ┌────────────────┐              │
//! │               │ curricula-core │              │
//! │               │  (THE MODEL)   │              │
//! │               └────────────────┘              │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! curricula demo -o foraging.json
//! curricula validate -f foraging.json
//! curricula inspect -f foraging.json --verbose
//! curricula decide -f foraging.json -s stage1 -m metrics.json
//! curricula hash -f foraging.json
//! ```

use clap::Parser;
use curricula::cli;
use curricula::config::{Config, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // Config decides the default log format, so load it before tracing starts
    // and report a failure once the subscriber is up.
    let config = Config::load(cli.config.as_deref());
    let log_format = config
        .as_ref()
        .map(Config::log_format)
        .unwrap_or_default();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "curricula=info,curricula_core=info".into());

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!("curricula v{} - stage-graph curricula", env!("CARGO_PKG_VERSION"));
    println!();
}
