//! # Curricula CLI Module
//!
//! This module implements the CLI interface for curricula.
//!
//! ## Available Commands
//!
//! - `demo` - Write the bundled dynamic-foraging curriculum
//! - `validate` - Parse, resolve and link a document
//! - `inspect` - Show stages and ordered transitions
//! - `decide` - Evaluate a stage's transitions against a metrics file
//! - `hash` - Compute the document checksum and BLAKE3 digest
//! - `rules` - List registered rule symbols

mod commands;

use crate::config::Config;
use crate::foraging;
use clap::{Parser, Subcommand};
use curricula_core::{CurriculumError, RuleRegistry};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Curricula - stage-graph curricula for behavioral experiments
///
/// Author, validate, inspect and evaluate curriculum documents.
#[derive(Parser, Debug)]
#[command(name = "curricula")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a curricula.toml configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the bundled dynamic-foraging curriculum
    Demo {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Parse, resolve and link a curriculum document
    Validate {
        /// Curriculum document
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show stages and ordered transitions
    Inspect {
        /// Curriculum document
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Evaluate a stage's transitions against a metrics snapshot
    Decide {
        /// Curriculum document
        #[arg(short, long)]
        file: PathBuf,

        /// Current stage name
        #[arg(short, long)]
        stage: String,

        /// Metrics record (JSON)
        #[arg(short, long)]
        metrics: PathBuf,
    },

    /// Compute checksum and BLAKE3 digest of a curriculum document
    Hash {
        /// Curriculum document
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List registered rule symbols
    Rules,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &Config) -> Result<(), CurriculumError> {
    foraging::register_rules(RuleRegistry::global())?;

    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Demo { output }) => cmd_demo(&output, config, json_mode),
        Some(Commands::Validate { file }) => cmd_validate(&file, config, json_mode),
        Some(Commands::Inspect { file }) => cmd_inspect(&file, config, json_mode, cli.verbose),
        Some(Commands::Decide {
            file,
            stage,
            metrics,
        }) => cmd_decide(&file, &stage, &metrics, config, json_mode),
        Some(Commands::Hash { file }) => cmd_hash(&file, config, json_mode),
        Some(Commands::Rules) | None => cmd_rules(json_mode),
    }
}
