//! Command-line interface definition.
//!
//! Uses [clap] derive macros to parse arguments. This module is only used by
//! the binary crate (`src/main.rs`) — it is a thin demonstration wrapper
//! around the library's single `scan` entry point, not a product surface
//! in its own right (§1).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Security analysis for AI-agent skill packages.
#[derive(Parser)]
#[command(name = "clawguard", version, about = "Security analysis for AI-agent skill packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a skill directory and report its findings and score.
    Scan {
        /// Path to the skill directory (must contain a SKILL.md).
        path: PathBuf,

        /// Skip the semantic (LLM-backed) analyzer.
        #[arg(long)]
        no_llm: bool,

        /// Emit the report as JSON instead of a human-readable summary.
        #[arg(long)]
        json: bool,

        /// Write the report to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Suppress the human-readable summary; only exit code and --output matter.
        #[arg(long)]
        quiet: bool,

        /// Path to a custom configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
