//! # clawguard
//!
//! Security analysis engine for AI-agent skill packages.
//!
//! `clawguard` parses a skill directory once into an immutable [`Skill`]
//! value, then runs a fixed set of independent analyzers over it —
//! Static (regex), Pattern (YARA-style), AST (tree-sitter), and Semantic
//! (a single bounded LLM call) — merges their findings, and produces a
//! deterministic [`Report`] with a severity-weighted score.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use clawguard::{config::Config, scan};
//!
//! let config = Config::load(None).expect("failed to load config");
//! let report = scan(Path::new("./my-skill"), &config).expect("scan failed");
//! println!("{}", report.score.recommendation);
//! ```
//!
//! ## Architecture
//!
//! 1. **[`parser`]** — the only component that touches the filesystem;
//!    turns a directory into a normalized [`Skill`].
//! 2. **[`rules`]** — the immutable, two-dialect rule library.
//! 3. **[`analyzers`]** — the pluggable `Analyzer` trait and its four
//!    implementations.
//! 4. **[`pipeline`]** — runs the enabled analyzers in parallel, dedupes
//!    and sorts their findings.
//! 5. **[`scorer`]** — turns findings into a [`types::Score`].
//! 6. **[`config`]** — per-analyzer toggles and suppressions.

pub mod analyzers;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod rules;
pub mod scorer;
pub mod skill;
pub mod types;

pub use config::Config;
pub use error::ScanError;
pub use skill::Skill;
pub use types::Report;

use cancellation::CancellationToken;
use std::path::Path;

/// Parses and analyzes the skill directory at `path`, returning a scored
/// [`Report`]. This is the crate's single fallible entry point (§7).
pub fn scan(path: &Path, config: &Config) -> Result<Report, ScanError> {
    scan_cancellable(path, config, &CancellationToken::new())
}

/// As [`scan`], but cooperatively stops between files/analyzers when
/// `cancel` is set, returning [`ScanError::Cancelled`] (§5).
pub fn scan_cancellable(
    path: &Path,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<Report, ScanError> {
    let (skill, parse_findings) = parser::parse(path)?;
    pipeline::run(&skill, parse_findings, config, cancel)
}
