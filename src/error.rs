//! Typed error kinds for every fallible component (§7).

use thiserror::Error;

/// Errors raised while turning a directory into a `Skill`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("SKILL.md not found at {path}")]
    ManifestMissing { path: std::path::PathBuf },

    #[error("SKILL.md manifest is invalid: {message}")]
    ManifestInvalid { message: String },

    #[error("skill directory exceeds bounds: {reason}")]
    TooLarge { reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal error loading the bundled or overridden rule library.
#[derive(Debug, Error)]
#[error("failed to load rule {rule_id}: {message}")]
pub struct RuleLoadError {
    pub rule_id: String,
    pub message: String,
}

/// Non-fatal error from a single analyzer; contained by the pipeline and
/// converted into a `best_practices`/`low` finding.
#[derive(Debug, Error)]
#[error("analyzer {analyzer_name} failed: {cause}")]
pub struct AnalyzerError {
    pub analyzer_name: String,
    pub cause: String,
}

/// Error loading or parsing `clawguard.toml`.
#[derive(Debug, Error)]
#[error("failed to load config at {path}: {message}")]
pub struct ConfigError {
    pub path: std::path::PathBuf,
    pub message: String,
}

/// Top-level error for the library's single fallible scan entry point.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    RuleLoad(#[from] RuleLoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scan cancelled")]
    Cancelled,
}
