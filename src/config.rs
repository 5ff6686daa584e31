//! Scan configuration (§6 "Configuration file"): per-analyzer enable
//! flags and suppressions, generalizing the reference implementation's
//! `.oxidized-skills-ignore` into a single `clawguard.toml`.

use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerToggles {
    pub static_analyzer: bool,
    pub pattern: bool,
    pub ast: bool,
    pub semantic: bool,
}

impl Default for AnalyzerToggles {
    fn default() -> Self {
        Self {
            static_analyzer: true,
            pattern: true,
            ast: true,
            semantic: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Suppression {
    pub path: String,
    #[serde(default)]
    pub line_start: Option<usize>,
    #[serde(default)]
    pub line_end: Option<usize>,
    pub reason: String,
}

impl Suppression {
    fn line_range(&self) -> Option<RangeInclusive<usize>> {
        match (self.line_start, self.line_end) {
            (Some(start), Some(end)) => Some(start..=end),
            (Some(start), None) => Some(start..=start),
            _ => None,
        }
    }

    pub fn covers(&self, file: Option<&str>, line: Option<usize>) -> bool {
        let Some(file) = file else {
            return false;
        };
        if file != self.path {
            return false;
        }
        match (self.line_range(), line) {
            (Some(range), Some(line)) => range.contains(&line),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub analyzers: AnalyzerToggles,
    pub suppressions: Vec<Suppression>,
    pub semantic_timeout_ms: Option<u64>,
    pub workers: Option<usize>,
}

impl Config {
    /// Resolves configuration with explicit-path > `./clawguard.toml` >
    /// defaults precedence (§6).
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, crate::error::ConfigError> {
        let candidate = match explicit_path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = Path::new("clawguard.toml");
                default.is_file().then(|| default.to_path_buf())
            }
        };

        let Some(path) = candidate else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(&path).map_err(|e| crate::error::ConfigError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| crate::error::ConfigError {
            path,
            message: e.to_string(),
        })
    }
}
