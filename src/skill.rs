//! The normalized in-memory representation of a skill package (§3).
//!
//! A `Skill` is produced once by the [`crate::parser`] and is never mutated
//! or read from disk again; every analyzer operates on borrowed slices of
//! it.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Source language of a [`Script`], inferred from extension and shebang.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    Bash,
    JavaScript,
    TypeScript,
    Unknown,
}

/// A referenced script file with its raw text, kept verbatim for the
/// Static/Pattern/AST analyzers to walk independently.
#[derive(Debug, Clone)]
pub struct Script {
    pub path: String,
    pub language: Language,
    pub text: String,
    pub size_bytes: u64,
}

/// Any non-script file under the skill root.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: String,
    pub size_bytes: u64,
    pub is_binary: bool,
    /// Populated for non-binary files under the per-file size cap; `None`
    /// otherwise (large files are recorded but not read, per §4.1.5).
    pub text: Option<String>,
}

/// One step from the manifest's optional `install` list.
#[derive(Debug, Clone)]
pub struct InstallStep {
    pub description: String,
    pub command: String,
}

/// Declared runtime requirements from the manifest header.
#[derive(Debug, Clone, Default)]
pub struct Requires {
    pub bins: Vec<String>,
    pub env: Vec<String>,
    pub permissions: Vec<String>,
    pub config: BTreeMap<String, JsonValue>,
}

/// The normalized package produced by the parser.
#[derive(Debug, Clone)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub version: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub metadata: BTreeMap<String, JsonValue>,
    pub requires: Requires,
    pub install_steps: Vec<InstallStep>,
    pub body_markdown: String,
    pub scripts: Vec<Script>,
    pub extra_files: Vec<FileEntry>,
    /// Diagnostic-only; never read again once parsing completes.
    pub root_path: PathBuf,
}

impl Skill {
    /// The manifest body plus every script and every readable non-binary
    /// extra file, in the order the parser discovered them. This is the
    /// corpus the Static and Pattern analyzers both walk (§4.3) — the
    /// manifest body is included because prompt-injection and stealth
    /// instructions are commonly hidden there, not just in scripts.
    pub fn text_corpus(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = vec![("SKILL.md", self.body_markdown.as_str())];
        out.extend(
            self.scripts
                .iter()
                .map(|s| (s.path.as_str(), s.text.as_str())),
        );
        out.extend(
            self.extra_files
                .iter()
                .filter_map(|f| f.text.as_deref().map(|t| (f.path.as_str(), t))),
        );
        out
    }
}
