//! Shared value types for findings, categories, and severities.
//!
//! These types are produced by every analyzer and consumed by the scorer
//! and the pipeline; none of them touch the filesystem.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Totally ordered risk level of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Base point deduction before the category multiplier is applied.
    pub fn base_deduction(self) -> f64 {
        match self {
            Severity::Critical => 40.0,
            Severity::High => 20.0,
            Severity::Medium => 10.0,
            Severity::Low => 3.0,
            Severity::Info => 0.0,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Closed set of finding classifications.
///
/// Ordering here is also the tie-break order used when sorting findings
/// and when choosing `top_risks` — it must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Malware,
    PromptInjection,
    CredentialExposure,
    SocialEngineering,
    NetworkExfiltration,
    Obfuscation,
    ExcessivePermissions,
    Typosquat,
    SupplyChain,
    MemoryManipulation,
    BestPractices,
}

impl Category {
    /// Deduction multiplier applied to a finding's base severity deduction.
    pub fn multiplier(self) -> f64 {
        match self {
            Category::Malware => 2.0,
            Category::PromptInjection => 1.5,
            Category::CredentialExposure => 1.5,
            Category::MemoryManipulation => 1.5,
            Category::SocialEngineering => 1.25,
            Category::SupplyChain => 1.25,
            Category::NetworkExfiltration => 1.0,
            Category::Obfuscation => 1.0,
            Category::ExcessivePermissions => 1.0,
            Category::Typosquat => 1.0,
            Category::BestPractices => 0.25,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Malware => "malware",
            Category::PromptInjection => "prompt_injection",
            Category::CredentialExposure => "credential_exposure",
            Category::SocialEngineering => "social_engineering",
            Category::NetworkExfiltration => "network_exfiltration",
            Category::Obfuscation => "obfuscation",
            Category::ExcessivePermissions => "excessive_permissions",
            Category::Typosquat => "typosquat",
            Category::SupplyChain => "supply_chain",
            Category::MemoryManipulation => "memory_manipulation",
            Category::BestPractices => "best_practices",
        };
        write!(f, "{s}")
    }
}

/// One structured observation produced by one analyzer about one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub analyzer: String,
    pub category: Category,
    pub severity: Severity,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    pub recommendation: String,
    /// Not part of the distilled data model; carried so suppressed findings
    /// stay visible in the report while being excluded from scoring (§6).
    #[serde(default)]
    pub suppressed: bool,
}

impl Finding {
    /// Truncates `text` to at most `max_chars` characters at a char boundary,
    /// matching the reference implementation's snippet-truncation convention.
    pub fn truncate_evidence(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}…", &text[..idx]),
            None => text.to_string(),
        }
    }

    /// Dedup key used by the pipeline: `(analyzer, category, file, line, title)`.
    pub fn dedup_key(&self) -> (&str, Category, Option<&str>, Option<usize>, &str) {
        (
            &self.analyzer,
            self.category,
            self.file.as_deref(),
            self.line,
            &self.title,
        )
    }
}

/// Letter grade derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{s}")
    }
}

/// Categorical verdict derived from the score, subject to floor rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Pass,
    Caution,
    Review,
    Block,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Recommendation::Pass => "PASS",
            Recommendation::Caution => "CAUTION",
            Recommendation::Review => "REVIEW",
            Recommendation::Block => "BLOCK",
        };
        write!(f, "{s}")
    }
}

impl Recommendation {
    /// Exit code mapping for the CLI surface (§6): PASS=0 .. BLOCK=3.
    pub fn exit_code(self) -> i32 {
        match self {
            Recommendation::Pass => 0,
            Recommendation::Caution => 1,
            Recommendation::Review => 2,
            Recommendation::Block => 3,
        }
    }
}

/// Score block: numeric value plus its derived grade/recommendation/summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub value: u8,
    pub grade: Grade,
    pub summary: String,
    pub top_risks: Vec<String>,
    pub recommendation: Recommendation,
}

/// Minimal identifying reference to the skill a report describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRef {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
}

/// Aggregate result of a full scan, returned to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub scan_id: String,
    pub skill_ref: SkillRef,
    pub score: Score,
    pub findings: Vec<Finding>,
    pub analyzers_run: Vec<String>,
    pub scan_duration_ms: u64,
    pub scanned_at: chrono::DateTime<chrono::Utc>,
}
