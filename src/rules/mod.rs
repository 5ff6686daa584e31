//! The rule library (§4.2): an immutable, category-partitioned set of
//! declarative rules loaded once at startup, in two dialects.
//!
//! - [`RuleKind::Regex`] rules are a single compiled expression applied
//!   per line by the Static Analyzer.
//! - [`RuleKind::Pattern`] rules are a tiny boolean DSL over the presence
//!   counts of named sub-patterns, applied once per file by the Pattern
//!   Analyzer — this mirrors a classic YARA-style rule without pulling in
//!   a full expression-language dependency (see design note §9).

mod catalog;
mod dsl;

pub use dsl::{Condition, SubPattern};

use crate::error::RuleLoadError;
use crate::types::{Category, Severity};
use regex::Regex;
use std::path::Path;

/// A single textual match produced while evaluating a rule against a file.
pub struct Match {
    pub line: usize,
    pub snippet: String,
}

/// A compiled pattern-dialect rule: named sub-patterns plus a condition
/// over their match counts.
pub struct PatternSpec {
    pub sub_patterns: Vec<(&'static str, SubPattern)>,
    pub condition: Condition,
}

pub enum RuleKind {
    Regex(Regex),
    Pattern(PatternSpec),
}

pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    pub description: &'static str,
    pub cwe: Option<&'static str>,
    pub remediation: &'static str,
    pub kind: RuleKind,
}

impl Rule {
    /// Regex-dialect matching: returns one [`Match`] per line that matches.
    pub fn match_lines(&self, text: &str) -> Vec<Match> {
        let RuleKind::Regex(re) = &self.kind else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if let Some(m) = re.find(line) {
                out.push(Match {
                    line: idx + 1,
                    snippet: m.as_str().to_string(),
                });
            }
        }
        out
    }

    /// Pattern-dialect matching: evaluates the condition once against the
    /// whole file text; returns `Some` snippet (the first sub-pattern hit)
    /// if the condition is satisfied, `None` otherwise.
    pub fn match_file(&self, text: &str) -> Option<String> {
        let RuleKind::Pattern(spec) = &self.kind else {
            return None;
        };
        let mut counts = std::collections::HashMap::new();
        let mut first_snippet: Option<String> = None;
        for (name, sub) in &spec.sub_patterns {
            let n = sub.count_matches(text);
            if n > 0 && first_snippet.is_none() {
                first_snippet = sub.first_match(text);
            }
            counts.insert(*name, n);
        }
        if spec.condition.eval(&counts) {
            Some(first_snippet.unwrap_or_default())
        } else {
            None
        }
    }
}

/// The fully loaded, immutable set of rules.
pub struct RuleLibrary {
    rules: Vec<Rule>,
}

impl RuleLibrary {
    /// Loads the bundled rule set, merging in any rules found under
    /// `CLAWGUARD_RULES_DIR` (§6). Fails fast on any load error rather
    /// than running with a partially loaded library (§4.2).
    pub fn load() -> Result<Self, RuleLoadError> {
        let mut rules = catalog::bundled_rules();

        if let Ok(dir) = std::env::var("CLAWGUARD_RULES_DIR") {
            rules.extend(load_external_rules(Path::new(&dir))?);
        }

        Ok(Self { rules })
    }

    pub fn regex_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(|r| matches!(r.kind, RuleKind::Regex(_)))
    }

    pub fn pattern_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .filter(|r| matches!(r.kind, RuleKind::Pattern(_)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// External rule files are a simpler regex-only dialect (TOML array of
/// tables) so that a deployment can extend coverage without shipping Rust
/// code; pattern-dialect rules remain compiled-in only.
#[derive(serde::Deserialize)]
struct ExternalRuleFile {
    #[serde(default)]
    rule: Vec<ExternalRule>,
}

#[derive(serde::Deserialize)]
struct ExternalRule {
    id: String,
    category: String,
    severity: String,
    description: String,
    regex: String,
    #[serde(default)]
    cwe: Option<String>,
    #[serde(default)]
    remediation: Option<String>,
}

fn load_external_rules(dir: &Path) -> Result<Vec<Rule>, RuleLoadError> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(out);
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let text = std::fs::read_to_string(&path).map_err(|e| RuleLoadError {
            rule_id: path.display().to_string(),
            message: format!("could not read rule file: {e}"),
        })?;
        let parsed: ExternalRuleFile =
            toml::from_str(&text).map_err(|e| RuleLoadError {
                rule_id: path.display().to_string(),
                message: format!("invalid rule file: {e}"),
            })?;
        for r in parsed.rule {
            let category = parse_category(&r.category).ok_or_else(|| RuleLoadError {
                rule_id: r.id.clone(),
                message: format!("unknown category '{}'", r.category),
            })?;
            let severity = parse_severity(&r.severity).ok_or_else(|| RuleLoadError {
                rule_id: r.id.clone(),
                message: format!("unknown severity '{}'", r.severity),
            })?;
            let regex = Regex::new(&r.regex).map_err(|e| RuleLoadError {
                rule_id: r.id.clone(),
                message: format!("invalid regex: {e}"),
            })?;
            out.push(Rule {
                id: Box::leak(r.id.clone().into_boxed_str()),
                category,
                severity,
                description: Box::leak(r.description.into_boxed_str()),
                cwe: r.cwe.map(|s| &*Box::leak(s.into_boxed_str())),
                remediation: Box::leak(
                    r.remediation
                        .unwrap_or_else(|| "Review and remediate.".to_string())
                        .into_boxed_str(),
                ),
                kind: RuleKind::Regex(regex),
            });
        }
    }
    Ok(out)
}

fn parse_category(s: &str) -> Option<Category> {
    Some(match s {
        "malware" => Category::Malware,
        "prompt_injection" => Category::PromptInjection,
        "credential_exposure" => Category::CredentialExposure,
        "social_engineering" => Category::SocialEngineering,
        "network_exfiltration" => Category::NetworkExfiltration,
        "obfuscation" => Category::Obfuscation,
        "excessive_permissions" => Category::ExcessivePermissions,
        "typosquat" => Category::Typosquat,
        "supply_chain" => Category::SupplyChain,
        "memory_manipulation" => Category::MemoryManipulation,
        "best_practices" => Category::BestPractices,
        _ => return None,
    })
}

fn parse_severity(s: &str) -> Option<Severity> {
    Some(match s {
        "info" => Severity::Info,
        "low" => Severity::Low,
        "medium" => Severity::Medium,
        "high" => Severity::High,
        "critical" => Severity::Critical,
        _ => return None,
    })
}
