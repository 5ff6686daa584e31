//! Semantic Analyzer (§4.3): a single bounded call to an external LLM
//! asking it to flag anything the mechanical layers would miss.
//!
//! This is the one analyzer that can fail to run at all — no API key, a
//! network hiccup, a slow endpoint, a malformed response — and none of
//! those cases may fail the scan. They are recorded instead by the
//! pipeline appending `-skipped` to this analyzer's name in
//! `analyzers_run` (§7).

use super::Analyzer;
use crate::cancellation::CancellationToken;
use crate::skill::Skill;
use crate::types::{Category, Finding, Severity};
use std::time::Duration;
use tracing::warn;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const SUMMARY_MAX_BYTES: usize = 64 * 1024;

pub struct SemanticAnalyzer {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        let timeout_ms = std::env::var("CLAWGUARD_SEMANTIC_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self {
            endpoint: std::env::var("CLAWGUARD_SEMANTIC_ENDPOINT")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[derive(serde::Deserialize)]
struct SemanticFinding {
    category: String,
    severity: String,
    title: String,
    detail: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    recommendation: Option<String>,
}

#[derive(serde::Deserialize)]
struct SemanticResponse {
    #[serde(default)]
    findings: Vec<SemanticFinding>,
}

impl Analyzer for SemanticAnalyzer {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn analyze(&self, skill: &Skill, cancel: &CancellationToken) -> Vec<Finding> {
        let Some(api_key) = &self.api_key else {
            return Vec::new();
        };
        if cancel.is_cancelled() {
            return Vec::new();
        }

        let summary = build_summary(skill);

        let client = match reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "semantic analyzer could not build an HTTP client");
                return Vec::new();
            }
        };

        let body = serde_json::json!({
            "skill_name": skill.name,
            "description": skill.description,
            "summary": summary,
        });

        let response = client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send();

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "semantic analyzer request failed, skipping");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "semantic analyzer endpoint returned a non-2xx status, skipping");
            return Vec::new();
        }

        let parsed: SemanticResponse = match response.json() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "semantic analyzer response was not well-formed, skipping");
                return Vec::new();
            }
        };

        parsed.findings.into_iter().filter_map(to_finding).collect()
    }
}

fn to_finding(raw: SemanticFinding) -> Option<Finding> {
    let category = parse_category(&raw.category)?;
    let severity = parse_severity(&raw.severity)?;
    Some(Finding {
        analyzer: "semantic".to_string(),
        category,
        severity,
        title: raw.title,
        detail: raw.detail,
        file: raw.file,
        line: None,
        evidence: None,
        cwe: None,
        recommendation: raw
            .recommendation
            .unwrap_or_else(|| "Review the flagged behavior manually.".to_string()),
        suppressed: false,
    })
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

/// Manifest header plus every script's text, concatenated and truncated to
/// `SUMMARY_MAX_BYTES` so the request stays bounded regardless of skill size.
fn build_summary(skill: &Skill) -> String {
    let mut summary = format!(
        "name: {}\ndescription: {}\n\n",
        skill.name, skill.description
    );
    for script in &skill.scripts {
        summary.push_str(&format!("--- {} ---\n", script.path));
        summary.push_str(&script.text);
        summary.push('\n');
        if summary.len() >= SUMMARY_MAX_BYTES {
            break;
        }
    }
    if summary.len() > SUMMARY_MAX_BYTES {
        summary.truncate(SUMMARY_MAX_BYTES);
    }
    summary
}
