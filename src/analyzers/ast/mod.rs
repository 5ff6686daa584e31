//! AST Analyzer (§4.3): grammar-backed walks over Python and shell
//! scripts, plus the typosquat and excessive-permissions heuristics that
//! ride along on the same parsed-skill pass.

mod bash;
mod python;
mod typosquat;

use super::Analyzer;
use crate::cancellation::CancellationToken;
use crate::skill::{Language, Skill};
use crate::types::{Category, Finding, Severity};

pub struct AstAnalyzer;

impl Analyzer for AstAnalyzer {
    fn name(&self) -> &'static str {
        "ast"
    }

    fn analyze(&self, skill: &Skill, cancel: &CancellationToken) -> Vec<Finding> {
        let mut findings = Vec::new();

        for script in &skill.scripts {
            if cancel.is_cancelled() {
                return findings;
            }
            match script.language {
                Language::Python => findings.extend(python::analyze(&script.path, &script.text)),
                Language::Bash => findings.extend(bash::analyze(&script.path, &script.text)),
                _ => {}
            }
        }

        if let Some(finding) = typosquat::detect(&skill.name) {
            findings.push(finding);
        }
        if let Some(finding) = excessive_permissions(skill) {
            findings.push(finding);
        }

        findings
    }
}

fn unparseable_finding(path: &str, language: &str) -> Finding {
    Finding {
        analyzer: "ast".to_string(),
        category: Category::BestPractices,
        severity: Severity::Low,
        title: "Unparseable script".to_string(),
        detail: format!("{path} could not be parsed as {language}; skipping AST checks for it"),
        file: Some(path.to_string()),
        line: None,
        evidence: None,
        cwe: None,
        recommendation: "Confirm the script is valid and free of syntax errors.".to_string(),
        suppressed: false,
    }
}

const SENSITIVE_ENV_PREFIXES: &[&str] = &["AWS_", "DATABASE_URL", "GITHUB_TOKEN"];
const SENSITIVE_PERMISSIONS: &[&str] = &["admin", "root"];

/// Combined presence of `sudo` in `requires.bins` (or admin/root permissions
/// alongside network+shell+filesystem) together with three or more
/// sensitive env vars, while the description reads short and benign (§4.3).
fn excessive_permissions(skill: &Skill) -> Option<Finding> {
    let wants_sudo = skill.requires.bins.iter().any(|b| b == "sudo");
    let wants_admin = skill
        .requires
        .permissions
        .iter()
        .any(|p| SENSITIVE_PERMISSIONS.contains(&p.as_str()));
    let wants_network_shell_fs = ["network", "shell", "filesystem"]
        .iter()
        .all(|needed| skill.requires.permissions.iter().any(|p| p == needed));

    if !(wants_sudo || wants_admin || wants_network_shell_fs) {
        return None;
    }

    let sensitive_env_count = skill
        .requires
        .env
        .iter()
        .filter(|e| SENSITIVE_ENV_PREFIXES.iter().any(|p| e.starts_with(p)))
        .count();
    if sensitive_env_count < 3 {
        return None;
    }

    if skill.description.len() >= 100 {
        return None;
    }

    Some(Finding {
        analyzer: "ast".to_string(),
        category: Category::ExcessivePermissions,
        severity: Severity::High,
        title: "Excessive declared permissions for a benign-looking description".to_string(),
        detail: format!(
            "Declares elevated privileges and {sensitive_env_count} sensitive environment variables while the description is only {} characters long",
            skill.description.len()
        ),
        file: None,
        line: None,
        evidence: None,
        cwe: Some("CWE-269".to_string()),
        recommendation: "Scope requested permissions to what the description actually justifies.".to_string(),
        suppressed: false,
    })
}
