//! Typosquat detection (§4.3): flags a skill name that sits one edit away
//! from a popular skill name without being identical to it.

use crate::types::{Category, Finding, Severity};

/// Small, curated set of well-known skill/integration names. Not
/// exhaustive — a deployment that needs a longer list can extend this via
/// the same rule-override mechanism the pattern catalog uses, once one
/// exists for this category.
const POPULAR_NAMES: &[&str] = &[
    "github", "gitlab", "slack", "notion", "jira", "aws", "docker",
    "kubernetes", "stripe", "openai", "anthropic", "google", "salesforce",
    "zoom", "discord", "telegram", "postgres", "redis", "terraform",
];

pub fn detect(skill_name: &str) -> Option<Finding> {
    let candidate = skill_name.to_lowercase();
    let closest = POPULAR_NAMES
        .iter()
        .filter(|&&name| name != candidate)
        .find(|&&name| levenshtein(&candidate, name) == 1)?;

    Some(Finding {
        analyzer: "ast".to_string(),
        category: Category::Typosquat,
        severity: Severity::High,
        title: "Skill name resembles a popular name".to_string(),
        detail: format!("`{skill_name}` is one edit away from `{closest}`"),
        file: None,
        line: None,
        evidence: None,
        cwe: Some("CWE-1021".to_string()),
        recommendation: "Rename the skill to avoid impersonating a well-known name.".to_string(),
        suppressed: false,
    })
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for i in 1..=a.len() {
        let mut prev_diag = row[0];
        row[0] = i;
        for j in 1..=b.len() {
            let temp = row[j];
            row[j] = if a[i - 1] == b[j - 1] {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j - 1])
            };
            prev_diag = temp;
        }
    }
    row[b.len()]
}
