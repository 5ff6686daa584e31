//! Scoring (§4.5): severity-weighted deductions with per-category
//! diminishing returns, mapped to a grade band and a recommendation band,
//! the latter subject to two floor rules.

use crate::types::{Category, Finding, Grade, Recommendation, Score, Severity};
use std::collections::HashMap;

const TOP_RISKS_MAX: usize = 5;

/// Computes a [`Score`] from a set of findings. Suppressed findings are
/// excluded from every deduction but still appear in the report (§6).
pub fn score(findings: &[Finding]) -> Score {
    let scored: Vec<&Finding> = findings.iter().filter(|f| !f.suppressed).collect();

    let mut by_category: HashMap<Category, Vec<&Finding>> = HashMap::new();
    for f in &scored {
        by_category.entry(f.category).or_default().push(f);
    }

    let mut total_deduction = 0.0;
    for (category, mut in_category) in by_category.clone() {
        in_category.sort_by_key(|f| std::cmp::Reverse(f.severity));
        for (idx, finding) in in_category.iter().enumerate() {
            let weight = match idx {
                0 => 1.0,
                1 => 0.5,
                _ => 0.25,
            };
            total_deduction += finding.severity.base_deduction() * category.multiplier() * weight;
        }
    }

    let value = (100.0 - total_deduction).clamp(0.0, 100.0).round() as u8;
    let grade = grade_for(value);
    let mut recommendation = recommendation_for(value);

    if has_malware_at_least_high(&scored) {
        recommendation = recommendation.max(Recommendation::Block);
    }
    if has_critical_prompt_injection_or_credential_exposure(&scored) {
        recommendation = recommendation.max(Recommendation::Review);
    }

    let top_risks = top_risks(&scored);
    let summary = summary_for(value, &scored);

    Score {
        value,
        grade,
        summary,
        top_risks,
        recommendation,
    }
}

impl PartialOrd for Recommendation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Recommendation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        rank(*self).cmp(&rank(*other))
    }
}

fn rank(r: Recommendation) -> u8 {
    match r {
        Recommendation::Pass => 0,
        Recommendation::Caution => 1,
        Recommendation::Review => 2,
        Recommendation::Block => 3,
    }
}

fn grade_for(value: u8) -> Grade {
    match value {
        90..=100 => Grade::A,
        75..=89 => Grade::B,
        60..=74 => Grade::C,
        40..=59 => Grade::D,
        _ => Grade::F,
    }
}

fn recommendation_for(value: u8) -> Recommendation {
    match value {
        85..=100 => Recommendation::Pass,
        65..=84 => Recommendation::Caution,
        40..=64 => Recommendation::Review,
        _ => Recommendation::Block,
    }
}

fn has_malware_at_least_high(findings: &[&Finding]) -> bool {
    findings
        .iter()
        .any(|f| f.category == Category::Malware && f.severity >= Severity::High)
}

fn has_critical_prompt_injection_or_credential_exposure(findings: &[&Finding]) -> bool {
    findings.iter().any(|f| {
        f.severity == Severity::Critical
            && matches!(
                f.category,
                Category::PromptInjection | Category::CredentialExposure
            )
    })
}

/// Up to [`TOP_RISKS_MAX`] one-line summaries, highest severity first, ties
/// broken by category order then file path (§4.5).
fn top_risks(findings: &[&Finding]) -> Vec<String> {
    let mut sorted: Vec<&&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.file.cmp(&b.file))
    });
    sorted
        .into_iter()
        .take(TOP_RISKS_MAX)
        .map(|f| format!("[{}/{}] {}", f.category, f.severity, f.title))
        .collect()
}

fn summary_for(value: u8, findings: &[&Finding]) -> String {
    if findings.is_empty() {
        return "No security findings.".to_string();
    }
    format!(
        "{} finding(s) across {} categor{}; score {value}/100.",
        findings.len(),
        findings.iter().map(|f| f.category).collect::<std::collections::HashSet<_>>().len(),
        if findings.len() == 1 { "y" } else { "ies" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(category: Category, severity: Severity) -> Finding {
        Finding {
            analyzer: "test".to_string(),
            category,
            severity,
            title: "t".to_string(),
            detail: "d".to_string(),
            file: None,
            line: None,
            evidence: None,
            cwe: None,
            recommendation: "r".to_string(),
            suppressed: false,
        }
    }

    #[test]
    fn no_findings_yields_perfect_score() {
        let s = score(&[]);
        assert_eq!(s.value, 100);
        assert_eq!(s.grade, Grade::A);
        assert_eq!(s.recommendation, Recommendation::Pass);
    }

    #[test]
    fn adding_a_finding_never_increases_score() {
        let base = score(&[finding(Category::BestPractices, Severity::Low)]);
        let more = score(&[
            finding(Category::BestPractices, Severity::Low),
            finding(Category::Obfuscation, Severity::Medium),
        ]);
        assert!(more.value <= base.value);
    }

    #[test]
    fn diminishing_returns_within_a_category() {
        let one = score(&[finding(Category::NetworkExfiltration, Severity::High)]);
        let two = score(&[
            finding(Category::NetworkExfiltration, Severity::High),
            finding(Category::NetworkExfiltration, Severity::High),
        ]);
        let one_deduction = 100 - one.value as i32;
        let two_deduction = 100 - two.value as i32;
        assert!(two_deduction < one_deduction * 2);
    }

    #[test]
    fn malware_high_or_above_floors_block() {
        let s = score(&[finding(Category::Malware, Severity::High)]);
        assert_eq!(s.recommendation, Recommendation::Block);
    }

    #[test]
    fn critical_credential_exposure_floors_review() {
        let s = score(&[finding(Category::CredentialExposure, Severity::Critical)]);
        assert!(s.recommendation >= Recommendation::Review);
    }

    #[test]
    fn suppressed_findings_are_excluded_from_scoring() {
        let mut f = finding(Category::Malware, Severity::Critical);
        f.suppressed = true;
        let s = score(&[f]);
        assert_eq!(s.value, 100);
    }

    #[test]
    fn score_is_clamped_to_zero() {
        let findings: Vec<Finding> = (0..20)
            .map(|_| finding(Category::Malware, Severity::Critical))
            .collect();
        let s = score(&findings);
        assert_eq!(s.value, 0);
    }
}
