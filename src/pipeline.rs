//! Scan orchestration (§4.4, §5): runs every enabled analyzer in
//! parallel over one parsed `Skill`, merges and dedupes their findings,
//! applies suppressions, scores the result, and assembles the `Report`.

use crate::analyzers::{Analyzer, AstAnalyzer, PatternAnalyzer, SemanticAnalyzer, StaticAnalyzer};
use crate::cancellation::CancellationToken;
use crate::config::Config;
use crate::error::{AnalyzerError, ScanError};
use crate::rules::RuleLibrary;
use crate::scorer;
use crate::skill::Skill;
use crate::types::{Category, Finding, Report, Severity, SkillRef};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

/// Runs the full analyzer pipeline over an already-parsed skill and
/// produces a scored [`Report`].
#[instrument(skip_all, fields(skill = %skill.name))]
pub fn run(
    skill: &Skill,
    parse_findings: Vec<Finding>,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<Report, ScanError> {
    let start = Instant::now();

    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let rules = Arc::new(RuleLibrary::load()?);

    let mut enabled: Vec<Box<dyn Analyzer>> = Vec::new();
    if config.analyzers.static_analyzer {
        enabled.push(Box::new(StaticAnalyzer::new(rules.clone())));
    }
    if config.analyzers.pattern {
        enabled.push(Box::new(PatternAnalyzer::new(rules.clone())));
    }
    if config.analyzers.ast {
        enabled.push(Box::new(AstAnalyzer));
    }
    if config.analyzers.semantic {
        enabled.push(Box::new(SemanticAnalyzer::default()));
    }

    let worker_count = config
        .workers
        .or_else(|| std::env::var("CLAWGUARD_WORKERS").ok().and_then(|v| v.parse().ok()))
        .unwrap_or_else(|| num_cpus().min(8));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count.max(1))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to build a bounded rayon pool, falling back to default");
            rayon::ThreadPoolBuilder::new().build().expect("default rayon pool")
        });

    let results: Vec<(&'static str, AnalyzerOutcome)> = pool.install(|| {
        enabled
            .par_iter()
            .map(|analyzer| (analyzer.name(), execute_analyzer(analyzer.as_ref(), skill, cancel)))
            .collect()
    });

    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let mut analyzers_run = Vec::new();
    let mut all_findings = parse_findings;
    for (name, outcome) in results {
        match outcome {
            AnalyzerOutcome::Ran(findings) => {
                analyzers_run.push(name.to_string());
                all_findings.extend(findings);
            }
            AnalyzerOutcome::Skipped => {
                analyzers_run.push(format!("{name}-skipped"));
            }
            AnalyzerOutcome::Errored(finding) => {
                analyzers_run.push(format!("{name}-errored"));
                all_findings.push(finding);
            }
        }
    }
    analyzers_run.push("parser".to_string());

    apply_suppressions(&mut all_findings, config);
    let deduped = dedup(all_findings);
    let sorted = sort_findings(deduped);

    let score = scorer::score(&sorted);

    Ok(Report {
        scan_id: uuid::Uuid::new_v4().to_string(),
        skill_ref: SkillRef {
            name: skill.name.clone(),
            description: skill.description.clone(),
            path: skill.root_path.clone(),
        },
        score,
        findings: sorted,
        analyzers_run,
        scan_duration_ms: start.elapsed().as_millis() as u64,
        scanned_at: chrono::Utc::now(),
    })
}

/// Outcome of running one analyzer: completed normally, skipped because it
/// reported itself unavailable, or errored (panicked) and contained.
enum AnalyzerOutcome {
    Ran(Vec<Finding>),
    Skipped,
    Errored(Finding),
}

/// Runs one analyzer, containing any panic it raises rather than letting it
/// unwind across the whole scan (§7): "analyzer errors are contained ... no
/// silent drop is permitted". A panicking analyzer is recorded as
/// `{name}-errored` and contributes one `best_practices`/`low` finding in
/// place of whatever it would otherwise have reported.
fn execute_analyzer(analyzer: &dyn Analyzer, skill: &Skill, cancel: &CancellationToken) -> AnalyzerOutcome {
    if !analyzer.is_available() {
        info!(analyzer = analyzer.name(), "analyzer unavailable, skipping");
        return AnalyzerOutcome::Skipped;
    }
    match catch_unwind(AssertUnwindSafe(|| analyzer.analyze(skill, cancel))) {
        Ok(findings) => AnalyzerOutcome::Ran(findings),
        Err(payload) => {
            let err = AnalyzerError {
                analyzer_name: analyzer.name().to_string(),
                cause: panic_cause(&payload),
            };
            error!(analyzer = analyzer.name(), cause = %err.cause, "analyzer panicked, containing failure");
            AnalyzerOutcome::Errored(analyzer_error_finding(&err))
        }
    }
}

/// Extracts a human-readable message from a `catch_unwind` payload (§7).
fn panic_cause(payload: &(dyn std::any::Any + Send + 'static)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "analyzer panicked with a non-string payload".to_string()
    }
}

/// Converts a contained `AnalyzerError` into the `best_practices`/`low`
/// finding the spec requires in place of a silent drop (§7).
fn analyzer_error_finding(err: &AnalyzerError) -> Finding {
    Finding {
        analyzer: err.analyzer_name.clone(),
        category: Category::BestPractices,
        severity: Severity::Low,
        title: "Analyzer failed to complete".to_string(),
        detail: format!("{} analyzer errored: {}", err.analyzer_name, err.cause),
        file: None,
        line: None,
        evidence: None,
        cwe: None,
        recommendation: "Investigate and fix the failing analyzer; re-run the scan for full coverage."
            .to_string(),
        suppressed: false,
    }
}

fn apply_suppressions(findings: &mut [Finding], config: &Config) {
    for finding in findings.iter_mut() {
        if config
            .suppressions
            .iter()
            .any(|s| s.covers(finding.file.as_deref(), finding.line))
        {
            finding.suppressed = true;
        }
    }
}

/// Dedup key: `(analyzer, category, file, line, title)` (§4.4).
type DedupKey = (String, crate::types::Category, Option<String>, Option<usize>, String);

/// Deduplicates by [`DedupKey`], keeping the highest-severity finding for
/// each key (§4.4). A `BTreeMap` (rather than a hash map) keeps this
/// deterministic: iteration order must not depend on hasher state, since
/// the pipeline's permutation-invariance guarantee requires the same
/// inputs to always produce the same finding order.
fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    let mut by_key: BTreeMap<DedupKey, Finding> = BTreeMap::new();
    for finding in findings {
        let key = (
            finding.analyzer.clone(),
            finding.category,
            finding.file.clone(),
            finding.line,
            finding.title.clone(),
        );
        match by_key.get(&key) {
            Some(existing) if existing.severity >= finding.severity => {}
            _ => {
                by_key.insert(key, finding);
            }
        }
    }
    by_key.into_values().collect()
}

/// Sorts by `(severity desc, category asc, file asc, line asc)` (§4.4), then
/// by `(analyzer, title)` so that two findings with an otherwise-identical
/// key (e.g. the same line flagged by two different analyzers) still land
/// in a fixed, reproducible order.
fn sort_findings(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.analyzer.cmp(&b.analyzer))
            .then_with(|| a.title.cmp(&b.title))
    });
    findings
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
