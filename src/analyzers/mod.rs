//! Plug-in analyzer abstraction (§4.3, §9): any value implementing
//! `{name(), analyze(skill)}` is an analyzer. No inheritance tree, no
//! analyzer reads another analyzer's output, and execution order never
//! affects the result — the pipeline relies on both properties.

mod ast;
mod pattern_analyzer;
mod semantic;
mod static_analyzer;

pub use ast::AstAnalyzer;
pub use pattern_analyzer::PatternAnalyzer;
pub use semantic::SemanticAnalyzer;
pub use static_analyzer::StaticAnalyzer;

use crate::cancellation::CancellationToken;
use crate::skill::Skill;
use crate::types::Finding;

/// A pure function from an immutable [`Skill`] to a sequence of findings.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this analyzer can run at all in the current environment
    /// (the semantic analyzer reports `false` when no credentials are
    /// configured).
    fn is_available(&self) -> bool {
        true
    }

    fn analyze(&self, skill: &Skill, cancel: &CancellationToken) -> Vec<Finding>;
}
