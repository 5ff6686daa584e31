//! A tiny boolean DSL for pattern-dialect rule conditions (§4.2, §9):
//! `any of`, `all of`, counted occurrences, and conjunctions over named
//! sub-patterns. Deliberately not a general expression language — just
//! enough structure to express a YARA-style condition clause.

use regex::Regex;
use std::collections::HashMap;

/// A single named sub-pattern: either a literal substring or a regex.
pub enum SubPattern {
    Literal(&'static str),
    Regex(Regex),
}

impl SubPattern {
    pub fn count_matches(&self, text: &str) -> usize {
        match self {
            SubPattern::Literal(lit) => text.matches(lit).count(),
            SubPattern::Regex(re) => re.find_iter(text).count(),
        }
    }

    pub fn first_match(&self, text: &str) -> Option<String> {
        match self {
            SubPattern::Literal(lit) => text.find(lit).map(|_| (*lit).to_string()),
            SubPattern::Regex(re) => re.find(text).map(|m| m.as_str().to_string()),
        }
    }
}

/// Boolean condition over `{sub_pattern_name -> match_count}`.
pub enum Condition {
    /// Present at least once.
    Var(&'static str),
    /// Present at least `n` times.
    CountAtLeast(&'static str, usize),
    AnyOf(Vec<&'static str>),
    AllOf(Vec<&'static str>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn var(name: &'static str) -> Self {
        Condition::Var(name)
    }

    pub fn any_of(names: &[&'static str]) -> Self {
        Condition::AnyOf(names.to_vec())
    }

    pub fn all_of(names: &[&'static str]) -> Self {
        Condition::AllOf(names.to_vec())
    }

    pub fn count_at_least(name: &'static str, n: usize) -> Self {
        Condition::CountAtLeast(name, n)
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn eval(&self, counts: &HashMap<&'static str, usize>) -> bool {
        match self {
            Condition::Var(name) => counts.get(name).copied().unwrap_or(0) > 0,
            Condition::CountAtLeast(name, n) => counts.get(name).copied().unwrap_or(0) >= *n,
            Condition::AnyOf(names) => names.iter().any(|n| counts.get(n).copied().unwrap_or(0) > 0),
            Condition::AllOf(names) => names.iter().all(|n| counts.get(n).copied().unwrap_or(0) > 0),
            Condition::And(a, b) => a.eval(counts) && b.eval(counts),
            Condition::Or(a, b) => a.eval(counts) || b.eval(counts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&'static str, usize)]) -> HashMap<&'static str, usize> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn any_of_matches_when_one_present() {
        let cond = Condition::any_of(&["a", "b"]);
        assert!(cond.eval(&counts(&[("a", 1)])));
        assert!(!cond.eval(&counts(&[("c", 1)])));
    }

    #[test]
    fn all_of_requires_every_name() {
        let cond = Condition::all_of(&["a", "b"]);
        assert!(!cond.eval(&counts(&[("a", 1)])));
        assert!(cond.eval(&counts(&[("a", 1), ("b", 2)])));
    }

    #[test]
    fn and_conjunction_of_var_and_any_of() {
        let cond = Condition::var("open").and(Condition::any_of(&["a", "b"]));
        assert!(!cond.eval(&counts(&[("a", 1)])));
        assert!(cond.eval(&counts(&[("open", 1), ("b", 1)])));
    }

    #[test]
    fn count_at_least_thresholds() {
        let cond = Condition::count_at_least("x", 3);
        assert!(!cond.eval(&counts(&[("x", 2)])));
        assert!(cond.eval(&counts(&[("x", 3)])));
    }
}
