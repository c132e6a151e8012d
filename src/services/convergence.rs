//! Cross-round convergence scorer.
//!
//! Measures hypothesis stability between consecutive rounds: when the
//! grounder keeps producing the same strongest hypotheses, the debate has
//! stopped moving.

use crate::services::sections::extract_section;

/// Heading of the hypothesis list in the grounder's synthesis output.
const HYPOTHESES_HEADING: &str = "当前最强假设";

/// Hypotheses shorter than this (after stripping list markers) are ignored.
const MIN_HYPOTHESIS_LEN: usize = 5;

/// Outcome of comparing two rounds' hypothesis lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceReport {
    pub converged: bool,
    pub score: f64,
}

/// Pulls the hypothesis list out of a synthesis output: non-empty lines of
/// the strongest-hypotheses section, list markers stripped, noise dropped.
pub fn extract_hypotheses(grounder_output: &str) -> Vec<String> {
    let Some(section) = extract_section(grounder_output, HYPOTHESES_HEADING) else {
        return Vec::new();
    };
    section
        .lines()
        .map(|l| l.trim_start_matches(|c: char| c.is_whitespace() || c == '-' || c == '.' || c.is_ascii_digit()).trim())
        .filter(|l| l.chars().count() > MIN_HYPOTHESIS_LEN)
        .map(ToString::to_string)
        .collect()
}

/// Character-set Jaccard similarity. 0 when both sets are empty.
fn similarity(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    #[allow(clippy::cast_precision_loss)]
    {
        intersection as f64 / union as f64
    }
}

/// Mean pairwise similarity over the (current × previous) hypothesis grid.
/// An empty list on either side reports not-converged with score 0 rather
/// than dividing by zero.
pub fn check_convergence(
    current: &[String],
    previous: &[String],
    threshold: f64,
) -> ConvergenceReport {
    if current.is_empty() || previous.is_empty() {
        return ConvergenceReport { converged: false, score: 0.0 };
    }

    let mut total = 0.0;
    let mut pairs = 0u32;
    for curr in current {
        for prev in previous {
            total += similarity(curr, prev);
            pairs += 1;
        }
    }

    let score = total / f64::from(pairs);
    ConvergenceReport { converged: score >= threshold, score }
}
