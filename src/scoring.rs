//! Module aggregation and outcome classification
//!
//! Folds per-question correctness into per-module and total counts, then
//! maps the total percentage to one of three categorical outcomes. The 75
//! and 50 boundaries are inclusive on the upper branch; they are grading
//! thresholds with real consequences and must not drift.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Categorical outcome of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Acquired,
    InProgress,
    NotAcquired,
}

impl Outcome {
    /// Classify a percentage: >= 75 Acquired, >= 50 InProgress, else
    /// NotAcquired.
    pub fn classify(percentage: f64) -> Self {
        if percentage >= 75.0 {
            Outcome::Acquired
        } else if percentage >= 50.0 {
            Outcome::InProgress
        } else {
            Outcome::NotAcquired
        }
    }

    /// Label shown in rendered documents and the summary
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Acquired => "Acquis",
            Outcome::InProgress => "En cours d'acquisition",
            Outcome::NotAcquired => "Non acquis",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Correct/total counts for one module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModuleCount {
    pub correct: u32,
    pub total: u32,
}

/// Accumulator for one learner's counts, per module and grand total
#[derive(Debug, Clone, Default)]
pub struct ModuleScores {
    by_module: BTreeMap<String, ModuleCount>,
}

impl ModuleScores {
    /// Record one scored question: the total always grows, the correct
    /// count only on a match.
    pub fn record(&mut self, module: &str, matched: bool) {
        let entry = self.by_module.entry(module.to_string()).or_default();
        entry.total += 1;
        if matched {
            entry.correct += 1;
        }
    }

    /// Inject a pre-aggregated module result (answer-key shape B)
    pub fn set_precomputed(&mut self, module: &str, correct: u32, total: u32) {
        self.by_module
            .insert(module.to_string(), ModuleCount { correct, total });
    }

    pub fn score(&self) -> u32 {
        self.by_module.values().map(|c| c.correct).sum()
    }

    pub fn total(&self) -> u32 {
        self.by_module.values().map(|c| c.total).sum()
    }

    pub fn modules(&self) -> impl Iterator<Item = (&String, &ModuleCount)> {
        self.by_module.iter()
    }

    /// Finalize into a result. `total == 0` yields 0%, never a division
    /// error.
    pub fn finish(self) -> LearnerResult {
        let score = self.score();
        let total = self.total();
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * f64::from(score) / f64::from(total)
        };
        LearnerResult {
            score,
            total,
            percentage,
            outcome: Outcome::classify(percentage),
            by_module: self.by_module,
        }
    }
}

/// One learner's final score
#[derive(Debug, Clone, Serialize)]
pub struct LearnerResult {
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub outcome: Outcome,
    pub by_module: BTreeMap<String, ModuleCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: u32, total: u32) -> LearnerResult {
        let mut scores = ModuleScores::default();
        for i in 0..total {
            scores.record("1", i < score);
        }
        scores.finish()
    }

    #[test]
    fn test_outcome_boundaries() {
        // 3/4 = 75% is Acquired (inclusive boundary)
        assert_eq!(result(3, 4).outcome, Outcome::Acquired);
        // 2/4 = 50% is InProgress (inclusive boundary)
        assert_eq!(result(2, 4).outcome, Outcome::InProgress);
        // 1/4 = 25%
        assert_eq!(result(1, 4).outcome, Outcome::NotAcquired);
    }

    #[test]
    fn test_zero_total_is_not_acquired_without_division_error() {
        let r = result(0, 0);
        assert_eq!(r.percentage, 0.0);
        assert_eq!(r.outcome, Outcome::NotAcquired);
    }

    #[test]
    fn test_per_module_accumulation() {
        let mut scores = ModuleScores::default();
        scores.record("1", true);
        scores.record("1", false);
        scores.record("2", true);
        let r = scores.finish();
        assert_eq!(r.score, 2);
        assert_eq!(r.total, 3);
        assert_eq!(r.by_module["1"], ModuleCount { correct: 1, total: 2 });
        assert_eq!(r.by_module["2"], ModuleCount { correct: 1, total: 1 });
    }

    #[test]
    fn test_precomputed_modules() {
        let mut scores = ModuleScores::default();
        scores.set_precomputed("1", 4, 5);
        scores.set_precomputed("2", 3, 4);
        let r = scores.finish();
        assert_eq!(r.score, 7);
        assert_eq!(r.total, 9);
        assert_eq!(r.outcome, Outcome::Acquired);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Outcome::Acquired.to_string(), "Acquis");
        assert_eq!(Outcome::InProgress.to_string(), "En cours d'acquisition");
        assert_eq!(Outcome::NotAcquired.to_string(), "Non acquis");
    }
}
