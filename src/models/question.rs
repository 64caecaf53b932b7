use serde::{Deserialize, Serialize};

/// One answer option of a detected question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    /// Block index where this option's text lives (the output block to rewrite)
    pub position: usize,
    /// Label shown to the learner, A-D, normalized to uppercase
    pub letter: char,
    /// Display text with the correctness marker stripped
    pub text: String,
    /// Resolved from the in-template marker or the answer key
    pub is_correct: bool,
}

/// One detected question with its options, in source order.
///
/// Built once per template load and shared read-only across learners; the
/// renderer works on per-learner copies of `options`, never on this list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Block index of the question line itself
    pub position: usize,
    /// Dotted numeric identifier ("1.2") or synthetic id ("q3")
    pub number: String,
    /// Aggregation key: leading segment of `number`, or the enclosing
    /// "Module N" header
    pub module: String,
    /// Display text without the numeric prefix
    pub prompt: String,
    /// Options in source order
    pub options: Vec<AnswerOption>,
    /// Index of the correct option in `options`
    pub correct_index: Option<usize>,
}

impl Question {
    /// Validity invariant: at least two options and a resolved correct index
    pub fn is_valid(&self) -> bool {
        self.options.len() >= 2
            && self
                .correct_index
                .is_some_and(|i| i < self.options.len())
    }
}
