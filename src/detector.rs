//! Question/Answer detector
//!
//! Walks the ordered body blocks of a template and reconstructs the list of
//! questions, their answer options, and which option carries the correctness
//! marker.
//!
//! The upstream producing tool is inconsistent about dash glyphs, NBSP and
//! trailing periods, so every block is normalized before matching. The
//! pattern rules are held in one [`DetectionRules`] value so each rule can be
//! exercised independently by tests.
//!
//! A numbered line that does not end in `?` is NOT a question; this check is
//! what keeps numbered section headers out of the question list.

use crate::document::TextBlock;
use crate::models::{AnswerOption, Question};
use crate::placeholders::CHECKBOX_MARKER;
use crate::utils::logging::truncate_text;
use regex::Regex;
use tracing::warn;

/// Module used when neither a dotted prefix nor a "Module N" header applies
const DEFAULT_MODULE: &str = "1";

/// Why a detected candidate was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Fewer than two options
    TooFewOptions(usize),
    /// No option carries the correctness marker
    NoCorrectOption,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::TooFewOptions(n) => write!(f, "only {} option(s)", n),
            DropReason::NoCorrectOption => write!(f, "no marked correct option"),
        }
    }
}

/// Diagnostic for a candidate that failed the validity invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedQuestion {
    pub number: String,
    pub prompt: String,
    pub reason: DropReason,
}

/// Detection output: valid questions plus diagnostics for the dropped ones
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub questions: Vec<Question>,
    pub dropped: Vec<DroppedQuestion>,
}

/// The four pattern rules, compiled once per template load
#[derive(Debug)]
pub struct DetectionRules {
    /// `1`, `1.2`, `1.2.3` (optional trailing dot), separators, text, `?`
    numbered_question: Regex,
    /// un-numbered line introduced by a dash, ending in `?`
    dash_question: Regex,
    /// `Module N`, optionally followed by `:` or `-` and a title
    module_header: Regex,
    /// `A - text` with optional trailing correctness marker
    answer: Regex,
}

impl DetectionRules {
    pub fn new() -> Self {
        Self {
            numbered_question: Regex::new(
                r"^\s*(\d+(?:\s*\.\s*\d+)*)\s*\.?\s*[-.\s]*(.+?)\s*\?$",
            )
            .unwrap(),
            dash_question: Regex::new(r"^\s*-\s*(.+?)\s*\?$").unwrap(),
            module_header: Regex::new(r"(?i)^\s*module\s+(\d+)\s*(?:[:\-].*)?$").unwrap(),
            answer: Regex::new(&format!(
                r"(?i)^\s*([A-D])[-.\s]+\s*(.*?)\s*({})?\s*$",
                regex::escape(CHECKBOX_MARKER)
            ))
            .unwrap(),
        }
    }
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize the glyph soup the producing tool emits: NBSP to plain space,
/// en/em dashes to `-`, surrounding whitespace trimmed.
pub fn normalize_text(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
        .replace('\u{2013}', "-")
        .replace('\u{2014}', "-")
        .trim()
        .to_string()
}

/// Clean a captured numeric identifier: collapse whitespace around dots,
/// strip trailing dots.
fn clean_number(raw: &str) -> String {
    let collapsed: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    collapsed.trim_end_matches('.').to_string()
}

/// Module implied by a question number: the leading segment before the
/// first dot. A plain number implies no module on its own.
fn module_from_number(number: &str) -> Option<String> {
    number
        .split_once('.')
        .map(|(head, _)| head.to_string())
}

struct OpenQuestion {
    question: Question,
}

/// Detect all questions in the body block sequence.
///
/// Deterministic: the same block sequence always yields the same questions,
/// options and correct indices. Dropped candidates are logged and returned
/// as diagnostics; they never abort the load.
pub fn detect_questions(blocks: &[TextBlock], rules: &DetectionRules) -> Detection {
    let mut candidates: Vec<Question> = Vec::new();
    let mut open: Option<OpenQuestion> = None;
    let mut current_module: Option<String> = None;
    let mut synthetic_seq = 0usize;

    for (index, block) in blocks.iter().enumerate() {
        let text = normalize_text(&block.text());
        if text.is_empty() {
            continue;
        }

        if let Some(caps) = rules.module_header.captures(&text) {
            current_module = Some(caps[1].to_string());
            continue;
        }

        if let Some(caps) = rules.numbered_question.captures(&text) {
            if let Some(prev) = open.take() {
                candidates.push(prev.question);
            }
            let number = clean_number(&caps[1]);
            let module = module_from_number(&number)
                .or_else(|| current_module.clone())
                .unwrap_or_else(|| number.clone());
            open = Some(OpenQuestion {
                question: Question {
                    position: index,
                    number,
                    module,
                    prompt: format!("{}?", &caps[2]),
                    options: Vec::new(),
                    correct_index: None,
                },
            });
            continue;
        }

        if let Some(caps) = rules.dash_question.captures(&text) {
            if let Some(prev) = open.take() {
                candidates.push(prev.question);
            }
            synthetic_seq += 1;
            open = Some(OpenQuestion {
                question: Question {
                    position: index,
                    number: format!("q{}", synthetic_seq),
                    module: current_module
                        .clone()
                        .unwrap_or_else(|| DEFAULT_MODULE.to_string()),
                    prompt: format!("{}?", &caps[1]),
                    options: Vec::new(),
                    correct_index: None,
                },
            });
            continue;
        }

        if let Some(current) = open.as_mut() {
            if let Some(caps) = rules.answer.captures(&text) {
                let letter = caps[1].to_uppercase().chars().next().unwrap_or('A');
                let is_correct = caps.get(3).is_some();
                current.question.options.push(AnswerOption {
                    position: index,
                    letter,
                    text: caps[2].trim().to_string(),
                    is_correct,
                });
                if is_correct {
                    current.question.correct_index = Some(current.question.options.len() - 1);
                }
            }
        }
    }

    if let Some(last) = open.take() {
        candidates.push(last.question);
    }

    // ========== Validity filter ==========
    let mut detection = Detection::default();
    for question in candidates {
        if question.is_valid() {
            detection.questions.push(question);
        } else {
            let reason = if question.options.len() < 2 {
                DropReason::TooFewOptions(question.options.len())
            } else {
                DropReason::NoCorrectOption
            };
            warn!(
                "⚠️ Question dropped: {} \"{}\" ({})",
                question.number,
                truncate_text(&question.prompt, 60),
                reason
            );
            detection.dropped.push(DroppedQuestion {
                number: question.number,
                prompt: question.prompt,
                reason,
            });
        }
    }

    detection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(lines: &[&str]) -> Vec<TextBlock> {
        lines.iter().map(|l| TextBlock::new(*l)).collect()
    }

    fn detect(lines: &[&str]) -> Detection {
        detect_questions(&blocks(lines), &DetectionRules::new())
    }

    #[test]
    fn test_numbered_question_with_marked_answer() {
        let d = detect(&[
            "1.1 - Paris est-elle la capitale de la France ?",
            "A - Oui {{checkbox}}",
            "B - Non",
        ]);
        assert_eq!(d.questions.len(), 1);
        let q = &d.questions[0];
        assert_eq!(q.number, "1.1");
        assert_eq!(q.module, "1");
        assert_eq!(q.position, 0);
        assert_eq!(q.correct_index, Some(0));
        assert_eq!(q.options.len(), 2);
        assert_eq!(q.options[0].letter, 'A');
        assert_eq!(q.options[0].text, "Oui");
        assert!(q.options[0].is_correct);
        assert_eq!(q.options[1].position, 2);
    }

    #[test]
    fn test_marker_stripped_from_text() {
        let d = detect(&[
            "1 - Question ?",
            "a . Réponse une {{checkbox}}",
            "b - Réponse deux",
        ]);
        let q = &d.questions[0];
        assert_eq!(q.options[0].letter, 'A');
        assert_eq!(q.options[0].text, "Réponse une");
    }

    #[test]
    fn test_numbered_line_without_question_mark_is_not_a_question() {
        // numbered section headers must not be misclassified
        let d = detect(&[
            "1.2 Consignes générales",
            "1.3 - Quelle est la bonne réponse ?",
            "A - Celle-ci {{checkbox}}",
            "B - L'autre",
        ]);
        assert_eq!(d.questions.len(), 1);
        assert_eq!(d.questions[0].number, "1.3");
    }

    #[test]
    fn test_nbsp_and_em_dash_tolerated() {
        let d = detect(&[
            "2.1\u{a0}\u{2014} Est-ce normalisé\u{a0}?",
            "A\u{2013} Oui {{checkbox}}",
            "B — Non",
        ]);
        assert_eq!(d.questions.len(), 1);
        assert_eq!(d.questions[0].number, "2.1");
        assert_eq!(d.questions[0].options.len(), 2);
    }

    #[test]
    fn test_number_cleaning() {
        let d = detect(&[
            "1 . 2. - Espaces autour des points ?",
            "A - Oui {{checkbox}}",
            "B - Non",
        ]);
        assert_eq!(d.questions[0].number, "1.2");
    }

    #[test]
    fn test_dash_question_gets_synthetic_number_and_module_header() {
        let d = detect(&[
            "Module 3 : Sécurité",
            "- Une question sans numéro ?",
            "A - Oui {{checkbox}}",
            "B - Non",
        ]);
        let q = &d.questions[0];
        assert_eq!(q.number, "q1");
        assert_eq!(q.module, "3");
    }

    #[test]
    fn test_plain_number_inherits_module_header() {
        let d = detect(&[
            "Module 2",
            "4 - Question du module deux ?",
            "A - Oui {{checkbox}}",
            "B - Non",
        ]);
        assert_eq!(d.questions[0].number, "4");
        assert_eq!(d.questions[0].module, "2");
    }

    #[test]
    fn test_dropped_too_few_options() {
        let d = detect(&["1 - Seule ?", "A - Unique {{checkbox}}"]);
        assert!(d.questions.is_empty());
        assert_eq!(d.dropped.len(), 1);
        assert_eq!(d.dropped[0].reason, DropReason::TooFewOptions(1));
    }

    #[test]
    fn test_dropped_no_correct_option() {
        let d = detect(&["1 - Aucune bonne ?", "A - Une", "B - Deux"]);
        assert!(d.questions.is_empty());
        assert_eq!(d.dropped[0].reason, DropReason::NoCorrectOption);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let lines = [
            "Module 1",
            "1.1 - Première ?",
            "A - a1",
            "B - b1 {{checkbox}}",
            "C - c1",
            "2.1 - Deuxième ?",
            "A - a2 {{checkbox}}",
            "B - b2",
        ];
        let first = detect(&lines);
        let second = detect(&lines);
        assert_eq!(first.questions, second.questions);
        assert_eq!(first.questions.len(), 2);
        // validity invariant
        for q in &first.questions {
            assert!(q.options.len() >= 2);
            assert!(q.correct_index.unwrap() < q.options.len());
        }
    }

    #[test]
    fn test_answers_outside_open_question_ignored() {
        let d = detect(&[
            "A - Réponse orpheline",
            "1 - Question ?",
            "A - Oui {{checkbox}}",
            "B - Non",
        ]);
        assert_eq!(d.questions.len(), 1);
        assert_eq!(d.questions[0].options.len(), 2);
    }
}
