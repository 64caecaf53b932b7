//! Per-learner document renderer
//!
//! Consumes the shared question model (read-only), a freeze configuration
//! and one learner record, and produces a rendered copy of the template
//! plus the learner's score.
//!
//! Ordering policy per question:
//! - frozen: the operator-chosen option (default: the correct one) is moved
//!   to display position 0, the rest keep their source order, no shuffle;
//! - otherwise: the correct option is pinned at position 0 and the
//!   remainder is shuffled uniformly.
//!
//! The shared `Question.options` list is never mutated; every learner works
//! on a fresh copy, and on a fresh deep copy of the template blocks.

use crate::answer_key::AnswerKey;
use crate::document::DocumentModel;
use crate::error::{AppError, AppResult, ConfigError, RenderError};
use crate::models::{AnswerOption, LearnerRecord, Question};
use crate::placeholders::{
    self, substitute_document, Replacements, TOKEN_EMAIL, TOKEN_EVALUATION_DATE,
    TOKEN_FIRST_NAME, TOKEN_LAST_NAME, TOKEN_OUTCOME, TOKEN_SCORE_TOTAL, TOKEN_SESSION_REF,
    TOKEN_TOTAL_QUESTIONS,
};
use crate::scoring::{LearnerResult, ModuleScores};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use tracing::warn;

/// Marker written on the option at display position 0
pub const CHECKED_MARKER: &str = "☑";
/// Marker written on every other option
pub const UNCHECKED_MARKER: &str = "☐";

/// What happens to the displayed A-D letter when options are reordered.
///
/// The canonical behavior keeps the letter bound to the option's identity;
/// reassignment by display position is available for operators who expect
/// "option A is always first". Scoring always uses the option's original
/// letter, whatever the display policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LetterPolicy {
    #[default]
    KeepOriginal,
    ReassignByPosition,
}

impl FromStr for LetterPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" | "keep_original" => Ok(LetterPolicy::KeepOriginal),
            "reassign" | "by_position" => Ok(LetterPolicy::ReassignByPosition),
            other => Err(AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: "QCM_LETTER_POLICY".to_string(),
                value: other.to_string(),
                expected_type: "letter policy (keep | reassign)".to_string(),
            })),
        }
    }
}

/// Operator overrides pinning a chosen option first for selected questions.
///
/// Keyed by the question's block position (its identity across the
/// template).
#[derive(Debug, Clone, Default)]
pub struct FreezeConfig {
    frozen: HashSet<usize>,
    choice: HashMap<usize, usize>,
}

#[derive(Debug, Deserialize)]
struct FreezeFile {
    #[serde(default)]
    question: Vec<FreezeEntry>,
}

#[derive(Debug, Deserialize)]
struct FreezeEntry {
    position: usize,
    choice: Option<usize>,
}

impl FreezeConfig {
    /// Freeze a question, optionally with an explicit option index
    pub fn freeze(&mut self, position: usize, choice: Option<usize>) {
        self.frozen.insert(position);
        if let Some(index) = choice {
            self.choice.insert(position, index);
        }
    }

    pub fn is_frozen(&self, position: usize) -> bool {
        self.frozen.contains(&position)
    }

    /// Option index pinned first for a frozen question; falls back to the
    /// question's own correct index when no explicit choice was made.
    pub fn choice_for(&self, position: usize, correct_index: Option<usize>) -> Option<usize> {
        if !self.is_frozen(position) {
            return None;
        }
        self.choice.get(&position).copied().or(correct_index)
    }

    pub fn is_empty(&self) -> bool {
        self.frozen.is_empty()
    }

    /// Load from the operator's TOML file:
    ///
    /// ```toml
    /// [[question]]
    /// position = 4
    /// choice = 1
    /// ```
    pub fn from_toml_file(path: &str) -> AppResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(ConfigError::FreezeParseFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })?;
        let file: FreezeFile = toml::from_str(&data).map_err(|e| {
            AppError::Config(ConfigError::FreezeParseFailed {
                path: path.to_string(),
                source: Box::new(e),
            })
        })?;
        let mut config = Self::default();
        for entry in file.question {
            config.freeze(entry.position, entry.choice);
        }
        Ok(config)
    }
}

/// Everything shared, read-only, across the learners of one batch run:
/// the template, the detected question model, the answer key and the
/// freeze configuration. Owned by the orchestrator and passed by
/// reference into the renderer.
#[derive(Debug)]
pub struct RenderSession {
    pub template: DocumentModel,
    pub questions: Vec<Question>,
    pub key: AnswerKey,
    pub freeze: FreezeConfig,
    pub letter_policy: LetterPolicy,
}

/// Identity-field replacements for one learner
pub fn identity_replacements(learner: &LearnerRecord) -> Replacements {
    let mut replacements = Replacements::new();
    replacements.insert(TOKEN_FIRST_NAME.to_string(), learner.first_name.clone());
    replacements.insert(TOKEN_LAST_NAME.to_string(), learner.last_name.clone());
    replacements.insert(TOKEN_EMAIL.to_string(), learner.email.clone());
    replacements.insert(TOKEN_SESSION_REF.to_string(), learner.session_ref.clone());
    replacements.insert(
        TOKEN_EVALUATION_DATE.to_string(),
        learner.evaluation_date.clone(),
    );
    replacements
}

/// Score/result replacements, built once scoring is final
pub fn result_replacements(result: &LearnerResult) -> Replacements {
    let mut replacements = Replacements::new();
    replacements.insert(TOKEN_SCORE_TOTAL.to_string(), result.score.to_string());
    replacements.insert(
        TOKEN_TOTAL_QUESTIONS.to_string(),
        result.total.to_string(),
    );
    replacements.insert(TOKEN_OUTCOME.to_string(), result.outcome.label().to_string());
    for (module, count) in &result.by_module {
        replacements.insert(
            placeholders::result_mod_token(module),
            count.correct.to_string(),
        );
        replacements.insert(
            placeholders::total_mod_token(module),
            count.total.to_string(),
        );
    }
    replacements
}

/// Decide the display order of one question's options.
///
/// Works on a copy; the shared list is untouched.
fn order_options<R: Rng>(
    question: &Question,
    freeze: &FreezeConfig,
    rng: &mut R,
) -> AppResult<Vec<AnswerOption>> {
    let mut options = question.options.clone();
    if options.is_empty() {
        return Err(AppError::Render(RenderError::EmptyOptions {
            question: question.number.clone(),
        }));
    }

    if let Some(choice) = freeze.choice_for(question.position, question.correct_index) {
        let index = choice.min(options.len() - 1);
        let chosen = options.remove(index);
        options.insert(0, chosen);
    } else {
        if let Some(correct) = question.correct_index {
            let chosen = options.remove(correct);
            options.insert(0, chosen);
        }
        // position 0 stays pinned; only the remainder is shuffled
        options[1..].shuffle(rng);
    }
    Ok(options)
}

/// Write one question's reordered options back into the document.
///
/// The display-slot option is written into the slot-th option block of the
/// question's source order, so the question keeps its physical shape while
/// the options move.
fn write_options(
    doc: &mut DocumentModel,
    question: &Question,
    display: &[AnswerOption],
    policy: LetterPolicy,
) -> AppResult<()> {
    for (slot, option) in display.iter().enumerate() {
        let target = question.options[slot].position;
        if target >= doc.blocks.len() {
            return Err(AppError::Render(RenderError::BlockIndexOutOfRange {
                block: target,
                block_count: doc.blocks.len(),
            }));
        }
        let letter = match policy {
            LetterPolicy::KeepOriginal => option.letter,
            LetterPolicy::ReassignByPosition => (b'A' + slot as u8) as char,
        };
        let marker = if slot == 0 {
            CHECKED_MARKER
        } else {
            UNCHECKED_MARKER
        };
        doc.blocks[target].set_text(format!("{} - {} {}", letter, option.text, marker));
    }
    Ok(())
}

/// Render one learner: substitute identity fields, reorder and mark every
/// question's options, score, then substitute result fields.
///
/// Returns the rendered document and the learner's result. Any error here
/// is per-learner: the caller logs it and moves on.
pub fn render_learner<R: Rng>(
    session: &RenderSession,
    learner: &LearnerRecord,
    rng: &mut R,
) -> AppResult<(DocumentModel, LearnerResult)> {
    // private working copy of the template (arena-per-learner)
    let mut doc = session.template.clone();

    substitute_document(&mut doc, &identity_replacements(learner));

    let mut scores = ModuleScores::default();

    for question in &session.questions {
        let display = order_options(question, &session.freeze, rng)?;
        write_options(&mut doc, question, &display, session.letter_policy)?;

        if !session.key.is_per_module() {
            // the scored letter is the option's own original letter
            let matched = session.key.letter_for(&question.number) == Some(display[0].letter);
            scores.record(&question.module, matched);
        }
    }

    if session.key.is_per_module() {
        // degraded fallback: the key supplies pre-aggregated corrects, the
        // detected questions supply the totals
        let mut totals: BTreeMap<String, u32> = BTreeMap::new();
        for question in &session.questions {
            *totals.entry(question.module.clone()).or_default() += 1;
        }
        for (module, total) in totals {
            let correct = match session.key.module_count(&module) {
                Some(count) => count,
                None => {
                    warn!("⚠️ No key entry for module {}, counted as 0", module);
                    0
                }
            };
            scores.set_precomputed(&module, correct, total);
        }
    }

    let result = scores.finish();
    substitute_document(&mut doc, &result_replacements(&result));

    Ok((doc, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer_key::AnswerKey;
    use crate::document::TextBlock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn option(position: usize, letter: char, text: &str, is_correct: bool) -> AnswerOption {
        AnswerOption {
            position,
            letter,
            text: text.to_string(),
            is_correct,
        }
    }

    /// Template + question: "1.1 - ... ?" at block 0, options at blocks 1-4,
    /// B correct.
    fn test_session(key: AnswerKey, freeze: FreezeConfig) -> RenderSession {
        let template = DocumentModel {
            blocks: vec![
                TextBlock::new("1.1 - Capitale de la France ?"),
                TextBlock::new("A - Londres ☐"),
                TextBlock::new("B - Paris ☐"),
                TextBlock::new("C - Rome ☐"),
                TextBlock::new("D - Berlin ☐"),
            ],
            ..Default::default()
        };
        let question = Question {
            position: 0,
            number: "1.1".to_string(),
            module: "1".to_string(),
            prompt: "Capitale de la France ?".to_string(),
            options: vec![
                option(1, 'A', "Londres", false),
                option(2, 'B', "Paris", true),
                option(3, 'C', "Rome", false),
                option(4, 'D', "Berlin", false),
            ],
            correct_index: Some(1),
        };
        RenderSession {
            template,
            questions: vec![question],
            key,
            freeze,
            letter_policy: LetterPolicy::KeepOriginal,
        }
    }

    fn per_question_key(pairs: &[(&str, char)]) -> AnswerKey {
        AnswerKey::PerQuestion(
            pairs
                .iter()
                .map(|(n, l)| (n.to_string(), *l))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn learner() -> LearnerRecord {
        LearnerRecord {
            first_name: "Alice".to_string(),
            last_name: "Martin".to_string(),
            email: "a@b.fr".to_string(),
            session_ref: "S-1".to_string(),
            evaluation_date: "2025-01-15".to_string(),
        }
    }

    #[test]
    fn test_correct_option_pinned_first_and_marked() {
        let session = test_session(per_question_key(&[("1.1", 'B')]), FreezeConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        let (doc, result) = render_learner(&session, &learner(), &mut rng).unwrap();

        // the first option block carries the correct option, checked
        let first = doc.blocks[1].text();
        assert_eq!(first, format!("B - Paris {}", CHECKED_MARKER));
        for block in &doc.blocks[2..=4] {
            assert!(block.text().ends_with(UNCHECKED_MARKER));
        }
        assert_eq!(result.score, 1);
        assert_eq!(result.total, 1);
    }

    #[test]
    fn test_shared_model_never_mutated_across_learners() {
        let session = test_session(per_question_key(&[("1.1", 'B')]), FreezeConfig::default());
        let before = session.questions.clone();
        let template_before = session.template.clone();

        let mut rng = StdRng::seed_from_u64(1);
        render_learner(&session, &learner(), &mut rng).unwrap();
        render_learner(&session, &learner(), &mut rng).unwrap();

        assert_eq!(session.questions, before);
        assert_eq!(session.template, template_before);
    }

    #[test]
    fn test_same_seed_renders_identically() {
        let session = test_session(per_question_key(&[("1.1", 'B')]), FreezeConfig::default());
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let (doc_a, _) = render_learner(&session, &learner(), &mut rng_a).unwrap();
        let (doc_b, _) = render_learner(&session, &learner(), &mut rng_b).unwrap();
        assert_eq!(doc_a, doc_b);
    }

    #[test]
    fn test_freeze_with_explicit_choice_is_deterministic() {
        let mut freeze = FreezeConfig::default();
        freeze.freeze(0, Some(2)); // pin "C - Rome" regardless of correctness
        let session = test_session(per_question_key(&[("1.1", 'B')]), freeze);

        for seed in 0..5 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (doc, result) = render_learner(&session, &learner(), &mut rng).unwrap();
            assert_eq!(doc.blocks[1].text(), format!("C - Rome {}", CHECKED_MARKER));
            // the remaining options keep their source order, no shuffle
            assert_eq!(doc.blocks[2].text(), format!("A - Londres {}", UNCHECKED_MARKER));
            assert_eq!(doc.blocks[3].text(), format!("B - Paris {}", UNCHECKED_MARKER));
            assert_eq!(doc.blocks[4].text(), format!("D - Berlin {}", UNCHECKED_MARKER));
            // C does not match the key letter B
            assert_eq!(result.score, 0);
            assert_eq!(result.total, 1);
        }
    }

    #[test]
    fn test_freeze_without_choice_defaults_to_correct() {
        let mut freeze = FreezeConfig::default();
        freeze.freeze(0, None);
        let session = test_session(per_question_key(&[("1.1", 'B')]), freeze);
        let mut rng = StdRng::seed_from_u64(3);
        let (doc, result) = render_learner(&session, &learner(), &mut rng).unwrap();
        assert_eq!(doc.blocks[1].text(), format!("B - Paris {}", CHECKED_MARKER));
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_question_missing_from_key_counts_total_only() {
        let session = test_session(per_question_key(&[]), FreezeConfig::default());
        let mut rng = StdRng::seed_from_u64(5);
        let (_, result) = render_learner(&session, &learner(), &mut rng).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.total, 1);
    }

    #[test]
    fn test_letter_reassignment_policy() {
        let mut session = test_session(per_question_key(&[("1.1", 'B')]), FreezeConfig::default());
        session.letter_policy = LetterPolicy::ReassignByPosition;
        let mut rng = StdRng::seed_from_u64(11);
        let (doc, result) = render_learner(&session, &learner(), &mut rng).unwrap();
        // display letters follow position; scoring still used B's identity
        assert!(doc.blocks[1].text().starts_with("A - Paris"));
        assert_eq!(result.score, 1);
    }

    #[test]
    fn test_identity_and_result_placeholders_substituted() {
        let mut session = test_session(per_question_key(&[("1.1", 'B')]), FreezeConfig::default());
        session.template.blocks.insert(
            0,
            TextBlock::new("{{prenom}} {{nom}} - {{result_mod1}}/{{total_mod1}} {{result_evaluation}}"),
        );
        // shift the question model by one block
        for q in &mut session.questions {
            q.position += 1;
            for o in &mut q.options {
                o.position += 1;
            }
        }
        let mut rng = StdRng::seed_from_u64(2);
        let (doc, _) = render_learner(&session, &learner(), &mut rng).unwrap();
        assert_eq!(doc.blocks[0].text(), "Alice Martin - 1/1 Acquis");
    }

    #[test]
    fn test_block_index_out_of_range_is_render_error() {
        let mut session = test_session(per_question_key(&[("1.1", 'B')]), FreezeConfig::default());
        session.questions[0].options[3].position = 42;
        let mut rng = StdRng::seed_from_u64(4);
        let err = render_learner(&session, &learner(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            AppError::Render(RenderError::BlockIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_per_module_key_bypasses_question_verification() {
        let key = AnswerKey::PerModule(
            [("1".to_string(), 1u32)].into_iter().collect::<HashMap<_, _>>(),
        );
        let session = test_session(key, FreezeConfig::default());
        let mut rng = StdRng::seed_from_u64(6);
        let (_, result) = render_learner(&session, &learner(), &mut rng).unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total, 1);
    }
}
