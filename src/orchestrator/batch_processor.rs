//! Batch document processor
//!
//! ## Responsibilities
//!
//! 1. **Initialization**: load the template, detect the question model,
//!    load the answer key, the freeze configuration and the learners
//! 2. **Sequential processing**: render one document per learner; a
//!    failure only skips that learner
//! 3. **Summary**: collect one result row per rendered learner and write
//!    the recap spreadsheet
//! 4. **Statistics**: report success/failure counts at the end of the run
//!
//! The shared model (template, questions, key, freeze) is owned here and
//! handed to the renderer by reference; learners never see each other's
//! state.

use crate::answer_key::{self, KeyLoadReport};
use crate::config::Config;
use crate::detector::{detect_questions, Detection, DetectionRules};
use crate::document::DocumentModel;
use crate::error::{AppError, AppResult, TemplateError};
use crate::models::LearnerRecord;
use crate::placeholders;
use crate::renderer::{self, FreezeConfig, RenderSession};
use crate::spreadsheet::{self, SummaryRow};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Outcome of one batch run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

/// Application root: owns the configuration and the shared render session
pub struct App {
    config: Config,
    session: RenderSession,
    learners: Vec<LearnerRecord>,
}

impl App {
    /// Load every input and build the shared session.
    ///
    /// Fails fast: a template without a single valid question, an
    /// unreadable key or an unreadable learner list abort the run before
    /// any document is produced.
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let template = DocumentModel::load(&config.template_path)?;
        let rules = DetectionRules::new();
        let detection = detect_questions(&template.blocks, &rules);
        log_detection(&detection, config.verbose_logging);
        if detection.questions.is_empty() {
            return Err(AppError::Template(TemplateError::NoQuestionsDetected));
        }

        let (key, key_report) = answer_key::load_answer_key(&config.answer_key_path)?;
        log_key(&key_report, key.is_per_module());

        let freeze = match &config.freeze_path {
            Some(path) => {
                let freeze = FreezeConfig::from_toml_file(path)?;
                info!("🔒 Freeze configuration loaded from {}", path);
                freeze
            }
            None => FreezeConfig::default(),
        };

        let learners = spreadsheet::load_learners(&config.learners_path)?;
        info!("✓ {} learner(s) loaded from {}", learners.len(), config.learners_path);

        let session = RenderSession {
            template,
            questions: detection.questions,
            key,
            freeze,
            letter_policy: config.letter_policy,
        };

        Ok(Self {
            config,
            session,
            learners,
        })
    }

    /// Render every learner, write the summary, report the statistics
    pub fn run(&self) -> AppResult<BatchStats> {
        if self.learners.is_empty() {
            warn!("⚠️ No learner to process, nothing to do");
            return Ok(BatchStats::default());
        }

        fs::create_dir_all(&self.config.output_dir).map_err(AppError::from)?;

        let mut rng = match self.config.shuffle_seed {
            Some(seed) => {
                info!("🎲 Shuffle seeded with {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        let total = self.learners.len();
        let mut stats = BatchStats {
            total,
            ..Default::default()
        };
        let mut summary_rows = Vec::with_capacity(total);

        for (index, learner) in self.learners.iter().enumerate() {
            log_learner_start(index + 1, total, learner);

            match self.process_learner(learner, &mut rng) {
                Ok(row) => {
                    summary_rows.push(row);
                    stats.success += 1;
                }
                Err(e) => {
                    error!(
                        "[Learner {}] ❌ {} skipped: {}",
                        index + 1,
                        learner.display_name(),
                        e
                    );
                    stats.failed += 1;
                }
            }
        }

        let summary_path = Path::new(&self.config.output_dir)
            .join(&self.config.summary_file_name)
            .to_string_lossy()
            .into_owned();
        spreadsheet::write_summary(&summary_path, &summary_rows)?;

        print_final_stats(&stats, &summary_path);
        Ok(stats)
    }

    /// Render one learner and save the document; per-learner errors bubble
    /// up to the batch loop which logs and continues.
    fn process_learner(&self, learner: &LearnerRecord, rng: &mut StdRng) -> AppResult<SummaryRow> {
        let (doc, result) = renderer::render_learner(&self.session, learner, rng)?;

        let leftover = placeholders::unresolved_tokens(&doc);
        if !leftover.is_empty() {
            warn!(
                "⚠️ {} unresolved placeholder(s) for {}: {}",
                leftover.len(),
                learner.display_name(),
                leftover.join(", ")
            );
        }

        let file_name = format!("{}.json", learner.document_stem());
        let output_path = Path::new(&self.config.output_dir)
            .join(&file_name)
            .to_string_lossy()
            .into_owned();
        doc.save(&output_path)?;

        info!(
            "✓ {} -> {} ({}/{}, {})",
            learner.display_name(),
            file_name,
            result.score,
            result.total,
            result.outcome
        );

        Ok(SummaryRow::new(learner, &result))
    }
}

// ========== Log helpers ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 QCM generator starting");
    info!("📄 Template: {}", config.template_path);
    info!("📋 Learners: {}", config.learners_path);
    info!("🔑 Answer key: {}", config.answer_key_path);
    info!("📂 Output: {}", config.output_dir);
    info!("{}", "=".repeat(60));
}

fn log_detection(detection: &Detection, verbose: bool) {
    info!(
        "✓ {} question(s) detected, {} dropped",
        detection.questions.len(),
        detection.dropped.len()
    );
    if verbose {
        for question in &detection.questions {
            info!(
                "  [{}] module {} at block {}: {} option(s)",
                question.number,
                question.module,
                question.position,
                question.options.len()
            );
        }
    }
}

fn log_key(report: &KeyLoadReport, per_module: bool) {
    let shape = if per_module {
        "per-module counts"
    } else {
        "per-question letters"
    };
    info!("✓ Answer key loaded: {} entrie(s), {}", report.entries, shape);
    if report.dropped_rows > 0 {
        warn!("⚠️ {} key row(s) dropped as unparseable", report.dropped_rows);
    }
}

fn log_learner_start(index: usize, total: usize, learner: &LearnerRecord) {
    info!("\n{}", "─".repeat(60));
    info!("📦 Learner {}/{}: {}", index, total, learner.display_name());
}

fn print_final_stats(stats: &BatchStats, summary_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 Batch complete");
    info!(
        "Finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ Success: {}/{}", stats.success, stats.total);
    info!("❌ Failed: {}", stats.failed);
    info!("📋 Summary written to {}", summary_path);
    info!("{}", "=".repeat(60));
}
