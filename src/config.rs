use crate::renderer::LetterPolicy;

/// Program configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Template block dump (JSON produced by the document converter)
    pub template_path: String,
    /// Learner spreadsheet (.xlsx or .csv)
    pub learners_path: String,
    /// Answer key (.xlsx or .csv)
    pub answer_key_path: String,
    /// Optional freeze configuration (TOML)
    pub freeze_path: Option<String>,
    /// Directory receiving rendered documents and the summary
    pub output_dir: String,
    /// File name of the batch summary
    pub summary_file_name: String,
    /// How option letters behave after reordering
    pub letter_policy: LetterPolicy,
    /// Optional shuffle seed for reproducible batches
    pub shuffle_seed: Option<u64>,
    /// Verbose logging (detection report, per-question detail)
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_path: "template.json".to_string(),
            learners_path: "apprenants.xlsx".to_string(),
            answer_key_path: "corrections.xlsx".to_string(),
            freeze_path: None,
            output_dir: "output".to_string(),
            summary_file_name: "Recapitulatif_QCM.csv".to_string(),
            letter_policy: LetterPolicy::KeepOriginal,
            shuffle_seed: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            template_path: std::env::var("QCM_TEMPLATE").unwrap_or(default.template_path),
            learners_path: std::env::var("QCM_LEARNERS").unwrap_or(default.learners_path),
            answer_key_path: std::env::var("QCM_ANSWER_KEY").unwrap_or(default.answer_key_path),
            freeze_path: std::env::var("QCM_FREEZE").ok(),
            output_dir: std::env::var("QCM_OUTPUT_DIR").unwrap_or(default.output_dir),
            summary_file_name: std::env::var("QCM_SUMMARY_FILE").unwrap_or(default.summary_file_name),
            letter_policy: std::env::var("QCM_LETTER_POLICY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.letter_policy),
            shuffle_seed: std::env::var("QCM_SHUFFLE_SEED").ok().and_then(|v| v.parse().ok()),
            verbose_logging: std::env::var("QCM_VERBOSE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}
