//! # QCM Generator
//!
//! Batch generator of personalized multiple-choice evaluation documents.
//!
//! ## Architecture
//!
//! The system is layered, dependencies only point downward:
//!
//! ### ① I/O layer
//! - `document` - JSON block dump of the template, save/load, block visitors
//! - `spreadsheet` - learner lists (xlsx/csv) and the batch summary (csv)
//! - `answer_key` - correction tables, per-question or per-module shape
//!
//! ### ② Domain layer
//! - `detector` - turns template blocks into a question model
//! - `placeholders` - `{{token}}` substitution and diagnostics
//! - `scoring` - per-module aggregation and outcome classification
//!
//! ### ③ Rendering layer
//! - `renderer` - one learner in, one personalized document + result out
//!
//! ### ④ Orchestration layer
//! - `orchestrator/batch_processor` - loads everything once, renders every
//!   learner sequentially, writes the summary and the statistics

pub mod answer_key;
pub mod config;
pub mod detector;
pub mod document;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod placeholders;
pub mod renderer;
pub mod scoring;
pub mod spreadsheet;
pub mod utils;

// Re-export the common types
pub use answer_key::AnswerKey;
pub use config::Config;
pub use document::{DocumentModel, TextBlock};
pub use error::{AppError, AppResult};
pub use models::{LearnerRecord, Question};
pub use orchestrator::{App, BatchStats};
pub use renderer::{FreezeConfig, LetterPolicy, RenderSession};
pub use scoring::{LearnerResult, Outcome};
