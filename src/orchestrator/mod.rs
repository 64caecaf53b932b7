//! Orchestration layer
//!
//! ## Responsibilities
//!
//! This layer drives the batch run and is the application's entry point.
//!
//! ### `batch_processor`
//! - Application lifecycle (initialize, run)
//! - Loads the template, detects questions, loads the key and the learners
//! - Renders every learner sequentially, isolating per-learner failures
//! - Writes the batch summary and the final statistics
//!
//! ## Layering
//!
//! ```text
//! batch_processor (Vec<LearnerRecord>)
//!     ↓
//! renderer (one learner)
//!     ↓
//! detector / placeholders / scoring (domain)
//!     ↓
//! document / spreadsheet / answer_key (I/O)
//! ```
//!
//! The orchestrator holds no business logic of its own: it schedules,
//! counts and reports.

pub mod batch_processor;

pub use batch_processor::{App, BatchStats};
