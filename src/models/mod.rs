pub mod learner;
pub mod question;

pub use learner::LearnerRecord;
pub use question::{AnswerOption, Question};
