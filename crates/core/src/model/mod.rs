mod ids;
mod question;
mod quiz;
mod report;
mod settings;

pub use ids::QuestionId;
pub use question::Question;
pub use quiz::{QuizDefinition, QuizDefinitionError, DEFAULT_QUESTION_SECONDS};
pub use report::{QuestionResult, QuizReport, QuizScore};
pub use settings::{
    DEFAULT_FEEDBACK_DISPLAY_MS, MAX_FEEDBACK_DISPLAY_MS, MIN_FEEDBACK_DISPLAY_MS, SessionSettings,
    SettingsError,
};
