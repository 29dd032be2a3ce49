use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::Question;

/// Countdown used when quiz content does not pick its own.
pub const DEFAULT_QUESTION_SECONDS: u32 = 30;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizDefinitionError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("per-question countdown must be > 0 seconds")]
    ZeroDuration,

    #[error("question {question} has {count} option(s), at least 2 are required")]
    TooFewOptions { question: QuestionId, count: usize },

    #[error("question {question} marks option {index} as correct but only has {options} options")]
    CorrectOptionOutOfRange {
        question: QuestionId,
        index: usize,
        options: usize,
    },

    #[error("question id {0} is used more than once")]
    DuplicateQuestionId(QuestionId),
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// Ordered quiz content plus the countdown applied to every question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub questions: Vec<Question>,
    #[serde(default = "default_question_seconds")]
    pub per_question_seconds: u32,
}

fn default_question_seconds() -> u32 {
    DEFAULT_QUESTION_SECONDS
}

impl QuizDefinition {
    #[must_use]
    pub fn new(questions: Vec<Question>, per_question_seconds: u32) -> Self {
        Self {
            title: None,
            questions,
            per_question_seconds,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Checks the structural rules a session relies on.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizDefinitionError` found, checking the question list,
    /// the countdown, then each question in order.
    pub fn validate(&self) -> Result<(), QuizDefinitionError> {
        if self.questions.is_empty() {
            return Err(QuizDefinitionError::NoQuestions);
        }
        if self.per_question_seconds == 0 {
            return Err(QuizDefinitionError::ZeroDuration);
        }

        let mut seen = HashSet::with_capacity(self.questions.len());
        for question in &self.questions {
            if !seen.insert(question.id) {
                return Err(QuizDefinitionError::DuplicateQuestionId(question.id));
            }
            let count = question.option_count();
            if count < 2 {
                return Err(QuizDefinitionError::TooFewOptions {
                    question: question.id,
                    count,
                });
            }
            if question.correct_option_index >= count {
                return Err(QuizDefinitionError::CorrectOptionOutOfRange {
                    question: question.id,
                    index: question.correct_option_index,
                    options: count,
                });
            }
        }
        Ok(())
    }
}
