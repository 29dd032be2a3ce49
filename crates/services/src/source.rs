//! Where quiz content comes from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use quiz_core::model::{Question, QuestionId, QuizDefinition, DEFAULT_QUESTION_SECONDS};

use crate::error::SourceError;

/// Supplies a validated `QuizDefinition`.
#[async_trait]
pub trait QuizSource: Send + Sync {
    async fn load(&self) -> Result<QuizDefinition, SourceError>;
}

/// Serves a definition that already lives in memory.
#[derive(Debug, Clone)]
pub struct StaticQuizSource {
    definition: QuizDefinition,
}

impl StaticQuizSource {
    #[must_use]
    pub fn new(definition: QuizDefinition) -> Self {
        Self { definition }
    }
}

#[async_trait]
impl QuizSource for StaticQuizSource {
    async fn load(&self) -> Result<QuizDefinition, SourceError> {
        self.definition.validate()?;
        Ok(self.definition.clone())
    }
}

/// Reads a quiz from a JSON file on each `load`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl QuizSource for JsonFileSource {
    async fn load(&self) -> Result<QuizDefinition, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Read {
                path: self.path.clone(),
                source,
            })?;
        let definition: QuizDefinition =
            serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
                path: self.path.clone(),
                source,
            })?;
        definition.validate()?;
        debug!(
            path = %self.path.display(),
            questions = definition.len(),
            "quiz loaded from file"
        );
        Ok(definition)
    }
}

/// The built-in practice quiz.
#[must_use]
pub fn sample_quiz() -> QuizDefinition {
    let question = |id: u64, text: &str, options: [&str; 4], correct: usize| {
        Question::new(
            QuestionId::new(id),
            text,
            options.iter().map(|o| (*o).to_owned()).collect(),
            correct,
        )
    };

    QuizDefinition::new(
        vec![
            question(1, "What is 15 + 8?", ["21", "23", "25", "27"], 1),
            question(
                2,
                "How many minutes are there in an hour?",
                ["50 minutes", "60 minutes", "70 minutes", "80 minutes"],
                1,
            ),
            question(
                3,
                "What is the capital of Brazil?",
                ["São Paulo", "Rio de Janeiro", "Brasília", "Belo Horizonte"],
                2,
            ),
        ],
        DEFAULT_QUESTION_SECONDS,
    )
    .with_title("Warm-up quiz")
}

/// Reorders questions before a session starts. Order is fixed once it starts.
pub fn shuffle_questions<R: Rng + ?Sized>(definition: &mut QuizDefinition, rng: &mut R) {
    definition.questions.as_mut_slice().shuffle(rng);
}
