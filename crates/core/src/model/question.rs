use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

/// A single-choice question as supplied by quiz content.
///
/// Option indices are the canonical option identifiers. Structural rules
/// (at least two options, correct index in range) are enforced by
/// [`QuizDefinition::validate`](crate::model::QuizDefinition::validate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_option_index: usize,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            options,
            correct_option_index,
        }
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Returns the option text at `index`, if it exists.
    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn has_option(&self, index: usize) -> bool {
        index < self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> Option<&str> {
        self.option(self.correct_option_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capital() -> Question {
        Question::new(
            QuestionId::new(3),
            "What is the capital of Brazil?",
            vec![
                "São Paulo".into(),
                "Rio de Janeiro".into(),
                "Brasília".into(),
                "Belo Horizonte".into(),
            ],
            2,
        )
    }

    #[test]
    fn option_lookup() {
        let q = capital();
        assert_eq!(q.option_count(), 4);
        assert_eq!(q.option(0), Some("São Paulo"));
        assert_eq!(q.option(4), None);
        assert!(q.has_option(3));
        assert!(!q.has_option(4));
        assert_eq!(q.correct_option(), Some("Brasília"));
    }

    #[test]
    fn deserializes_from_content_json() {
        let q: Question = serde_json::from_str(
            r#"{"id": 3, "text": "What is the capital of Brazil?",
                "options": ["São Paulo", "Rio de Janeiro", "Brasília", "Belo Horizonte"],
                "correct_option_index": 2}"#,
        )
        .unwrap();
        assert_eq!(q, capital());
    }
}
