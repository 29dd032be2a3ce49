use chrono::{DateTime, Duration, Utc};

use crate::model::question::Question;

/// Outcome of one question once the session is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub question: Question,
    pub selected: Option<usize>,
    pub was_correct: bool,
}

impl QuestionResult {
    #[must_use]
    pub fn is_unanswered(&self) -> bool {
        self.selected.is_none()
    }
}

/// Tally of a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuizScore {
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
    pub total: u32,
}

impl QuizScore {
    /// Counts results. Unanswered questions are counted apart from wrong answers.
    #[must_use]
    pub fn from_results(results: &[QuestionResult]) -> Self {
        results.iter().fold(Self::default(), |mut score, result| {
            score.total = score.total.saturating_add(1);
            if result.was_correct {
                score.correct = score.correct.saturating_add(1);
            } else if result.is_unanswered() {
                score.unanswered = score.unanswered.saturating_add(1);
            } else {
                score.incorrect = score.incorrect.saturating_add(1);
            }
            score
        })
    }

    /// Share of correct answers, rounded to a whole percent.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (f64::from(self.correct) * 100.0 / f64::from(self.total)).round();
        // correct <= total, so pct is within 0..=100
        pct as u8
    }
}

/// Everything a reporting screen needs once a session completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizReport {
    title: Option<String>,
    results: Vec<QuestionResult>,
    score: QuizScore,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl QuizReport {
    #[must_use]
    pub fn new(
        title: Option<String>,
        results: Vec<QuestionResult>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let score = QuizScore::from_results(&results);
        Self {
            title,
            results,
            score,
            started_at,
            completed_at,
        }
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn results(&self) -> &[QuestionResult] {
        &self.results
    }

    #[must_use]
    pub fn score(&self) -> QuizScore {
        self.score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.completed_at - self.started_at
    }
}
