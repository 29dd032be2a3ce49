//! The quiz session controller.
//!
//! A `QuizSession` is a plain state machine. It never sleeps or spawns; a caller
//! (usually the async runner in `services`) feeds it ticks, answers and the
//! feedback-delay exit, one transition at a time.

mod progress;

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::evaluator::Feedback;
use crate::model::{Question, QuestionResult, QuizDefinition, QuizDefinitionError, QuizReport};
use crate::time::Clock;

pub use progress::SessionProgress;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("invalid quiz definition: {0}")]
    InvalidDefinition(#[from] QuizDefinitionError),

    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },

    #[error("option {index} does not exist, the question has {options} options")]
    OutOfRange { index: usize, options: usize },

    #[error("no answer selected for the current question")]
    NoAnswerSelected,

    #[error("results are only available once the session is complete")]
    SessionNotComplete,

    #[error("session already completed")]
    SessionCompleted,
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingAnswer,
    ShowingFeedback,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitingAnswer => "awaiting an answer",
            Phase::ShowingFeedback => "showing feedback",
            Phase::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// What a single `tick` did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not awaiting an answer, nothing changed.
    Idle,
    Counting { remaining: u32 },
    /// The countdown hit zero and the question was closed.
    Expired(Feedback),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a quiz, from `start` to `Completed`.
pub struct QuizSession {
    definition: QuizDefinition,
    clock: Clock,
    current: usize,
    answers: Vec<Option<usize>>,
    correctness: Vec<Option<bool>>,
    remaining_seconds: u32,
    phase: Phase,
    feedback: Option<Feedback>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Starts a session stamped with system time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidDefinition` if the definition fails validation.
    pub fn start(definition: QuizDefinition) -> Result<Self, SessionError> {
        Self::start_with_clock(definition, Clock::system())
    }

    /// Starts a session whose timestamps come from `clock`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidDefinition` if the definition fails validation.
    pub fn start_with_clock(definition: QuizDefinition, clock: Clock) -> Result<Self, SessionError> {
        definition.validate()?;

        let len = definition.len();
        let remaining_seconds = definition.per_question_seconds;
        Ok(Self {
            definition,
            clock,
            current: 0,
            answers: vec![None; len],
            correctness: vec![None; len],
            remaining_seconds,
            phase: Phase::AwaitingAnswer,
            feedback: None,
            started_at: clock.now(),
            completed_at: None,
        })
    }

    #[must_use]
    pub fn definition(&self) -> &QuizDefinition {
        &self.definition
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Captured answers, one slot per question, `None` while unanswered.
    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    /// The provisional or submitted choice for the current question.
    #[must_use]
    pub fn selected_answer(&self) -> Option<usize> {
        self.answers.get(self.current).copied().flatten()
    }

    /// Feedback for the current question, present only while showing feedback.
    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionCompleted` once the session is over.
    pub fn current_question(&self) -> Result<&Question, SessionError> {
        if self.is_complete() {
            return Err(SessionError::SessionCompleted);
        }
        Ok(&self.definition.questions[self.current])
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::at(self.current, self.definition.len(), self.is_complete())
    }

    /// `(current_index + 1) / question_count`.
    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        self.progress().fraction
    }

    /// Records a provisional choice for the current question.
    ///
    /// The choice can be changed freely until the question is submitted or expires.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` while showing feedback,
    /// `SessionError::SessionCompleted` after completion and
    /// `SessionError::OutOfRange` for an index the question does not have.
    pub fn select_answer(&mut self, option_index: usize) -> Result<(), SessionError> {
        self.ensure_awaiting("select an answer")?;

        let options = self.definition.questions[self.current].option_count();
        if option_index >= options {
            return Err(SessionError::OutOfRange {
                index: option_index,
                options,
            });
        }
        self.answers[self.current] = Some(option_index);
        Ok(())
    }

    /// Closes the current question with the selected answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoAnswerSelected` if nothing was picked yet,
    /// `SessionError::InvalidTransition` while showing feedback and
    /// `SessionError::SessionCompleted` after completion.
    pub fn submit(&mut self) -> Result<&Feedback, SessionError> {
        self.ensure_awaiting("submit")?;
        if self.answers[self.current].is_none() {
            return Err(SessionError::NoAnswerSelected);
        }
        Ok(self.close_question(false))
    }

    /// Counts one second off the current question.
    ///
    /// Reaching zero submits whatever is selected, or records the question as
    /// unanswered and incorrect.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::AwaitingAnswer {
            return TickOutcome::Idle;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Counting {
                remaining: self.remaining_seconds,
            };
        }
        TickOutcome::Expired(self.close_question(true).clone())
    }

    /// Runs the countdown out immediately, as when the timer reports expiry.
    ///
    /// Returns `None` when the session is not awaiting an answer.
    pub fn expire(&mut self) -> Option<Feedback> {
        if self.phase != Phase::AwaitingAnswer {
            return None;
        }
        self.remaining_seconds = 0;
        Some(self.close_question(true).clone())
    }

    /// Leaves `ShowingFeedback`: next question, or `Completed` after the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` while awaiting an answer and
    /// `SessionError::SessionCompleted` after completion.
    pub fn advance(&mut self) -> Result<Phase, SessionError> {
        match self.phase {
            Phase::Completed => return Err(SessionError::SessionCompleted),
            Phase::AwaitingAnswer => {
                return Err(SessionError::InvalidTransition {
                    operation: "advance",
                    phase: self.phase,
                });
            }
            Phase::ShowingFeedback => {}
        }

        self.feedback = None;
        if self.current + 1 < self.definition.len() {
            self.current += 1;
            self.remaining_seconds = self.definition.per_question_seconds;
            self.phase = Phase::AwaitingAnswer;
        } else {
            self.phase = Phase::Completed;
            self.completed_at = Some(self.clock.now());
        }
        Ok(self.phase)
    }

    /// Per-question outcomes, in question order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionNotComplete` before completion.
    pub fn results(&self) -> Result<Vec<QuestionResult>, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::SessionNotComplete);
        }
        Ok(self
            .definition
            .questions
            .iter()
            .zip(&self.answers)
            .zip(&self.correctness)
            .map(|((question, selected), was_correct)| QuestionResult {
                question: question.clone(),
                selected: *selected,
                was_correct: was_correct.unwrap_or(false),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `SessionError::SessionNotComplete` before completion.
    pub fn report(&self) -> Result<QuizReport, SessionError> {
        let results = self.results()?;
        let completed_at = self.completed_at.ok_or(SessionError::SessionNotComplete)?;
        Ok(QuizReport::new(
            self.definition.title.clone(),
            results,
            self.started_at,
            completed_at,
        ))
    }

    fn ensure_awaiting(&self, operation: &'static str) -> Result<(), SessionError> {
        match self.phase {
            Phase::AwaitingAnswer => Ok(()),
            Phase::Completed => Err(SessionError::SessionCompleted),
            Phase::ShowingFeedback => Err(SessionError::InvalidTransition {
                operation,
                phase: self.phase,
            }),
        }
    }

    fn close_question(&mut self, timed_out: bool) -> &Feedback {
        let question = &self.definition.questions[self.current];
        let feedback = Feedback::for_answer(question, self.answers[self.current], timed_out);
        self.correctness[self.current] = Some(feedback.is_correct);
        self.phase = Phase::ShowingFeedback;
        self.feedback.insert(feedback)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("questions_len", &self.definition.len())
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("answers", &self.answers)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::{frozen_clock, frozen_now};

    fn question(id: u64, correct: usize) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
        )
    }

    /// Three questions, 30 seconds each, correct answers `[1, 1, 2]`.
    fn three_question_quiz() -> QuizDefinition {
        QuizDefinition::new(vec![question(1, 1), question(2, 1), question(3, 2)], 30)
    }

    fn started() -> QuizSession {
        QuizSession::start_with_clock(three_question_quiz(), frozen_clock()).unwrap()
    }

    fn run_out_timer(session: &mut QuizSession) -> Feedback {
        loop {
            if let TickOutcome::Expired(feedback) = session.tick() {
                return feedback;
            }
        }
    }

    #[test]
    fn start_initializes_fresh_state() {
        let session = started();
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answers(), &[None, None, None]);
        assert_eq!(session.remaining_seconds(), 30);
        assert_eq!(session.started_at(), frozen_now());
        assert!(session.feedback().is_none());
    }

    #[test]
    fn start_rejects_empty_quiz() {
        let err = QuizSession::start(QuizDefinition::new(Vec::new(), 30)).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidDefinition(QuizDefinitionError::NoQuestions)
        );
    }

    #[test]
    fn start_rejects_out_of_bounds_correct_index() {
        let def = QuizDefinition::new(vec![question(1, 4)], 30);
        let err = QuizSession::start(def).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidDefinition(QuizDefinitionError::CorrectOptionOutOfRange { .. })
        ));
    }

    #[test]
    fn selection_is_provisional_until_submit() {
        let mut session = started();
        session.select_answer(0).unwrap();
        session.select_answer(3).unwrap();
        assert_eq!(session.selected_answer(), Some(3));
        assert_eq!(session.phase(), Phase::AwaitingAnswer);

        let feedback = session.submit().unwrap();
        assert_eq!(feedback.selected, Some(3));
        assert!(!feedback.is_correct);
        assert_eq!(session.phase(), Phase::ShowingFeedback);
    }

    #[test]
    fn select_out_of_range_is_rejected() {
        let mut session = started();
        assert_eq!(
            session.select_answer(4),
            Err(SessionError::OutOfRange {
                index: 4,
                options: 4
            })
        );
        assert_eq!(session.answers()[0], None);
    }

    #[test]
    fn submit_without_selection_is_rejected() {
        let mut session = started();
        assert_eq!(session.submit().unwrap_err(), SessionError::NoAnswerSelected);
        assert_eq!(session.phase(), Phase::AwaitingAnswer);
    }

    #[test]
    fn operations_during_feedback_are_invalid_transitions() {
        let mut session = started();
        session.select_answer(1).unwrap();
        session.submit().unwrap();

        assert!(matches!(
            session.select_answer(0),
            Err(SessionError::InvalidTransition {
                phase: Phase::ShowingFeedback,
                ..
            })
        ));
        assert!(matches!(
            session.submit(),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert_eq!(session.answers()[0], Some(1));
    }

    #[test]
    fn advance_requires_feedback_phase() {
        let mut session = started();
        assert_eq!(
            session.advance(),
            Err(SessionError::InvalidTransition {
                operation: "advance",
                phase: Phase::AwaitingAnswer
            })
        );
    }

    #[test]
    fn tick_counts_down_and_is_idle_outside_awaiting() {
        let mut session = started();
        assert_eq!(session.tick(), TickOutcome::Counting { remaining: 29 });
        assert_eq!(session.remaining_seconds(), 29);

        session.select_answer(1).unwrap();
        session.submit().unwrap();
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.remaining_seconds(), 29);
    }

    #[test]
    fn timer_resets_on_advance() {
        let mut session = started();
        for _ in 0..10 {
            session.tick();
        }
        session.select_answer(1).unwrap();
        session.submit().unwrap();
        session.advance().unwrap();
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.remaining_seconds(), 30);
    }

    #[test]
    fn expiry_with_selection_submits_it() {
        let mut session = started();
        session.select_answer(1).unwrap();
        let feedback = run_out_timer(&mut session);
        assert!(feedback.is_correct);
        assert!(feedback.timed_out);
        assert_eq!(session.answers()[0], Some(1));
    }

    #[test]
    fn expiry_without_selection_records_unanswered() {
        let mut session = started();
        let feedback = run_out_timer(&mut session);
        assert!(!feedback.is_correct);
        assert_eq!(feedback.selected, None);
        assert_eq!(session.answers()[0], None);
        assert_eq!(session.phase(), Phase::ShowingFeedback);
        assert_eq!(session.remaining_seconds(), 0);
    }

    #[test]
    fn expire_forces_close_once() {
        let mut session = started();
        assert!(session.expire().is_some());
        assert!(session.expire().is_none());
        assert_eq!(session.remaining_seconds(), 0);
    }

    #[test]
    fn progress_strictly_increases_and_ends_at_one() {
        let mut session = started();
        let mut seen = vec![session.progress_fraction()];
        while !session.is_complete() {
            session.select_answer(0).unwrap();
            session.submit().unwrap();
            session.advance().unwrap();
            seen.push(session.progress_fraction());
        }
        // the completed value repeats the last question's value
        let per_question = &seen[..seen.len() - 1];
        assert!(per_question.windows(2).all(|w| w[0] < w[1]));
        assert!(per_question.iter().all(|f| *f > 0.0 && *f <= 1.0));
        assert!((seen[seen.len() - 1] - 1.0).abs() < f64::EPSILON);
        assert_eq!(session.progress().label(), "3/3");
    }

    #[test]
    fn results_unavailable_before_completion() {
        let session = started();
        assert_eq!(session.results(), Err(SessionError::SessionNotComplete));
        assert!(session.report().is_err());
    }

    #[test]
    fn completed_session_rejects_everything_without_mutating() {
        let mut session = started();
        for _ in 0..3 {
            session.select_answer(1).unwrap();
            session.submit().unwrap();
            session.advance().unwrap();
        }
        assert!(session.is_complete());
        let answers_before = session.answers().to_vec();

        assert_eq!(session.select_answer(0), Err(SessionError::SessionCompleted));
        assert_eq!(session.submit().unwrap_err(), SessionError::SessionCompleted);
        assert_eq!(session.advance(), Err(SessionError::SessionCompleted));
        assert_eq!(session.current_question(), Err(SessionError::SessionCompleted));
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert!(session.expire().is_none());
        assert_eq!(session.answers(), answers_before.as_slice());
        assert_eq!(session.phase(), Phase::Completed);
    }

    #[test]
    fn scenario_answers_submitted_immediately() {
        let mut session = started();
        for choice in [1, 0, 2] {
            session.select_answer(choice).unwrap();
            session.submit().unwrap();
            session.advance().unwrap();
        }

        assert_eq!(session.phase(), Phase::Completed);
        let results = session.results().unwrap();
        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.question.id.value(), r.selected, r.was_correct))
            .collect();
        assert_eq!(
            summary,
            vec![(1, Some(1), true), (2, Some(0), false), (3, Some(2), true)]
        );
    }

    #[test]
    fn scenario_all_timers_expire() {
        let mut session = started();
        while !session.is_complete() {
            run_out_timer(&mut session);
            session.advance().unwrap();
        }

        let results = session.results().unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.selected.is_none() && !r.was_correct));
        assert_eq!(session.report().unwrap().score().unanswered, 3);
    }

    #[test]
    fn report_uses_clock_for_completion() {
        let mut session =
            QuizSession::start_with_clock(three_question_quiz().with_title("Mixed"), frozen_clock())
                .unwrap();
        while !session.is_complete() {
            session.select_answer(2).unwrap();
            session.submit().unwrap();
            session.advance().unwrap();
        }
        let report = session.report().unwrap();
        assert_eq!(report.title(), Some("Mixed"));
        assert_eq!(report.completed_at(), frozen_now());
        assert_eq!(report.score().correct, 1);
        assert_eq!(report.score().incorrect, 2);
    }
}
