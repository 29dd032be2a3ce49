//! Answer evaluation and the feedback derived from it.
//!
//! Everything here is pure: no session state, no timers.

use crate::model::{Question, QuestionId};

/// Returns true only when an option was selected and it is the correct one.
#[must_use]
pub fn evaluate(question: &Question, selected: Option<usize>) -> bool {
    selected.is_some_and(|index| index == question.correct_option_index)
}

/// Letter shown next to an option: `A`, `B`, `C`, ...
///
/// Past `Z` the label wraps to `?`; single-choice content never gets that long.
#[must_use]
pub fn option_label(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map_or('?', |i| char::from(b'A' + i))
}

/// How a single option should be highlighted while feedback is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// The right answer, always revealed.
    Correct,
    /// The learner picked this and it is wrong.
    Incorrect,
    Neutral,
}

/// Marks every option of `question` for the feedback view.
#[must_use]
pub fn option_marks(question: &Question, selected: Option<usize>) -> Vec<OptionMark> {
    (0..question.option_count())
        .map(|index| {
            if index == question.correct_option_index {
                OptionMark::Correct
            } else if selected == Some(index) {
                OptionMark::Incorrect
            } else {
                OptionMark::Neutral
            }
        })
        .collect()
}

/// Result of evaluating the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub question_id: QuestionId,
    pub selected: Option<usize>,
    pub correct_option: usize,
    pub is_correct: bool,
    /// Set when the countdown, not the learner, ended the question.
    pub timed_out: bool,
}

impl Feedback {
    #[must_use]
    pub fn for_answer(question: &Question, selected: Option<usize>, timed_out: bool) -> Self {
        Self {
            question_id: question.id,
            selected,
            correct_option: question.correct_option_index,
            is_correct: evaluate(question, selected),
            timed_out,
        }
    }

    /// Short encouraging line shown under the options.
    #[must_use]
    pub fn message(&self) -> String {
        let verdict = if self.is_correct {
            "Well done! That's the right answer!"
        } else {
            "Not quite. Try again on the next one."
        };
        if self.timed_out && self.selected.is_none() {
            format!("Time's up! {verdict}")
        } else {
            verdict.to_owned()
        }
    }
}
