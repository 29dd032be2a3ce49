#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod runner;
pub mod source;

pub use quiz_core::Clock;

pub use countdown::{Countdown, CountdownObserver};
pub use error::{RunnerError, SourceError};
pub use runner::{QuizEvent, QuizEvents, QuizRunner, QuizRunnerBuilder, SessionSnapshot};
pub use source::{JsonFileSource, QuizSource, StaticQuizSource, sample_quiz, shuffle_questions};
