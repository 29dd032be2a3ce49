//! Async quiz runner.
//!
//! One task owns the `QuizSession`. User commands and timer signals both land in
//! that task, so transitions are applied one at a time and a late timer can never
//! race an answer.

mod driver;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::info;

use quiz_core::evaluator::Feedback;
use quiz_core::model::{Question, QuizDefinition, QuizReport, SessionSettings};
use quiz_core::session::{Phase, QuizSession, SessionProgress};

use crate::Clock;
use crate::error::RunnerError;
use driver::{Command, Driver};

/// Called once with the final report, when the session completes.
pub type CompletionCallback = Box<dyn FnOnce(&QuizReport) + Send + 'static>;

/// What the runner tells the display layer.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizEvent {
    QuestionStarted {
        index: usize,
        question: Question,
        remaining_seconds: u32,
        progress: SessionProgress,
    },
    Tick {
        index: usize,
        remaining_seconds: u32,
    },
    Feedback {
        index: usize,
        feedback: Feedback,
    },
    Completed(QuizReport),
}

/// Stream of `QuizEvent`s for one session. Ends when the runner stops.
pub type QuizEvents = mpsc::UnboundedReceiver<QuizEvent>;

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub current_index: usize,
    pub remaining_seconds: u32,
    pub selected: Option<usize>,
    pub progress: SessionProgress,
}

/// Configures and spawns a `QuizRunner`.
pub struct QuizRunnerBuilder {
    definition: QuizDefinition,
    settings: SessionSettings,
    clock: Clock,
    on_complete: Option<CompletionCallback>,
}

impl QuizRunnerBuilder {
    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Registers the hand-back to the hosting application.
    #[must_use]
    pub fn with_on_complete(
        mut self,
        on_complete: impl FnOnce(&QuizReport) + Send + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    /// Validates the quiz and starts its session task.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Session` wrapping `SessionError::InvalidDefinition`
    /// when the quiz content is malformed.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(self) -> Result<(QuizRunner, QuizEvents), RunnerError> {
        let session = QuizSession::start_with_clock(self.definition, self.clock)?;
        info!(
            questions = session.definition().len(),
            per_question_seconds = session.definition().per_question_seconds,
            "quiz started"
        );

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = watch::channel(None);

        let driver = Driver::new(session, self.settings, event_tx, report_tx, self.on_complete);
        tokio::spawn(driver.run(command_rx));

        Ok((
            QuizRunner {
                commands: command_tx,
                report: report_rx,
            },
            event_rx,
        ))
    }
}

/// Handle to a running quiz session.
///
/// Dropping the handle before completion abandons the session.
#[derive(Debug)]
pub struct QuizRunner {
    commands: mpsc::UnboundedSender<Command>,
    report: watch::Receiver<Option<QuizReport>>,
}

impl QuizRunner {
    #[must_use]
    pub fn builder(definition: QuizDefinition) -> QuizRunnerBuilder {
        QuizRunnerBuilder {
            definition,
            settings: SessionSettings::default(),
            clock: Clock::system(),
            on_complete: None,
        }
    }

    /// Spawns a runner with default settings.
    ///
    /// # Errors
    ///
    /// See [`QuizRunnerBuilder::spawn`].
    pub fn spawn(definition: QuizDefinition) -> Result<(Self, QuizEvents), RunnerError> {
        Self::builder(definition).spawn()
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` when the session refuses the choice and
    /// `RunnerError::Closed` if the runner task is gone.
    pub async fn select_answer(&self, option: usize) -> Result<(), RunnerError> {
        self.request(|reply| Command::Select { option, reply })
            .await??;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Session` when the session refuses the submit and
    /// `RunnerError::Closed` if the runner task is gone.
    pub async fn submit(&self) -> Result<Feedback, RunnerError> {
        Ok(self.request(|reply| Command::Submit { reply }).await??)
    }

    /// # Errors
    ///
    /// Returns `RunnerError::Closed` if the runner task is gone.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, RunnerError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Waits for the session to complete and returns its report.
    ///
    /// # Errors
    ///
    /// Returns `RunnerError::Closed` if the session stopped without completing.
    pub async fn wait(&self) -> Result<QuizReport, RunnerError> {
        let mut report = self.report.clone();
        let done = report
            .wait_for(Option::is_some)
            .await
            .map_err(|_| RunnerError::Closed)?;
        (*done).clone().ok_or(RunnerError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RunnerError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| RunnerError::Closed)?;
        response.await.map_err(|_| RunnerError::Closed)
    }
}
