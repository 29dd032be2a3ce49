use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use quiz_core::evaluator::Feedback;
use quiz_core::model::{QuizReport, SessionSettings};
use quiz_core::session::{Phase, QuizSession, SessionError, TickOutcome};

use super::{CompletionCallback, QuizEvent, SessionSnapshot};
use crate::countdown::Countdown;

pub(crate) enum Command {
    Select {
        option: usize,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Submit {
        reply: oneshot::Sender<Result<Feedback, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

// Timer-side input, tagged with the question it was armed for.
enum Signal {
    Tick { index: usize, remaining: u32 },
    Expired { index: usize },
    FeedbackElapsed { index: usize },
}

pub(super) struct Driver {
    session: QuizSession,
    settings: SessionSettings,
    events: mpsc::UnboundedSender<QuizEvent>,
    report: watch::Sender<Option<QuizReport>>,
    on_complete: Option<CompletionCallback>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: mpsc::UnboundedReceiver<Signal>,
    countdown: Option<Countdown>,
    feedback_delay: Option<JoinHandle<()>>,
}

impl Driver {
    pub(super) fn new(
        session: QuizSession,
        settings: SessionSettings,
        events: mpsc::UnboundedSender<QuizEvent>,
        report: watch::Sender<Option<QuizReport>>,
        on_complete: Option<CompletionCallback>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            session,
            settings,
            events,
            report,
            on_complete,
            signal_tx,
            signal_rx,
            countdown: None,
            feedback_delay: None,
        }
    }

    pub(super) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        self.begin_question();

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.handle_command(command);
                }
                Some(signal) = self.signal_rx.recv() => self.handle_signal(signal),
            }
        }

        self.stop_timers();
        if self.session.is_complete() {
            debug!("quiz runner closed");
        } else {
            info!(
                index = self.session.current_index(),
                "quiz abandoned before completion"
            );
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Select { option, reply } => {
                let result = self.session.select_answer(option);
                match &result {
                    Ok(()) => debug!(index = self.session.current_index(), option, "answer selected"),
                    Err(err) => debug!(%err, option, "selection refused"),
                }
                let _ = reply.send(result);
            }
            Command::Submit { reply } => {
                let result = self.session.submit().cloned();
                if let Ok(feedback) = &result {
                    self.show_feedback(feedback.clone());
                }
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Tick { index, remaining } => {
                if !self.is_live(index, Phase::AwaitingAnswer) {
                    trace!(index, remaining, "stale tick dropped");
                    return;
                }
                match self.session.tick() {
                    TickOutcome::Counting { remaining } => {
                        self.emit(QuizEvent::Tick {
                            index,
                            remaining_seconds: remaining,
                        });
                    }
                    TickOutcome::Expired(feedback) => {
                        self.emit(QuizEvent::Tick {
                            index,
                            remaining_seconds: 0,
                        });
                        self.show_feedback(feedback);
                    }
                    TickOutcome::Idle => {}
                }
            }
            Signal::Expired { index } => {
                if !self.is_live(index, Phase::AwaitingAnswer) {
                    trace!(index, "stale expiry dropped");
                    return;
                }
                if let Some(feedback) = self.session.expire() {
                    self.show_feedback(feedback);
                }
            }
            Signal::FeedbackElapsed { index } => {
                if !self.is_live(index, Phase::ShowingFeedback) {
                    trace!(index, "stale feedback delay dropped");
                    return;
                }
                self.feedback_delay = None;
                match self.session.advance() {
                    Ok(Phase::Completed) => self.finish(),
                    Ok(_) => self.begin_question(),
                    Err(err) => warn!(%err, "quiz could not advance"),
                }
            }
        }
    }

    fn begin_question(&mut self) {
        let index = self.session.current_index();
        let Ok(question) = self.session.current_question() else {
            return;
        };
        let question = question.clone();
        let seconds = self.session.remaining_seconds();
        debug!(index, question_id = %question.id, seconds, "question started");

        self.emit(QuizEvent::QuestionStarted {
            index,
            question,
            remaining_seconds: seconds,
            progress: self.session.progress(),
        });

        let tick_tx = self.signal_tx.clone();
        let expire_tx = self.signal_tx.clone();
        self.countdown = Some(Countdown::start(
            seconds,
            move |remaining| {
                let _ = tick_tx.send(Signal::Tick { index, remaining });
            },
            move || {
                let _ = expire_tx.send(Signal::Expired { index });
            },
        ));
    }

    fn show_feedback(&mut self, feedback: Feedback) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
        }

        let index = self.session.current_index();
        debug!(
            index,
            correct = feedback.is_correct,
            timed_out = feedback.timed_out,
            "showing feedback"
        );
        self.emit(QuizEvent::Feedback { index, feedback });

        let delay = self.settings.feedback_display();
        let tx = self.signal_tx.clone();
        self.feedback_delay = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Signal::FeedbackElapsed { index });
        }));
    }

    fn finish(&mut self) {
        let report = match self.session.report() {
            Ok(report) => report,
            Err(err) => {
                warn!(%err, "completed quiz has no report");
                return;
            }
        };
        let score = report.score();
        info!(
            correct = score.correct,
            incorrect = score.incorrect,
            unanswered = score.unanswered,
            total = score.total,
            "quiz completed"
        );

        self.emit(QuizEvent::Completed(report.clone()));
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(&report);
        }
        self.report.send_replace(Some(report));
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.session.phase(),
            current_index: self.session.current_index(),
            remaining_seconds: self.session.remaining_seconds(),
            selected: self.session.selected_answer(),
            progress: self.session.progress(),
        }
    }

    fn is_live(&self, index: usize, phase: Phase) -> bool {
        self.session.current_index() == index && self.session.phase() == phase
    }

    fn emit(&self, event: QuizEvent) {
        // Nobody listening is fine; the session still runs to completion.
        let _ = self.events.send(event);
    }

    fn stop_timers(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
        }
        if let Some(delay) = self.feedback_delay.take() {
            delay.abort();
        }
    }
}
