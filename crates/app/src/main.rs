use std::fmt;
use std::path::PathBuf;

use quiz_core::evaluator::{OptionMark, option_label, option_marks};
use quiz_core::model::{Question, QuestionId, QuizDefinition, QuizReport, SessionSettings};
use rand::Rng;
use services::{JsonFileSource, QuizEvent, QuizRunner, QuizSource, sample_quiz, shuffle_questions};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

/// Options are chosen by letter, so a question can offer at most `A`..=`Z`.
const MAX_PLAYABLE_OPTIONS: usize = 26;

#[derive(Debug)]
enum PlayError {
    TooManyOptions { question: QuestionId, options: usize },
}

impl fmt::Display for PlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayError::TooManyOptions { question, options } => write!(
                f,
                "question {question} has {options} options, the terminal can offer at most {MAX_PLAYABLE_OPTIONS}"
            ),
        }
    }
}

impl std::error::Error for PlayError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- play [--quiz <file.json>] [--seconds <n>] [--feedback-ms <n>] [--shuffle]"
    );
    eprintln!();
    eprintln!("Defaults for play:");
    eprintln!("  built-in warm-up quiz, 30 s per question, 1500 ms feedback");
    eprintln!();
    eprintln!("While playing:");
    eprintln!("  a letter selects an option, an empty line submits, :q quits");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BUFLY_QUIZ_PATH, BUFLY_QUESTION_SECONDS, BUFLY_FEEDBACK_MS, RUST_LOG");
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PlayArgs {
    quiz_path: Option<PathBuf>,
    seconds: Option<u32>,
    feedback_ms: Option<u32>,
    shuffle: bool,
}

impl PlayArgs {
    fn from_env() -> Self {
        let number = |key: &str| {
            std::env::var(key)
                .ok()
                .and_then(|value| value.trim().parse::<u32>().ok())
        };
        Self {
            quiz_path: std::env::var_os("BUFLY_QUIZ_PATH").map(PathBuf::from),
            seconds: number("BUFLY_QUESTION_SECONDS"),
            feedback_ms: number("BUFLY_FEEDBACK_MS"),
            shuffle: false,
        }
    }

    /// Flags win over environment defaults.
    fn apply_flags(
        mut self,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Parsed, ArgsError> {
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quiz" => self.quiz_path = Some(require_value(args, "--quiz")?.into()),
                "--seconds" => {
                    let value = require_value(args, "--seconds")?;
                    self.seconds = Some(parse_number("--seconds", value)?);
                }
                "--feedback-ms" => {
                    let value = require_value(args, "--feedback-ms")?;
                    self.feedback_ms = Some(parse_number("--feedback-ms", value)?);
                }
                "--shuffle" => self.shuffle = true,
                "--help" | "-h" => return Ok(Parsed::Help),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(Parsed::Play(self))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Parsed {
    Play(PlayArgs),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Select(usize),
    Submit,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Submit;
    }
    if trimmed.eq_ignore_ascii_case(":q") {
        return Input::Quit;
    }
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => {
            let upper = letter.to_ascii_uppercase();
            Input::Select(usize::from(upper as u8 - b'A'))
        }
        _ => Input::Unknown(trimmed.to_owned()),
    }
}

async fn load_quiz(args: &PlayArgs) -> Result<QuizDefinition, Box<dyn std::error::Error>> {
    let definition = match &args.quiz_path {
        Some(path) => JsonFileSource::new(path).load().await?,
        None => sample_quiz(),
    };
    Ok(prepare_quiz(definition, args, &mut rand::rng())?)
}

/// Applies the command-line overrides and checks every question fits the keyboard.
fn prepare_quiz<R: Rng + ?Sized>(
    mut definition: QuizDefinition,
    args: &PlayArgs,
    rng: &mut R,
) -> Result<QuizDefinition, PlayError> {
    if let Some(question) = definition
        .questions
        .iter()
        .find(|q| q.option_count() > MAX_PLAYABLE_OPTIONS)
    {
        return Err(PlayError::TooManyOptions {
            question: question.id,
            options: question.option_count(),
        });
    }
    if let Some(seconds) = args.seconds {
        definition.per_question_seconds = seconds;
    }
    if args.shuffle {
        shuffle_questions(&mut definition, rng);
    }
    Ok(definition)
}

fn mark_symbol(mark: OptionMark) -> char {
    match mark {
        OptionMark::Correct => '+',
        OptionMark::Incorrect => 'x',
        OptionMark::Neutral => ' ',
    }
}

fn should_announce(remaining_seconds: u32) -> bool {
    remaining_seconds > 0 && (remaining_seconds <= 5 || remaining_seconds % 5 == 0)
}

/// Prints one runner event. Returns the report once the quiz is over.
fn render(event: QuizEvent, current: &mut Option<Question>) -> Option<QuizReport> {
    match event {
        QuizEvent::QuestionStarted {
            question,
            remaining_seconds,
            progress,
            ..
        } => {
            println!();
            println!(
                "Question {} ({}%), {remaining_seconds} s",
                progress.label(),
                progress.percent()
            );
            println!("{}", question.text);
            for (index, option) in question.options.iter().enumerate() {
                println!("  {}) {option}", option_label(index));
            }
            *current = Some(question);
        }
        QuizEvent::Tick {
            remaining_seconds, ..
        } => {
            if should_announce(remaining_seconds) {
                println!("  {remaining_seconds} s left");
            }
        }
        QuizEvent::Feedback { feedback, .. } => {
            println!("{}", feedback.message());
            if let Some(question) = current.as_ref() {
                let marks = option_marks(question, feedback.selected);
                for (index, (option, mark)) in question.options.iter().zip(marks).enumerate() {
                    println!("  {} {}) {option}", mark_symbol(mark), option_label(index));
                }
            }
        }
        QuizEvent::Completed(report) => return Some(report),
    }
    None
}

fn print_report(report: &QuizReport) {
    let score = report.score();
    println!();
    if let Some(title) = report.title() {
        println!("{title}: finished");
    }
    println!(
        "Score: {}/{} ({}%), {} wrong, {} unanswered, {} s",
        score.correct,
        score.total,
        score.percent(),
        score.incorrect,
        score.unanswered,
        report.elapsed().num_seconds()
    );
    for (index, result) in report.results().iter().enumerate() {
        let answer = result
            .selected
            .map_or_else(|| "-".to_owned(), |i| option_label(i).to_string());
        let verdict = if result.was_correct { "correct" } else { "wrong" };
        println!("  {}. {} [{answer}] {verdict}", index + 1, result.question.text);
    }
}

async fn play(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let definition = load_quiz(&args).await?;
    let settings = match args.feedback_ms {
        Some(ms) => SessionSettings::new(ms)?,
        None => SessionSettings::default(),
    };

    let (runner, mut events) = QuizRunner::builder(definition)
        .with_settings(settings)
        .spawn()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut current = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                if let Some(report) = render(event, &mut current) {
                    print_report(&report);
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    // Piped input ran out; let the timers finish the quiz.
                    info!("stdin closed, remaining questions will time out");
                    stdin_open = false;
                    continue;
                };
                match parse_input(&line) {
                    Input::Select(option) => match runner.select_answer(option).await {
                        Ok(()) => println!("  selected {}", option_label(option)),
                        Err(err) => println!("  {err}"),
                    },
                    Input::Submit => {
                        if let Err(err) = runner.submit().await {
                            println!("  {err}");
                        }
                    }
                    Input::Quit => {
                        println!("Quiz abandoned.");
                        break;
                    }
                    Input::Unknown(raw) => {
                        println!("  {raw:?}: type a letter, an empty line to submit, :q to quit");
                    }
                }
            }
        }
    }

    drop(runner);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1).peekable();

    // `play` is the only command; it may be omitted.
    match argv.peek().map(String::as_str) {
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some("play") => {
            argv.next();
        }
        Some(first) if !first.starts_with("--") => {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            return Err(
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand").into(),
            );
        }
        _ => {}
    }

    let parsed = PlayArgs::from_env().apply_flags(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match parsed {
        Parsed::Play(args) => play(args).await,
        Parsed::Help => {
            print_usage();
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
