use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use practice_core::model::{AnswerValue, QuestionId, QuestionSetId};
use services::{Clock, PracticeLoopService};
use storage::repository::{QuestionSetRepository, Storage};
use tracing_subscriber::EnvFilter;

mod seed;
mod settings;

use settings::AppSettings;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSetId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidLimit { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSetId { raw } => write!(f, "invalid --set-id value: {raw:?}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed    [--db <sqlite_url>] [--set-id <id>]");
    eprintln!("  cargo run -p app -- run     [--db <sqlite_url>] [--set-id <id>] [--answers <file.json>]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--set-id <id>] [--limit <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {}", settings::DEFAULT_DB_URL);
    eprintln!("  --set-id {}", settings::DEFAULT_SET_ID);
    eprintln!();
    eprintln!("Configuration (lowest to highest precedence):");
    eprintln!("  built-in defaults, practice.toml, PRACTICE_DB_URL / PRACTICE_SET_ID /");
    eprintln!("  PRACTICE_PERSIST_ATTEMPTS / PRACTICE_LOG_FILTER, then flags.");
    eprintln!("  Log filter: PRACTICE_LOG or RUST_LOG override log_filter.");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Run,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "run" => Some(Self::Run),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    set_id: QuestionSetId,
    answers: Option<PathBuf>,
    limit: u32,
}

impl Args {
    fn parse(
        settings: &AppSettings,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = normalize_sqlite_url(settings.db_url.clone());
        let mut set_id = parse_set_id(&settings.set_id)?;
        let mut answers = None;
        let mut limit = 10;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--set-id" => {
                    let value = require_value(args, "--set-id")?;
                    set_id = parse_set_id(&value)?;
                }
                "--answers" => {
                    answers = Some(PathBuf::from(require_value(args, "--answers")?));
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            set_id,
            answers,
            limit,
        })
    }
}

fn parse_set_id(raw: &str) -> Result<QuestionSetId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidSetId {
        raw: raw.to_string(),
    })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:")
    {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing(settings: &AppSettings) {
    let filter = EnvFilter::try_from_env("PRACTICE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_answers(
    path: &std::path::Path,
) -> Result<BTreeMap<QuestionId, AnswerValue>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = AppSettings::load()?;
    init_tracing(&settings);

    let mut argv: Vec<String> = std::env::args().skip(1).collect();
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if argv.first().is_some_and(|first| !first.starts_with("--")) {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&settings, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    tracing::debug!(db_url = %parsed.db_url, command = ?cmd, "storage ready");

    let mut service = PracticeLoopService::new(storage.question_sets.clone())
        .with_clock(Clock::default());
    if settings.persist_attempts {
        service = service.with_attempt_history(storage.attempts.clone());
    }

    match cmd {
        Command::Seed => {
            let set = seed::demo_set(parsed.set_id.as_str());
            storage.question_sets.upsert_question_set(&set).await?;
            tracing::info!(set_id = %set.id, questions = set.len(), "seeded demo question set");
            println!("{}", set.id);
            Ok(())
        }
        Command::Run => {
            let mut session = service.start_session(&parsed.set_id).await?;
            if let Some(path) = &parsed.answers {
                for (question_id, answer) in read_answers(path)? {
                    session.submit_answer(question_id, answer)?;
                }
            }

            let outcome = service.submit(&mut session).await?;
            let diagnostics: Vec<_> = outcome
                .scored
                .diagnostics
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "questionId": d.question_id,
                        "error": d.error.to_string(),
                    })
                })
                .collect();
            let report = serde_json::json!({
                "result": outcome.scored.result,
                "diagnostics": diagnostics,
                "attemptId": outcome.attempt_id,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::History => {
            let rows = service.history(&parsed.set_id, parsed.limit).await?;
            let entries: Vec<_> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "id": row.id,
                        "submittedAt": row.summary.submitted_at().to_rfc3339(),
                        "correctAnswers": row.summary.correct_answers(),
                        "pendingReview": row.summary.pending_review(),
                        "totalQuestions": row.summary.total_questions(),
                        "scorePercentage": row.summary.score_percentage(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
