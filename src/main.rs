use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use readex::app::App;
use readex::config::Config;
use readex::convert::{AutoConverter, CommandConverter};
use readex::document::{ExamContent, load_documents};
use readex::event::EventHandler;
use readex::exam::{ReviewCursor, TimerMode};
use readex::store::{HistoryStore, JsonStore};
use readex::view;

const LOG_ENV: &str = "READEX_LOG";

#[derive(Parser)]
#[command(name = "readex", version, about = "Timed reading exams built from Word documents")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an exam made from one or more documents, in order
    Exam {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Count down from this many minutes
        #[arg(long, value_name = "MIN", conflicts_with = "elapsed")]
        countdown: Option<u32>,

        /// Count up with no time limit
        #[arg(long)]
        elapsed: bool,
    },
    /// Print the passages and questions found in the documents as JSON
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Saved attempts
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List attempts, newest first
    List,
    /// Review one attempt, a passage at a time
    Show {
        id: i64,
        /// Passage to show, starting at 1
        #[arg(long, default_value_t = 1)]
        passage: usize,
    },
    /// Give an attempt a custom title
    Rename { id: i64, title: String },
    /// Delete every saved attempt
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().unwrap_or_else(|err| {
        warn!(error = %err, "config unreadable, using defaults");
        Config::default()
    });
    debug!(?config, "config loaded");

    match cli.command {
        Commands::Exam {
            files,
            countdown,
            elapsed,
        } => {
            let (mode, minutes) = timer_settings(&config, countdown, elapsed);
            run_exam(config, &files, mode, minutes)
        }
        Commands::Inspect { files } => {
            let content = load(&config, &files)?;
            println!("{}", serde_json::to_string_pretty(&content)?);
            Ok(())
        }
        Commands::History { action } => run_history(&config, action),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // READEX_LOG wins over -v when set.
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},readex={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Command-line flags beat the config file.
fn timer_settings(config: &Config, countdown: Option<u32>, elapsed: bool) -> (TimerMode, u32) {
    match (countdown, elapsed) {
        (Some(minutes), _) => (TimerMode::Countdown, minutes.max(1)),
        (None, true) => (TimerMode::Elapsed, config.countdown_minutes),
        (None, false) => (config.timer_mode, config.countdown_minutes),
    }
}

fn load(config: &Config, files: &[PathBuf]) -> Result<ExamContent> {
    let converter = AutoConverter::new(CommandConverter::new(
        config.converter_program.clone(),
        config.converter_args.clone(),
    ));
    let content = load_documents(files, &converter)?;
    info!(
        documents = files.len(),
        passages = content.passages.len(),
        questions = content.questions.len(),
        "documents loaded"
    );
    Ok(content)
}

fn history_store(config: &Config) -> Result<HistoryStore<JsonStore>> {
    let store = JsonStore::with_base_dir(config.data_dir())?;
    Ok(HistoryStore::new(store))
}

fn run_exam(config: Config, files: &[PathBuf], mode: TimerMode, minutes: u32) -> Result<()> {
    let content = load(&config, files)?;
    if content.is_empty() {
        bail!("no questions were found in the given documents");
    }
    let history = history_store(&config)?;

    let events = EventHandler::new();
    let mut app = App::new(config, history);
    app.start_exam(content, mode, minutes, Some(events.sender()))?;

    let mut stdout = io::stdout();
    match mode {
        TimerMode::Elapsed => writeln!(stdout, "Exam started. Type h for help.")?,
        TimerMode::Countdown => {
            writeln!(stdout, "Exam started, {minutes} minutes. Type h for help.")?
        }
    }
    app.show_current(&mut stdout, true, Instant::now())?;
    stdout.flush()?;

    while !app.should_quit {
        let event = events.next()?;
        app.handle_event(event, &mut stdout)?;
        stdout.flush()?;
    }
    Ok(())
}

fn run_history(config: &Config, action: HistoryAction) -> Result<()> {
    let mut history = history_store(config)?;
    let mut stdout = io::stdout().lock();

    match action {
        HistoryAction::List => view::write_history_list(&mut stdout, &history.list())?,
        HistoryAction::Show { id, passage } => {
            if passage == 0 {
                bail!("passages are numbered from 1");
            }
            let entry = history
                .get(id)
                .ok_or_else(|| anyhow!("no history entry with id {id}"))?;
            writeln!(
                stdout,
                "{}  {}  {}/{} answered in {}\n",
                entry.display_title(),
                entry.record.date.format("%Y-%m-%d %H:%M"),
                entry.record.answered,
                entry.record.total,
                entry.record.time
            )?;
            let cursor = ReviewCursor::at_passage(&entry.record, passage - 1);
            view::write_review(&mut stdout, &cursor)?;
        }
        HistoryAction::Rename { id, title } => {
            if !history.rename(id, &title)? {
                bail!("nothing renamed: unknown id {id} or blank title");
            }
            writeln!(stdout, "Renamed {id}.")?;
        }
        HistoryAction::Clear { yes } => {
            if !yes && !confirm(&mut stdout, "Delete every saved attempt?")? {
                return Ok(());
            }
            history.clear()?;
            writeln!(stdout, "History cleared.")?;
        }
    }
    Ok(())
}

fn confirm<W: Write>(out: &mut W, question: &str) -> Result<bool> {
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
