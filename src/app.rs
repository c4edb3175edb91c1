use std::io::Write;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::ExamContent;
use crate::event::{AppEvent, Ticker};
use crate::exam::{ExamRecord, ExamSession, SessionError, TimerMode, TimerUrgency};
use crate::store::{HistoryStore, KeyValueStore};
use crate::view;

/// One line typed during an exam.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Empty line: show the current question again.
    Show,
    Next,
    Previous,
    /// 1-based question number.
    Goto(u32),
    Answer(char),
    NextPassage,
    PreviousPassage,
    Pause,
    Resume,
    Time,
    Help,
    Submit,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else {
            return Ok(Command::Show);
        };
        let arg = parts.next();
        let command = match (word.to_ascii_lowercase().as_str(), arg) {
            ("n" | "next", None) => Command::Next,
            ("p" | "prev", None) => Command::Previous,
            ("np", None) => Command::NextPassage,
            ("pp", None) => Command::PreviousPassage,
            ("pause", None) => Command::Pause,
            ("resume", None) => Command::Resume,
            ("t" | "time", None) => Command::Time,
            ("h" | "help" | "?", None) => Command::Help,
            ("submit", None) => Command::Submit,
            ("q" | "quit", None) => Command::Quit,
            ("g" | "go", Some(n)) => n
                .parse::<u32>()
                .map(Command::Goto)
                .map_err(|_| format!("not a question number: {n}"))?,
            ("a" | "answer", Some(label)) => {
                let mut chars = label.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphabetic() => Command::Answer(c),
                    _ => return Err(format!("not an option label: {label}")),
                }
            }
            _ => return Err(format!("unknown command: {}", line.trim())),
        };
        if parts.next().is_some() {
            return Err(format!("unexpected arguments: {}", line.trim()));
        }
        Ok(command)
    }
}

/// A submitted attempt and the history id it was saved under.
#[derive(Clone, Debug)]
pub struct SavedResult {
    pub id: Option<i64>,
    pub record: ExamRecord,
}

/// Interactive exam run: owns the session, the tick thread and the history
/// the attempt is saved to.
pub struct App<S: KeyValueStore> {
    pub config: Config,
    pub session: ExamSession,
    pub history: HistoryStore<S>,
    pub last_result: Option<SavedResult>,
    pub should_quit: bool,
    ticker: Option<Ticker>,
    last_urgency: TimerUrgency,
    shown_passage: Option<usize>,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(config: Config, history: HistoryStore<S>) -> Self {
        Self {
            config,
            session: ExamSession::new(),
            history,
            last_result: None,
            should_quit: false,
            ticker: None,
            last_urgency: TimerUrgency::Normal,
            shown_passage: None,
        }
    }

    /// Starts an attempt. With `ticks`, a tick thread feeds that channel
    /// until the attempt ends.
    pub fn start_exam(
        &mut self,
        content: ExamContent,
        mode: TimerMode,
        countdown_minutes: u32,
        ticks: Option<Sender<AppEvent>>,
    ) -> Result<()> {
        self.session.start(content, mode, countdown_minutes)?;
        self.last_result = None;
        self.should_quit = false;
        self.last_urgency = TimerUrgency::Normal;
        self.shown_passage = None;
        self.stop_ticker();
        if let Some(tx) = ticks {
            let interval = Duration::from_millis(self.config.tick_interval_ms);
            self.ticker = Some(Ticker::spawn(interval, tx));
        }
        Ok(())
    }

    pub fn ticker(&self) -> Option<&Ticker> {
        self.ticker.as_ref()
    }

    pub fn handle_event<W: Write>(&mut self, event: AppEvent, out: &mut W) -> Result<()> {
        match event {
            AppEvent::Line(line) => match line.parse::<Command>() {
                Ok(command) => self.handle_command(command, out),
                Err(message) => {
                    writeln!(out, "{message} (h for help)")?;
                    Ok(())
                }
            },
            AppEvent::Tick => self.on_tick(out, Instant::now()),
            AppEvent::InputClosed => {
                if self.session.is_in_progress() {
                    warn!("input closed, attempt discarded");
                }
                self.quit();
                Ok(())
            }
        }
    }

    pub fn handle_command<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        let now = Instant::now();
        let outcome = match command {
            Command::Show => {
                self.show_current(out, true, now)?;
                return Ok(());
            }
            Command::Help => {
                view::write_help(out)?;
                return Ok(());
            }
            Command::Time => {
                view::write_status(out, &self.session, now)?;
                return Ok(());
            }
            Command::Submit => {
                self.submit(out)?;
                return Ok(());
            }
            Command::Quit => {
                info!("exam abandoned");
                self.quit();
                return Ok(());
            }
            Command::Next => self.session.next(),
            Command::Previous => self.session.previous(),
            Command::NextPassage => self.session.next_passage(),
            Command::PreviousPassage => self.session.previous_passage(),
            Command::Goto(number) => {
                let target = self
                    .session
                    .questions()
                    .iter()
                    .position(|q| q.number == number);
                match target {
                    Some(target) => self.session.navigate(target),
                    None => Err(SessionError::UnknownQuestion(number)),
                }
            }
            Command::Answer(label) => self.session.answer_current_at(label, now).map(|()| true),
            Command::Pause => self.session.pause_at(now).inspect(|_| self.sync_ticker()),
            Command::Resume => self.session.resume_at(now).inspect(|_| self.sync_ticker()),
        };

        match outcome {
            Ok(true) => self.show_current(out, false, now)?,
            Ok(false) => view::write_status(out, &self.session, now)?,
            Err(err) => writeln!(out, "{err}")?,
        }
        Ok(())
    }

    /// Prints the current question, with its passage when the cursor has
    /// entered a different passage or `force_passage` is set.
    pub fn show_current<W: Write>(
        &mut self,
        out: &mut W,
        force_passage: bool,
        now: Instant,
    ) -> Result<()> {
        let passage = self.session.current_question().map(|q| q.passage_index);
        let with_passage = force_passage || passage != self.shown_passage;
        self.shown_passage = passage;
        view::write_question(out, &self.session, with_passage, now)?;
        Ok(())
    }

    /// Ticks only announce urgency changes; `t` prints the clock on demand.
    fn on_tick<W: Write>(&mut self, out: &mut W, now: Instant) -> Result<()> {
        if !self.session.is_in_progress() || self.session.is_paused() {
            return Ok(());
        }
        let urgency = self.session.timer_urgency_at(now);
        if urgency != self.last_urgency {
            debug!(?urgency, "timer urgency changed");
            self.last_urgency = urgency;
            let message = match urgency {
                TimerUrgency::Normal => None,
                TimerUrgency::Warning => Some("Less than five minutes left."),
                TimerUrgency::Critical => Some("Less than one minute left."),
                TimerUrgency::Overtime => Some("Time is up. The clock keeps running."),
            };
            if let Some(message) = message {
                writeln!(
                    out,
                    "{} {message}",
                    view::timer_label(&self.session.timer_display_at(now), urgency)
                )?;
            }
        }
        Ok(())
    }

    fn sync_ticker(&self) {
        if let Some(ticker) = &self.ticker {
            if self.session.is_paused() {
                ticker.suspend();
            } else {
                ticker.resume();
            }
        }
    }

    /// Freezes the attempt, saves it to history and prints the results.
    /// A failed save is reported but does not lose the result.
    pub fn submit<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let record = match self.session.submit() {
            Ok(record) => record,
            Err(err) => {
                writeln!(out, "{err}")?;
                return Ok(());
            }
        };
        self.stop_ticker();

        let id = match self.history.save(record.clone()) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "could not save attempt to history");
                writeln!(out, "Could not save this attempt: {err:#}")?;
                None
            }
        };
        view::write_results(out, &record, id)?;
        self.last_result = Some(SavedResult { id, record });
        self.should_quit = true;
        Ok(())
    }

    /// Stops the clock and drops the attempt without saving it.
    pub fn quit(&mut self) {
        self.stop_ticker();
        self.session.reset();
        self.should_quit = true;
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}
