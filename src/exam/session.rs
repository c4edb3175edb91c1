use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{ExamContent, Passage, Question};
use crate::exam::record::ExamRecord;
use crate::exam::timer::{ExamTimer, TimerMode, TimerUrgency, format_hms};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExamPhase {
    #[default]
    Idle,
    InProgress,
    Submitted,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no exam is in progress")]
    NotInProgress,
    #[error("an exam is already loaded; reset it first")]
    AlreadyStarted,
    #[error("no questions were found in the documents")]
    NoQuestions,
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(u32),
    #[error("question {number} has no option {label}")]
    UnknownOption { number: u32, label: char },
}

/// Runtime state of one exam attempt.
///
/// `Idle -> InProgress -> Submitted`, with `reset` returning to `Idle` from
/// anywhere. Pausing is a flag on `InProgress`: it stops the clock but
/// navigation and answering stay available.
#[derive(Debug, Default)]
pub struct ExamSession {
    phase: ExamPhase,
    content: ExamContent,
    answers: BTreeMap<u32, char>,
    answer_timestamps: BTreeMap<u32, String>,
    current_index: usize,
    timer: ExamTimer,
}

impl ExamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ExamPhase {
        self.phase
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == ExamPhase::InProgress
    }

    pub fn is_paused(&self) -> bool {
        self.timer.is_paused()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.content.passages
    }

    pub fn questions(&self) -> &[Question] {
        &self.content.questions
    }

    pub fn filenames(&self) -> &[String] {
        &self.content.filenames
    }

    pub fn answers(&self) -> &BTreeMap<u32, char> {
        &self.answers
    }

    pub fn answer_timestamps(&self) -> &BTreeMap<u32, String> {
        &self.answer_timestamps
    }

    pub fn answer_for(&self, number: u32) -> Option<char> {
        self.answers.get(&number).copied()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.content.questions.get(self.current_index)
    }

    pub fn current_passage(&self) -> Option<&Passage> {
        let question = self.current_question()?;
        self.content.passages.get(question.passage_index)
    }

    pub fn total(&self) -> usize {
        self.content.questions.len()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn start(
        &mut self,
        content: ExamContent,
        timer_mode: TimerMode,
        countdown_minutes: u32,
    ) -> Result<(), SessionError> {
        self.start_at(content, timer_mode, countdown_minutes, Instant::now())
    }

    pub fn start_at(
        &mut self,
        content: ExamContent,
        timer_mode: TimerMode,
        countdown_minutes: u32,
        now: Instant,
    ) -> Result<(), SessionError> {
        if self.phase != ExamPhase::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        if content.questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        info!(
            questions = content.questions.len(),
            passages = content.passages.len(),
            mode = %timer_mode,
            "exam started"
        );
        self.content = content;
        self.answers.clear();
        self.answer_timestamps.clear();
        self.current_index = 0;
        self.timer = ExamTimer::new(timer_mode, countdown_minutes);
        self.timer.start_at(now);
        self.phase = ExamPhase::InProgress;
        Ok(())
    }

    pub fn select_answer(&mut self, number: u32, label: char) -> Result<(), SessionError> {
        self.select_answer_at(number, label, Instant::now())
    }

    /// Records `label` for question `number`, replacing any earlier choice,
    /// and stamps it with the clock reading at this moment.
    pub fn select_answer_at(
        &mut self,
        number: u32,
        label: char,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let label = label.to_ascii_uppercase();
        let question = self
            .content
            .questions
            .iter()
            .find(|q| q.number == number)
            .ok_or(SessionError::UnknownQuestion(number))?;
        if !question.has_option(label) {
            return Err(SessionError::UnknownOption { number, label });
        }

        let stamp = self.timer.display_at(now);
        debug!(number, %label, at = %stamp, "answer selected");
        self.answers.insert(number, label);
        self.answer_timestamps.insert(number, stamp);
        Ok(())
    }

    /// Answers the question under the cursor.
    pub fn answer_current_at(&mut self, label: char, now: Instant) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let number = self
            .current_question()
            .map(|q| q.number)
            .ok_or(SessionError::NoQuestions)?;
        self.select_answer_at(number, label, now)
    }

    /// Moves the cursor. Out-of-range targets are ignored; returns whether
    /// the cursor moved.
    pub fn navigate(&mut self, target: usize) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        if target >= self.content.questions.len() || target == self.current_index {
            return Ok(false);
        }
        self.current_index = target;
        Ok(true)
    }

    pub fn next(&mut self) -> Result<bool, SessionError> {
        self.navigate(self.current_index + 1)
    }

    pub fn previous(&mut self) -> Result<bool, SessionError> {
        match self.current_index.checked_sub(1) {
            Some(target) => self.navigate(target),
            None => self.ensure_in_progress().map(|()| false),
        }
    }

    /// Jumps to the first question of the following passage.
    pub fn next_passage(&mut self) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        match self.current_question().map(|q| q.passage_index) {
            Some(index) if index + 1 < self.content.passages.len() => {
                self.jump_to_passage(index + 1)
            }
            _ => Ok(false),
        }
    }

    /// Jumps to the first question of the preceding passage.
    pub fn previous_passage(&mut self) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        match self.current_question().map(|q| q.passage_index) {
            Some(index) if index > 0 => self.jump_to_passage(index - 1),
            _ => Ok(false),
        }
    }

    fn jump_to_passage(&mut self, passage_index: usize) -> Result<bool, SessionError> {
        match self
            .content
            .questions
            .iter()
            .position(|q| q.passage_index == passage_index)
        {
            Some(target) => self.navigate(target),
            None => Ok(false),
        }
    }

    pub fn pause(&mut self) -> Result<bool, SessionError> {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&mut self, now: Instant) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        let changed = self.timer.pause_at(now);
        if changed {
            info!("exam paused");
        }
        Ok(changed)
    }

    pub fn resume(&mut self) -> Result<bool, SessionError> {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&mut self, now: Instant) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        let changed = self.timer.resume_at(now);
        if changed {
            info!("exam resumed");
        }
        Ok(changed)
    }

    /// Pauses a running clock or resumes a paused one. Returns the new
    /// paused state.
    pub fn toggle_pause_at(&mut self, now: Instant) -> Result<bool, SessionError> {
        if self.is_paused() {
            self.resume_at(now)?;
        } else {
            self.pause_at(now)?;
        }
        Ok(self.is_paused())
    }

    pub fn timer_display(&self) -> String {
        self.timer_display_at(Instant::now())
    }

    pub fn timer_display_at(&self, now: Instant) -> String {
        self.timer.display_at(now)
    }

    pub fn timer_urgency_at(&self, now: Instant) -> TimerUrgency {
        self.timer.urgency_at(now)
    }

    pub fn submit(&mut self) -> Result<ExamRecord, SessionError> {
        self.submit_at(Instant::now())
    }

    /// Ends the attempt and returns a deep copy of everything it produced.
    /// The session keeps its data (read-only) until `reset`.
    pub fn submit_at(&mut self, now: Instant) -> Result<ExamRecord, SessionError> {
        self.ensure_in_progress()?;
        let elapsed = self.timer.elapsed_at(now);
        let time = format_hms(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));

        let record = ExamRecord {
            total: self.total(),
            answered: self.answered_count(),
            time,
            passages: self.content.passages.clone(),
            questions: self.content.questions.clone(),
            filenames: self.content.filenames.clone(),
            answers: self.answers.clone(),
            answer_timestamps: self.answer_timestamps.clone(),
            date: Utc::now(),
        };
        self.phase = ExamPhase::Submitted;
        info!(
            total = record.total,
            answered = record.answered,
            time = %record.time,
            "exam submitted"
        );
        Ok(record)
    }

    /// Drops everything and returns to a fresh idle session.
    pub fn reset(&mut self) {
        if self.phase != ExamPhase::Idle {
            debug!(phase = ?self.phase, "session reset");
        }
        *self = Self::default();
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.phase == ExamPhase::InProgress {
            Ok(())
        } else {
            Err(SessionError::NotInProgress)
        }
    }
}
