use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

const CRITICAL_REMAINING_MS: i64 = MS_PER_MINUTE;
const WARNING_REMAINING_MS: i64 = 5 * MS_PER_MINUTE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Count up from zero with no limit.
    #[default]
    Elapsed,
    /// Count down from a budget, then keep going into negative time.
    Countdown,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Elapsed => "elapsed",
            TimerMode::Countdown => "countdown",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elapsed" | "normal" => Ok(TimerMode::Elapsed),
            "countdown" => Ok(TimerMode::Countdown),
            other => Err(format!("unknown timer mode: {other}")),
        }
    }
}

/// How close a countdown is to running out. Elapsed timers are always
/// `Normal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerUrgency {
    Normal,
    /// Under five minutes left.
    Warning,
    /// Under one minute left.
    Critical,
    /// Budget exhausted, the display has gone negative.
    Overtime,
}

/// Start/pause bookkeeping for one exam attempt.
///
/// Pausing never accumulates a separate counter: resuming shifts the start
/// instant forward by the paused span, so elapsed time is always a single
/// subtraction.
#[derive(Clone, Debug, Default)]
pub struct ExamTimer {
    pub mode: TimerMode,
    pub countdown_minutes: u32,
    started_at: Option<Instant>,
    paused: bool,
    pause_started_at: Option<Instant>,
}

impl ExamTimer {
    pub fn new(mode: TimerMode, countdown_minutes: u32) -> Self {
        Self {
            mode,
            countdown_minutes,
            ..Self::default()
        }
    }

    pub fn start_at(&mut self, now: Instant) {
        self.started_at = Some(now);
        self.paused = false;
        self.pause_started_at = None;
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Returns false when already paused.
    pub fn pause_at(&mut self, now: Instant) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        self.pause_started_at = Some(now);
        true
    }

    /// Returns false when not paused.
    pub fn resume_at(&mut self, now: Instant) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        if let (Some(start), Some(pause_start)) = (self.started_at, self.pause_started_at.take()) {
            self.started_at = Some(start + now.saturating_duration_since(pause_start));
        }
        true
    }

    /// Time on the clock, excluding every paused span.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let Some(start) = self.started_at else {
            return Duration::ZERO;
        };
        let reference = match (self.paused, self.pause_started_at) {
            (true, Some(pause_start)) => pause_start,
            _ => now,
        };
        reference.saturating_duration_since(start)
    }

    /// Milliseconds left in a countdown; negative once the budget is spent.
    pub fn remaining_ms_at(&self, now: Instant) -> i64 {
        let budget = i64::from(self.countdown_minutes) * MS_PER_MINUTE;
        budget - duration_ms(self.elapsed_at(now))
    }

    /// The string shown on the live clock and stored as answer timestamps.
    pub fn display_at(&self, now: Instant) -> String {
        if !self.is_started() {
            return format_hms(0);
        }
        match self.mode {
            TimerMode::Elapsed => format_hms(duration_ms(self.elapsed_at(now))),
            TimerMode::Countdown => format_signed_hms(self.remaining_ms_at(now)),
        }
    }

    pub fn urgency_at(&self, now: Instant) -> TimerUrgency {
        if self.mode == TimerMode::Elapsed || !self.is_started() {
            return TimerUrgency::Normal;
        }
        let remaining = self.remaining_ms_at(now);
        if remaining < 0 {
            TimerUrgency::Overtime
        } else if remaining < CRITICAL_REMAINING_MS {
            TimerUrgency::Critical
        } else if remaining < WARNING_REMAINING_MS {
            TimerUrgency::Warning
        } else {
            TimerUrgency::Normal
        }
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// `HH:MM:SS` with hours allowed past 24. Negative input formats as zero.
pub fn format_hms(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Like [`format_hms`] but prefixes `-` for negative values instead of
/// clamping, so an exhausted countdown keeps counting.
pub fn format_signed_hms(ms: i64) -> String {
    if ms < 0 {
        format!("-{}", format_hms(ms.saturating_neg()))
    } else {
        format_hms(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(999), "00:00:00");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(3_600_000 * 27 + 5_000), "27:00:05");
    }

    #[test]
    fn test_format_signed_hms() {
        assert_eq!(format_signed_hms(5_000), "00:00:05");
        assert_eq!(format_signed_hms(-5_000), "-00:00:05");
        assert_eq!(format_signed_hms(-400), "-00:00:00");
    }

    #[test]
    fn test_unstarted_timer_shows_zero() {
        let timer = ExamTimer::new(TimerMode::Countdown, 60);
        assert_eq!(timer.display_at(Instant::now()), "00:00:00");
        assert_eq!(timer.urgency_at(Instant::now()), TimerUrgency::Normal);
    }

    #[test]
    fn test_elapsed_display() {
        let t0 = Instant::now();
        let mut timer = ExamTimer::new(TimerMode::Elapsed, 60);
        timer.start_at(t0);
        assert_eq!(timer.display_at(t0 + secs(3_725)), "01:02:05");
    }

    #[test]
    fn test_countdown_goes_negative() {
        let t0 = Instant::now();
        let mut timer = ExamTimer::new(TimerMode::Countdown, 1);
        timer.start_at(t0);
        assert_eq!(timer.display_at(t0 + secs(20)), "00:00:40");
        assert_eq!(timer.display_at(t0 + secs(65)), "-00:00:05");
        assert_eq!(timer.display_at(t0 + secs(3_700)), "-01:00:40");
    }

    #[test]
    fn test_pause_freezes_and_resume_rebases() {
        let t0 = Instant::now();
        let mut timer = ExamTimer::new(TimerMode::Elapsed, 60);
        timer.start_at(t0);

        assert!(timer.pause_at(t0 + secs(10)));
        assert!(!timer.pause_at(t0 + secs(11)));
        assert_eq!(timer.elapsed_at(t0 + secs(500)), secs(10));

        assert!(timer.resume_at(t0 + secs(40)));
        assert!(!timer.resume_at(t0 + secs(41)));
        assert_eq!(timer.started_at(), Some(t0 + secs(30)));
        assert_eq!(timer.elapsed_at(t0 + secs(45)), secs(15));
    }

    #[test]
    fn test_elapsed_excludes_all_paused_intervals() {
        let t0 = Instant::now();
        let mut timer = ExamTimer::new(TimerMode::Elapsed, 60);
        timer.start_at(t0);

        let pauses = [(5, 12), (20, 21), (30, 90)];
        let paused_total: u64 = pauses.iter().map(|(a, b)| b - a).sum();
        for (from, to) in pauses {
            timer.pause_at(t0 + secs(from));
            timer.resume_at(t0 + secs(to));
        }

        let now = t0 + secs(200);
        assert_eq!(timer.elapsed_at(now), secs(200 - paused_total));
    }

    #[test]
    fn test_countdown_display_while_paused() {
        let t0 = Instant::now();
        let mut timer = ExamTimer::new(TimerMode::Countdown, 1);
        timer.start_at(t0);
        timer.pause_at(t0 + secs(30));
        assert_eq!(timer.display_at(t0 + secs(600)), "00:00:30");
    }

    #[test]
    fn test_urgency_thresholds() {
        let t0 = Instant::now();
        let mut timer = ExamTimer::new(TimerMode::Countdown, 10);
        timer.start_at(t0);
        assert_eq!(timer.urgency_at(t0 + secs(60)), TimerUrgency::Normal);
        assert_eq!(timer.urgency_at(t0 + secs(6 * 60)), TimerUrgency::Warning);
        assert_eq!(timer.urgency_at(t0 + secs(9 * 60 + 30)), TimerUrgency::Critical);
        assert_eq!(timer.urgency_at(t0 + secs(10 * 60 + 1)), TimerUrgency::Overtime);

        let mut elapsed = ExamTimer::new(TimerMode::Elapsed, 10);
        elapsed.start_at(t0);
        assert_eq!(elapsed.urgency_at(t0 + secs(100_000)), TimerUrgency::Normal);
    }

    #[test]
    fn test_timer_mode_parsing() {
        assert_eq!("countdown".parse::<TimerMode>(), Ok(TimerMode::Countdown));
        assert_eq!("Elapsed".parse::<TimerMode>(), Ok(TimerMode::Elapsed));
        assert_eq!("normal".parse::<TimerMode>(), Ok(TimerMode::Elapsed));
        assert!("sideways".parse::<TimerMode>().is_err());
    }
}
