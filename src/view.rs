//! Plain-terminal rendering of questions, results and history.
//!
//! Everything writes to a caller-supplied `Write` so the same code serves
//! stdout and tests. Colour goes through crossterm's `Stylize`, which drops
//! the escapes when `NO_COLOR` is set.

use std::io::{self, Write};
use std::time::Instant;

use crossterm::style::{StyledContent, Stylize};

use crate::document::markup::{Block, parse_blocks};
use crate::exam::{AnswerRow, ExamRecord, ExamSession, ReviewCursor, TimerUrgency};
use crate::store::HistoryEntry;

const IMAGE_MARKER: &str = "[image]";

pub fn timer_label(display: &str, urgency: TimerUrgency) -> StyledContent<String> {
    let text = display.to_string();
    match urgency {
        TimerUrgency::Normal => text.green(),
        TimerUrgency::Warning => text.yellow(),
        TimerUrgency::Critical => text.red(),
        TimerUrgency::Overtime => text.red().bold(),
    }
}

/// One readable line per top-level block of `markup`.
pub fn markup_lines(markup: &str) -> Vec<String> {
    let blocks = parse_blocks(markup).unwrap_or_default();
    if blocks.is_empty() && !markup.trim().is_empty() {
        return vec![inline_text(markup)];
    }
    blocks
        .iter()
        .map(block_line)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Text of an inline fragment such as a question stem or option.
pub fn inline_text(markup: &str) -> String {
    block_line(&Block::paragraph(markup))
}

fn block_line(block: &Block) -> String {
    let text = block.trimmed_text();
    match (block.has_image, text.is_empty()) {
        (true, true) => IMAGE_MARKER.to_string(),
        (true, false) => format!("{text} {IMAGE_MARKER}"),
        (false, _) => text.to_string(),
    }
}

pub fn write_status<W: Write>(out: &mut W, session: &ExamSession, now: Instant) -> io::Result<()> {
    let clock = timer_label(
        &session.timer_display_at(now),
        session.timer_urgency_at(now),
    );
    let paused = if session.is_paused() {
        format!(" {}", "[paused]".dark_grey())
    } else {
        String::new()
    };
    writeln!(
        out,
        "{clock}{paused}  answered {}/{}",
        session.answered_count(),
        session.total()
    )
}

/// The question under the cursor, optionally preceded by its passage.
pub fn write_question<W: Write>(
    out: &mut W,
    session: &ExamSession,
    with_passage: bool,
    now: Instant,
) -> io::Result<()> {
    let Some(question) = session.current_question() else {
        return writeln!(out, "No questions loaded.");
    };

    if let Some(passage) = session.current_passage().filter(|_| with_passage) {
        let heading = if session.passages().len() > 1 {
            format!("Reading {} / {}", passage.index + 1, session.passages().len())
        } else {
            "Reading".to_string()
        };
        writeln!(
            out,
            "\n{} (questions {}-{})",
            heading.bold(),
            passage.start_question,
            passage.end_question
        )?;
        for line in markup_lines(&passage.content) {
            writeln!(out, "  {line}")?;
        }
        writeln!(out)?;
    }

    let selected = session.answer_for(question.number);
    let mut stem = markup_lines(&question.stem_markup()).into_iter();
    writeln!(
        out,
        "{} {}",
        format!("Q{} / {}", question.number, session.total()).bold(),
        stem.next().unwrap_or_default()
    )?;
    for line in stem {
        writeln!(out, "  {line}")?;
    }
    for option in &question.options {
        let line = format!("  {}. {}", option.label, inline_text(&option.text));
        if selected == Some(option.label) {
            writeln!(out, "{}", line.cyan().bold())?;
        } else {
            writeln!(out, "{line}")?;
        }
    }
    write_status(out, session, now)
}

pub fn write_results<W: Write>(out: &mut W, record: &ExamRecord, id: Option<i64>) -> io::Result<()> {
    writeln!(out, "\n{}", "Exam submitted".bold())?;
    writeln!(out, "  Answered:   {} / {}", record.answered, record.total)?;
    writeln!(out, "  Unanswered: {}", record.unanswered())?;
    writeln!(out, "  Time:       {}", record.time)?;
    if let Some(id) = id {
        writeln!(out, "  Saved as history entry {id}")?;
    }
    writeln!(out)?;
    write_answer_rows(out, &record.answer_rows())
}

pub fn write_answer_rows<W: Write>(out: &mut W, rows: &[AnswerRow<'_>]) -> io::Result<()> {
    writeln!(out, "  {:<6}{:<8}{}", "Q", "Answer", "At")?;
    for row in rows {
        let line = format!(
            "  {:<6}{:<8}{}",
            row.question.number,
            row.selected_label(),
            row.answered_at_label()
        );
        if row.is_answered() {
            writeln!(out, "{line}")?;
        } else {
            writeln!(out, "{}", line.dark_grey())?;
        }
    }
    Ok(())
}

/// One passage of a saved attempt with the answers given for it.
pub fn write_review<W: Write>(out: &mut W, cursor: &ReviewCursor<'_>) -> io::Result<()> {
    let Some(passage) = cursor.current_passage() else {
        return writeln!(out, "This attempt has no passages.");
    };
    writeln!(out, "{}", cursor.passage_heading().bold())?;
    for line in markup_lines(&passage.content) {
        writeln!(out, "  {line}")?;
    }
    writeln!(out)?;
    write_answer_rows(out, &cursor.answer_rows())?;
    if cursor.has_next() {
        writeln!(
            out,
            "\n  {}",
            format!("more: --passage {}", cursor.passage_index() + 2).dark_grey()
        )?;
    }
    Ok(())
}

pub fn write_history_list<W: Write>(out: &mut W, entries: &[HistoryEntry]) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "No saved attempts.");
    }
    for entry in entries {
        writeln!(
            out,
            "{:<15} {}  {:>3}/{:<3} {}  {}",
            entry.id,
            entry.record.date.format("%Y-%m-%d %H:%M"),
            entry.record.answered,
            entry.record.total,
            entry.record.time,
            entry.display_title().bold()
        )?;
    }
    Ok(())
}

pub fn write_help<W: Write>(out: &mut W) -> io::Result<()> {
    const COMMANDS: &[(&str, &str)] = &[
        ("n / p", "next / previous question"),
        ("g <n>", "go to question n"),
        ("a <label>", "answer the current question"),
        ("np / pp", "next / previous passage"),
        ("pause / resume", "stop or restart the clock"),
        ("t", "show the clock"),
        ("submit", "finish and save the attempt"),
        ("quit", "leave without saving"),
    ];
    for (keys, what) in COMMANDS {
        writeln!(out, "  {}{what}", format!("{keys:<16}").bold())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{SourceDocument, aggregate};
    use crate::exam::TimerMode;
    use crate::exam::record::fixtures;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_markup_lines_one_per_block() {
        let lines = markup_lines("<h2>Bees</h2><p>Bees live in <b>hives</b>.</p><p></p>");
        assert_eq!(lines, vec!["Bees", "Bees live in hives."]);
    }

    #[test]
    fn test_image_blocks_show_marker() {
        let lines = markup_lines("<p><img src=\"x.png\"/></p><p>Caption <img src=\"y.png\"/></p>");
        assert_eq!(lines, vec!["[image]", "Caption [image]"]);
    }

    #[test]
    fn test_inline_text_strips_tags_and_entities() {
        assert_eq!(inline_text("Fish &amp; <i>chips</i>"), "Fish & chips");
    }

    fn started(markup: &str) -> ExamSession {
        let content = aggregate(&[SourceDocument::new("doc", markup)]).unwrap();
        let mut session = ExamSession::new();
        session.start(content, TimerMode::Elapsed, 60).unwrap();
        session
    }

    #[test]
    fn test_stem_paragraphs_stay_on_separate_lines() {
        let session = started(
            "<p>Rivers can be wide.</p><p>1. Read the sentence.</p>\
             <p>What does wide mean?</p><p>A. big</p><p>B. small</p>",
        );
        let text = render(|out| write_question(out, &session, false, Instant::now()));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("1. Read the sentence."));
        assert_eq!(lines[1], "  What does wide mean?");
        assert_eq!(lines[2], "  A. big");
        assert!(!text.contains("sentence.What"));
    }

    #[test]
    fn test_stem_images_follow_the_text() {
        let session = started(
            "<p>Look closely.</p><p>1. Which shape?</p><p><img src=\"s.png\"/></p>",
        );
        let text = render(|out| write_question(out, &session, false, Instant::now()));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("1. Which shape?"));
        assert_eq!(lines[1], "  [image]");
        assert_eq!(lines[2], "  A. ");
    }

    #[test]
    fn test_results_mark_unanswered_as_na() {
        let record = fixtures::record();
        let text = render(|out| write_results(out, &record, Some(7)));
        assert!(text.contains("2 / 5"));
        assert!(text.contains("00:12:34"));
        assert!(text.contains("history entry 7"));
        assert!(text.contains("N/A"));
        assert!(text.contains("00:09:02"));
    }

    #[test]
    fn test_review_shows_only_current_passage_rows() {
        let record = fixtures::record();
        let cursor = ReviewCursor::at_passage(&record, 1);
        let text = render(|out| write_review(out, &cursor));
        assert!(text.contains("Reading 2 / 2"));
        assert!(text.contains("00:09:02"));
        assert!(!text.contains("00:01:10"));
        assert!(!text.contains("more:"));
    }

    #[test]
    fn test_history_list() {
        let empty = render(|out| write_history_list(out, &[]));
        assert!(empty.contains("No saved attempts"));

        let entry = HistoryEntry {
            id: 1_700_000_000_000,
            custom_title: Some("Mock 2".to_string()),
            record: fixtures::record(),
        };
        let text = render(|out| write_history_list(out, &[entry]));
        assert!(text.contains("1700000000000"));
        assert!(text.contains("Mock 2"));
        assert!(text.contains("2/5"));
    }
}
