use crate::document::Passage;
use crate::exam::record::{AnswerRow, ExamRecord};

/// Read-only walk through a saved attempt, one passage at a time.
///
/// Navigation here is independent of the live session: it only moves a
/// passage pointer over the frozen record.
#[derive(Clone, Debug)]
pub struct ReviewCursor<'a> {
    record: &'a ExamRecord,
    passage_index: usize,
}

impl<'a> ReviewCursor<'a> {
    pub fn new(record: &'a ExamRecord) -> Self {
        Self {
            record,
            passage_index: 0,
        }
    }

    /// Starts at `passage_index`, clamped to the last passage.
    pub fn at_passage(record: &'a ExamRecord, passage_index: usize) -> Self {
        let last = record.passages.len().saturating_sub(1);
        Self {
            record,
            passage_index: passage_index.min(last),
        }
    }

    pub fn record(&self) -> &'a ExamRecord {
        self.record
    }

    pub fn passage_index(&self) -> usize {
        self.passage_index
    }

    pub fn passage_count(&self) -> usize {
        self.record.passages.len()
    }

    pub fn current_passage(&self) -> Option<&'a Passage> {
        self.record.passages.get(self.passage_index)
    }

    pub fn has_next(&self) -> bool {
        self.passage_index + 1 < self.passage_count()
    }

    pub fn has_previous(&self) -> bool {
        self.passage_index > 0
    }

    pub fn next_passage(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.passage_index += 1;
        true
    }

    pub fn previous_passage(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.passage_index -= 1;
        true
    }

    /// Heading for the passage pane, `Reading 2 / 3` when there is more than
    /// one passage.
    pub fn passage_heading(&self) -> String {
        if self.passage_count() > 1 {
            format!("Reading {} / {}", self.passage_index + 1, self.passage_count())
        } else {
            "Reading".to_string()
        }
    }

    pub fn answer_rows(&self) -> Vec<AnswerRow<'a>> {
        self.record.passage_rows(self.passage_index)
    }
}
