use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Passage, Question};

/// Frozen result of one submitted exam.
///
/// The live results screen and the history review both render from this
/// type, so a saved attempt reads exactly like the one just finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRecord {
    pub total: usize,
    pub answered: usize,
    /// Final elapsed time, `HH:MM:SS`, paused spans excluded.
    pub time: String,
    pub passages: Vec<Passage>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default)]
    pub answers: BTreeMap<u32, char>,
    #[serde(default)]
    pub answer_timestamps: BTreeMap<u32, String>,
    pub date: DateTime<Utc>,
}

/// One question as shown in a results list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerRow<'a> {
    pub question: &'a Question,
    pub selected: Option<char>,
    /// Timer reading when the answer was chosen.
    pub answered_at: Option<&'a str>,
}

impl AnswerRow<'_> {
    pub fn is_answered(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected_label(&self) -> String {
        self.selected
            .map(String::from)
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn answered_at_label(&self) -> &str {
        self.answered_at.unwrap_or("N/A")
    }
}

impl ExamRecord {
    pub fn answer_rows(&self) -> Vec<AnswerRow<'_>> {
        self.questions.iter().map(|q| self.row(q)).collect()
    }

    /// Rows for the questions attached to one passage.
    pub fn passage_rows(&self, passage_index: usize) -> Vec<AnswerRow<'_>> {
        self.questions
            .iter()
            .filter(|q| q.passage_index == passage_index)
            .map(|q| self.row(q))
            .collect()
    }

    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }

    fn row<'a>(&'a self, question: &'a Question) -> AnswerRow<'a> {
        AnswerRow {
            question,
            selected: self.answers.get(&question.number).copied(),
            answered_at: self
                .answer_timestamps
                .get(&question.number)
                .map(String::as_str),
        }
    }
}
