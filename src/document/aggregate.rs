use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::convert::Converter;
use crate::document::DocumentError;
use crate::document::extract::extract;
use crate::document::markup::parse_blocks;
use crate::document::model::{Passage, Question};
use crate::document::segment::segment;

/// One converted input document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    /// Display name, normally the file name.
    pub name: String,
    pub markup: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markup: markup.into(),
        }
    }
}

/// Everything an exam needs, merged across all input documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamContent {
    pub passages: Vec<Passage>,
    pub questions: Vec<Question>,
    /// Names of every input document, kept or skipped, in input order.
    pub filenames: Vec<String>,
}

impl ExamContent {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Accumulates documents one at a time, keeping a running question offset.
#[derive(Debug, Default)]
pub struct Aggregator {
    content: ExamContent,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one document. Returns whether it contributed a passage.
    ///
    /// A document needs both passage text and at least one question to be
    /// kept; otherwise it is skipped and numbering continues as if it were
    /// never there.
    pub fn push(&mut self, document: &SourceDocument) -> Result<bool, DocumentError> {
        self.content.filenames.push(document.name.clone());

        let blocks =
            parse_blocks(&document.markup).map_err(|source| DocumentError::Markup {
                name: document.name.clone(),
                source,
            })?;
        let segments = segment(blocks);
        let passage_markup = if segments.has_questions() {
            segments.passage_markup()
        } else {
            document.markup.clone()
        };

        let offset = self.content.questions.len() as u32;
        let questions = extract(&segments.question_blocks, offset + 1);

        if passage_markup.is_empty() || questions.is_empty() {
            info!(
                document = %document.name,
                has_passage = !passage_markup.is_empty(),
                questions = questions.len(),
                "skipping document without both passage and questions"
            );
            return Ok(false);
        }

        let index = self.content.passages.len();
        let count = questions.len() as u32;
        self.content.passages.push(Passage {
            content: passage_markup,
            start_question: offset + 1,
            end_question: offset + count,
            index,
        });
        self.content
            .questions
            .extend(questions.into_iter().map(|q| Question {
                passage_index: index,
                ..q
            }));

        debug!(
            document = %document.name,
            passage = index,
            first = offset + 1,
            last = offset + count,
            "document aggregated"
        );
        Ok(true)
    }

    pub fn finish(self) -> ExamContent {
        self.content
    }
}

/// Merges already-converted documents into one exam, in input order.
pub fn aggregate(documents: &[SourceDocument]) -> Result<ExamContent, DocumentError> {
    let mut aggregator = Aggregator::new();
    for document in documents {
        aggregator.push(document)?;
    }
    Ok(aggregator.finish())
}

/// Converts and aggregates files strictly one after another so the question
/// offsets stay deterministic. Any failure aborts the whole load.
pub fn load_documents(
    paths: &[PathBuf],
    converter: &dyn Converter,
) -> Result<ExamContent, DocumentError> {
    let mut aggregator = Aggregator::new();
    for path in paths {
        let name = document_name(path);
        let markup = converter
            .convert(path)
            .map_err(|source| DocumentError::Convert {
                name: name.clone(),
                source,
            })?;
        aggregator.push(&SourceDocument { name, markup })?;
    }
    Ok(aggregator.finish())
}

pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
