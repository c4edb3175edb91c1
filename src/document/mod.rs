pub mod aggregate;
pub mod extract;
pub mod markup;
pub mod model;
pub mod patterns;
pub mod segment;

use thiserror::Error;

use crate::convert::ConvertError;

pub use aggregate::{Aggregator, ExamContent, SourceDocument, aggregate, load_documents};
pub use markup::{Block, MarkupError};
pub use model::{AnswerOption, Passage, Question};

/// Failure to turn an input document into exam content. Both variants read
/// the same to the user: the document could not be parsed.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("could not parse document {name}")]
    Convert {
        name: String,
        #[source]
        source: ConvertError,
    },
    #[error("could not parse document {name}")]
    Markup {
        name: String,
        #[source]
        source: MarkupError,
    },
}

impl DocumentError {
    pub fn document_name(&self) -> &str {
        match self {
            DocumentError::Convert { name, .. } | DocumentError::Markup { name, .. } => name,
        }
    }
}
