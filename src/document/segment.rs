use crate::document::markup::Block;
use crate::document::patterns;

/// A document split at its first question.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Segments {
    pub passage_blocks: Vec<Block>,
    pub question_blocks: Vec<Block>,
}

impl Segments {
    pub fn has_questions(&self) -> bool {
        !self.question_blocks.is_empty()
    }

    /// Outer markup of the passage blocks, concatenated.
    pub fn passage_markup(&self) -> String {
        self.passage_blocks.iter().map(|b| b.markup.as_str()).collect()
    }
}

/// Splits `blocks` at the first paragraph that reads like "question 1".
///
/// The first match wins, even when a later paragraph would make a better
/// boundary. Without a match everything is passage.
pub fn segment(mut blocks: Vec<Block>) -> Segments {
    match split_index(&blocks) {
        Some(k) => {
            let question_blocks = blocks.split_off(k);
            Segments {
                passage_blocks: blocks,
                question_blocks,
            }
        }
        None => Segments {
            passage_blocks: blocks,
            question_blocks: Vec::new(),
        },
    }
}

pub fn split_index(blocks: &[Block]) -> Option<usize> {
    blocks
        .iter()
        .position(|b| patterns::is_first_question_marker(&b.text))
}
