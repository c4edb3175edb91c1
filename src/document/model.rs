use serde::{Deserialize, Serialize};

/// Labels synthesized for an image question whose choices live inside the image.
pub const PLACEHOLDER_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub label: char,
    /// Inner markup of the option paragraph with its label prefix removed.
    pub text: String,
}

impl AnswerOption {
    pub fn placeholder(label: char) -> Self {
        Self {
            label,
            text: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub number: u32,
    pub content: String,
    #[serde(default)]
    pub image_markup: String,
    pub options: Vec<AnswerOption>,
    #[serde(default)]
    pub passage_index: usize,
}

impl Question {
    pub fn has_option(&self, label: char) -> bool {
        self.options.iter().any(|o| o.label == label)
    }

    /// Stem markup as rendered above the options: text first, then images.
    pub fn stem_markup(&self) -> String {
        format!("{}{}", self.content, self.image_markup)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub start_question: u32,
    pub end_question: u32,
    pub index: usize,
}

impl Passage {
    pub fn contains(&self, number: u32) -> bool {
        (self.start_question..=self.end_question).contains(&number)
    }
}
