//! Plain-text predicates that drive segmentation and option detection.
//!
//! Every predicate works on the already-extracted text of a block, so none of
//! them knows anything about markup. The separator glyph set is shared:
//! `.`, `)` and the full-width enumeration comma `、`.

use std::sync::LazyLock;

use regex::Regex;

static FIRST_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*1[.)、]").expect("first question pattern"));

static QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)、]").expect("question pattern"));

static OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-F])[.)、]\s*(.*)").expect("option pattern"));

static OPTION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-F][.)、]\s*").expect("option prefix pattern"));

/// True when `text` opens question 1, the passage/question boundary.
pub fn is_first_question_marker(text: &str) -> bool {
    FIRST_QUESTION.is_match(text.trim())
}

/// Source number of a paragraph that opens a question (`12.`, `3)`, `7、`).
///
/// The number only marks a boundary; questions are renumbered afterwards.
pub fn question_marker(text: &str) -> Option<u64> {
    let caps = QUESTION.captures(text.trim())?;
    // Absurdly long digit runs still mark a boundary.
    Some(caps[1].parse().unwrap_or(u64::MAX))
}

pub fn is_question_marker(text: &str) -> bool {
    QUESTION.is_match(text.trim())
}

/// Label of an option paragraph such as `B) some text`.
pub fn option_label(text: &str) -> Option<char> {
    let caps = OPTION.captures(text.trim())?;
    caps[1].chars().next()
}

/// Removes the leading `<letter><separator>` of an option from its serialized
/// markup, leaving any inline formatting after it untouched.
pub fn strip_option_prefix(markup: &str) -> String {
    OPTION_PREFIX.replace(markup, "").trim().to_string()
}
