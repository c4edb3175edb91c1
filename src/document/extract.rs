use tracing::debug;

use crate::document::markup::Block;
use crate::document::model::{AnswerOption, PLACEHOLDER_LABELS, Question};
use crate::document::patterns;

/// Groups question-side blocks into questions numbered from `start_number`.
///
/// A block opens a new group when it starts with a number and a separator.
/// The first block always opens the first group since the segmenter already
/// placed the boundary there. Source numbers are never trusted for
/// sequencing: the result is renumbered in extraction order.
pub fn extract(question_blocks: &[Block], start_number: u32) -> Vec<Question> {
    let mut questions = Vec::new();
    let mut group: Vec<&Block> = Vec::new();

    for block in question_blocks {
        if patterns::is_question_marker(&block.text) && !group.is_empty() {
            push_parsed(&mut questions, &group, start_number);
            group.clear();
        }
        group.push(block);
    }
    if !group.is_empty() {
        push_parsed(&mut questions, &group, start_number);
    }

    for (offset, question) in questions.iter_mut().enumerate() {
        question.number = start_number + offset as u32;
    }
    questions
}

fn push_parsed(questions: &mut Vec<Question>, group: &[&Block], start_number: u32) {
    let provisional = start_number + questions.len() as u32;
    match parse_block(group, provisional) {
        Some(question) => questions.push(question),
        None => debug!(
            source_number = group.first().and_then(|b| patterns::question_marker(&b.text)),
            "dropping empty question group"
        ),
    }
}

/// Parses one question group: stem text, stem images, then options.
///
/// Once the first option has been seen, any later paragraph that is not an
/// option is discarded rather than folded into the stem or the previous
/// option. Returns `None` for a group with nothing in it.
pub fn parse_block(group: &[&Block], number: u32) -> Option<Question> {
    let mut content = String::new();
    let mut image_markup = String::new();
    let mut options: Vec<AnswerOption> = Vec::new();
    let mut options_started = false;

    for block in group {
        match patterns::option_label(&block.text) {
            Some(label) => {
                options_started = true;
                options.push(AnswerOption {
                    label,
                    text: patterns::strip_option_prefix(&block.inner_markup),
                });
            }
            None if options_started => {
                debug!(number, text = block.trimmed_text(), "discarding text after options");
            }
            None if block.has_image => image_markup.push_str(&block.markup),
            None => content.push_str(&block.markup),
        }
    }

    if !image_markup.is_empty() && options.is_empty() {
        options = PLACEHOLDER_LABELS
            .iter()
            .map(|&label| AnswerOption::placeholder(label))
            .collect();
    }

    let content = content.trim().to_string();
    if content.is_empty() && image_markup.is_empty() && options.is_empty() {
        return None;
    }

    Some(Question {
        number,
        content,
        image_markup,
        options,
        passage_index: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::markup::parse_blocks;

    fn paras(lines: &[&str]) -> Vec<Block> {
        lines.iter().map(|l| Block::paragraph(l)).collect()
    }

    #[test]
    fn test_groups_and_renumbers() {
        let blocks = paras(&[
            "1. What is the main idea?",
            "A. Rivers",
            "B. Mountains",
            "5. Which word means tall?",
            "A) high",
            "B) low",
            "C) wide",
        ]);
        let questions = extract(&blocks, 11);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].number, 11);
        assert_eq!(questions[1].number, 12);
        assert_eq!(questions[0].content, "<p>1. What is the main idea?</p>");
        assert_eq!(questions[0].options.len(), 2);
        let labels: Vec<char> = questions[1].options.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!['A', 'B', 'C']);
        assert_eq!(questions[1].options[0].text, "high");
    }

    #[test]
    fn test_option_prefix_stripped_from_markup() {
        let blocks = paras(&["1. Pick one", "A. plain", "B) The answer is <i>here</i>"]);
        let questions = extract(&blocks, 1);
        let option = &questions[0].options[1];
        assert_eq!(option.label, 'B');
        assert_eq!(option.text, "The answer is <i>here</i>");
    }

    #[test]
    fn test_multi_paragraph_stem() {
        let blocks = paras(&[
            "1. Read the sentence below.",
            "\"The river was wide.\"",
            "What does wide mean?",
            "A. broad",
        ]);
        let q = &extract(&blocks, 1)[0];
        assert_eq!(
            q.content,
            "<p>1. Read the sentence below.</p><p>\"The river was wide.\"</p><p>What does wide mean?</p>"
        );
        assert_eq!(q.options.len(), 1);
    }

    #[test]
    fn test_image_question_gets_placeholder_options() {
        let blocks =
            parse_blocks("<p>1. Look at the chart.</p><p><img src=\"chart.png\" /></p>").unwrap();
        let q = &extract(&blocks, 1)[0];
        assert_eq!(q.content, "<p>1. Look at the chart.</p>");
        assert_eq!(q.image_markup, "<p><img src=\"chart.png\" /></p>");
        let labels: Vec<char> = q.options.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!['A', 'B', 'C', 'D']);
        assert!(q.options.iter().all(|o| o.text.is_empty()));
    }

    #[test]
    fn test_image_with_real_options_is_not_padded() {
        let blocks = parse_blocks(
            "<p>1. Which shape?</p><p><img src=\"s.png\"/></p><p>A. circle</p><p>B. square</p>",
        )
        .unwrap();
        let q = &extract(&blocks, 1)[0];
        assert_eq!(q.options.len(), 2);
    }

    #[test]
    fn test_text_after_options_is_dropped() {
        let blocks = paras(&[
            "1. Choose",
            "A. one",
            "B. two",
            "(Note: read carefully)",
            "C. three",
        ]);
        let q = &extract(&blocks, 1)[0];
        assert_eq!(q.content, "<p>1. Choose</p>");
        let texts: Vec<&str> = q.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_image_after_options_is_dropped() {
        let blocks = parse_blocks(
            "<p>1. Choose</p><p>A. one</p><p><img src=\"late.png\"/></p>",
        )
        .unwrap();
        let q = &extract(&blocks, 1)[0];
        assert!(q.image_markup.is_empty());
        assert_eq!(q.options.len(), 1);
    }

    #[test]
    fn test_empty_group_is_discarded() {
        let empty = Block {
            tag: "p".to_string(),
            text: String::new(),
            markup: String::new(),
            inner_markup: String::new(),
            has_image: false,
        };
        assert!(parse_block(&[&empty], 1).is_none());
    }

    #[test]
    fn test_no_blocks_no_questions() {
        assert!(extract(&[], 1).is_empty());
    }
}
