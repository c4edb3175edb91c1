//! Adapter from converter markup to an ordered list of top-level blocks.
//!
//! The converter hands back an HTML fragment whose top-level elements are
//! paragraphs, headings, tables and lists. Each one becomes a [`Block`] that
//! keeps its exact source slice, so inline formatting survives untouched.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Document wrappers whose children are the real blocks.
const TRANSPARENT_ELEMENTS: &[&str] = &["html", "body"];

/// Top-level elements that never carry exam content.
const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "title"];

/// Block tags that implicitly end an open paragraph or heading, as HTML
/// parsers do when `</p>` is omitted.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

/// Blocks that cannot contain another block.
const PARAGRAPH_LIKE: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("malformed markup near byte {position}: {source}")]
    Malformed {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Lowercased element name, e.g. `p`, `h1`, `table`.
    pub tag: String,
    /// Concatenated text of all descendants, entities resolved.
    pub text: String,
    /// The element exactly as it appears in the source, tags included.
    pub markup: String,
    /// Everything between the opening and closing tag.
    pub inner_markup: String,
    pub has_image: bool,
}

impl Block {
    /// Builds a block from a bare paragraph body. Handy for callers that
    /// already hold plain text and for tests.
    pub fn paragraph(inner_markup: &str) -> Self {
        let markup = format!("<p>{inner_markup}</p>");
        parse_blocks(&markup)
            .ok()
            .and_then(|mut blocks| blocks.pop())
            .unwrap_or_else(|| Block {
                tag: "p".to_string(),
                text: inner_markup.to_string(),
                markup,
                inner_markup: inner_markup.to_string(),
                has_image: false,
            })
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

struct OpenBlock {
    tag: String,
    start: usize,
    inner_start: usize,
    /// Elements currently open inside the block, the block's own tag first.
    open: Vec<String>,
    text: String,
    has_image: bool,
}

impl OpenBlock {
    fn new(tag: String, start: usize, inner_start: usize) -> Self {
        Self {
            open: vec![tag.clone()],
            tag,
            start,
            inner_start,
            text: String::new(),
            has_image: false,
        }
    }

    /// True when a `name` start tag implicitly ends this block.
    fn is_closed_by(&self, name: &str) -> bool {
        PARAGRAPH_LIKE.contains(&self.tag.as_str()) && CLOSES_PARAGRAPH.contains(&name)
    }

    /// Pops back to the innermost open `name`. Returns false for an end tag
    /// that matches nothing open.
    fn close(&mut self, name: &str) -> bool {
        match self.open.iter().rposition(|open| open == name) {
            Some(position) => {
                self.open.truncate(position);
                true
            }
            None => false,
        }
    }

    fn finish(self, raw: &str, inner_end: usize, end: usize) -> Block {
        Block {
            tag: self.tag,
            text: self.text,
            markup: raw[self.start..end].to_string(),
            inner_markup: raw[self.inner_start..inner_end].to_string(),
            has_image: self.has_image,
        }
    }
}

/// Splits `raw` into its top-level blocks, in document order.
///
/// Parsing is forgiving the way HTML parsers are: an end tag closes every
/// element opened after its match, a new block tag ends an open paragraph,
/// unclosed elements are closed at end of input, and a `<` that cannot start
/// a tag is text. Stray text between top-level elements is ignored. Only
/// input the tokenizer cannot read at all is an error.
pub fn parse_blocks(raw: &str) -> Result<Vec<Block>, MarkupError> {
    let source = escape_stray_angles(raw);
    let raw: &str = &source;
    let mut reader = Reader::from_str(raw);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;
    }

    let mut blocks: Vec<Block> = Vec::new();
    let mut open: Option<OpenBlock> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|source| MarkupError::Malformed {
                position: before,
                source,
            })?;
        let after = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                let name = element_name(e.local_name().as_ref());
                let void = VOID_ELEMENTS.contains(&name.as_str());
                if let Some(block) = open.take_if(|block| block.is_closed_by(&name)) {
                    blocks.push(block.finish(raw, before, before));
                }
                match open.as_mut() {
                    Some(block) => {
                        block.has_image |= name == "img";
                        if !void {
                            block.open.push(name);
                        }
                    }
                    None if TRANSPARENT_ELEMENTS.contains(&name.as_str()) => {}
                    None if void => blocks.push(standalone(name, &raw[before..after])),
                    None => open = Some(OpenBlock::new(name, before, after)),
                }
            }
            Event::Empty(e) => {
                let name = element_name(e.local_name().as_ref());
                if let Some(block) = open.take_if(|block| block.is_closed_by(&name)) {
                    blocks.push(block.finish(raw, before, before));
                }
                match open.as_mut() {
                    Some(block) => block.has_image |= name == "img",
                    None => blocks.push(standalone(name, &raw[before..after])),
                }
            }
            Event::End(e) => {
                let name = element_name(e.local_name().as_ref());
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }
                let Some(block) = open.as_mut() else {
                    // `</body>`, `</html>` and dangling end tags.
                    continue;
                };
                let end = if block.close(&name) {
                    block.open.is_empty().then_some(after)
                } else {
                    TRANSPARENT_ELEMENTS.contains(&name.as_str()).then_some(before)
                };
                if let Some(end) = end
                    && let Some(block) = open.take()
                {
                    blocks.push(block.finish(raw, before, end));
                }
            }
            Event::Text(e) => {
                if let Some(block) = open.as_mut() {
                    let chunk = String::from_utf8_lossy(&e);
                    match quick_xml::escape::unescape(&chunk) {
                        Ok(text) => block.text.push_str(&text),
                        Err(_) => block.text.push_str(&chunk),
                    }
                }
            }
            Event::CData(e) => {
                if let Some(block) = open.as_mut() {
                    block.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(block) = open.as_mut() {
                    block.text.push_str(&resolve_entity(&String::from_utf8_lossy(&e)));
                }
            }
            Event::Eof => {
                if let Some(block) = open.take() {
                    blocks.push(block.finish(raw, raw.len(), raw.len()));
                }
                break;
            }
            _ => {}
        }
    }

    blocks.retain(|b| !SKIPPED_ELEMENTS.contains(&b.tag.as_str()));
    Ok(blocks)
}

/// Rewrites every `<` that is not followed by a tag name, `/`, `!` or `?` as
/// `&lt;`, so comparisons like `5 < 6` survive as text.
fn escape_stray_angles(raw: &str) -> Cow<'_, str> {
    let bytes = raw.as_bytes();
    let is_stray = |i: usize| {
        !bytes
            .get(i + 1)
            .is_some_and(|&next| next.is_ascii_alphabetic() || matches!(next, b'/' | b'!' | b'?'))
    };
    if !bytes.iter().enumerate().any(|(i, &b)| b == b'<' && is_stray(i)) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 16);
    for (i, ch) in raw.char_indices() {
        if ch == '<' && is_stray(i) {
            escaped.push_str("&lt;");
        } else {
            escaped.push(ch);
        }
    }
    Cow::Owned(escaped)
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn standalone(tag: String, markup: &str) -> Block {
    Block {
        has_image: tag == "img",
        tag,
        text: String::new(),
        markup: markup.to_string(),
        inner_markup: String::new(),
    }
}

fn resolve_entity(name: &str) -> String {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(|c| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        if let Some(ch) = value.and_then(char::from_u32) {
            return ch.to_string();
        }
    } else {
        let named = match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            "ensp" => Some('\u{2002}'),
            "emsp" => Some('\u{2003}'),
            "ndash" => Some('\u{2013}'),
            "mdash" => Some('\u{2014}'),
            "lsquo" => Some('\u{2018}'),
            "rsquo" => Some('\u{2019}'),
            "ldquo" => Some('\u{201c}'),
            "rdquo" => Some('\u{201d}'),
            "hellip" => Some('\u{2026}'),
            "middot" => Some('\u{b7}'),
            _ => None,
        };
        if let Some(ch) = named {
            return ch.to_string();
        }
    }
    format!("&{name};")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_elements_become_blocks() {
        let raw = "<h1>Title</h1><p>First <strong>bold</strong> line.</p><p>1. Question?</p>";
        let blocks = parse_blocks(raw).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].tag, "h1");
        assert_eq!(blocks[1].text, "First bold line.");
        assert_eq!(blocks[1].markup, "<p>First <strong>bold</strong> line.</p>");
        assert_eq!(blocks[1].inner_markup, "First <strong>bold</strong> line.");
        assert_eq!(blocks[2].trimmed_text(), "1. Question?");
    }

    #[test]
    fn test_image_detection() {
        let raw = "<p>Look:</p><p><img src=\"data:image/png;base64,AAAA\" /></p><img src=\"x.png\"/>";
        let blocks = parse_blocks(raw).unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(!blocks[0].has_image);
        assert!(blocks[1].has_image);
        assert!(blocks[2].has_image);
        assert_eq!(blocks[2].tag, "img");
    }

    #[test]
    fn test_entities_are_resolved_in_text_only() {
        let raw = "<p>Tom &amp; Jerry&nbsp;&#8212;&#x41;</p>";
        let blocks = parse_blocks(raw).unwrap();
        assert_eq!(blocks[0].text, "Tom & Jerry\u{a0}\u{2014}A");
        assert_eq!(blocks[0].inner_markup, "Tom &amp; Jerry&nbsp;&#8212;&#x41;");
    }

    #[test]
    fn test_nested_elements_stay_in_one_block() {
        let raw = "<table><tr><td><p>cell</p></td></tr></table><p>after</p>";
        let blocks = parse_blocks(raw).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].tag, "table");
        assert_eq!(blocks[0].text, "cell");
        assert_eq!(blocks[1].text, "after");
    }

    #[test]
    fn test_html_wrapper_is_transparent() {
        let raw = "<!DOCTYPE html><html><head><title>t</title></head><body><p>a</p><p>b</p></body></html>";
        let blocks = parse_blocks(raw).unwrap();
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_void_elements_without_slash() {
        let raw = "<p>line one<br>line two</p><hr><p>next</p>";
        let blocks = parse_blocks(raw).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].text, "line oneline two");
        assert_eq!(blocks[1].tag, "hr");
        assert_eq!(blocks[2].text, "next");
    }

    #[test]
    fn test_unclosed_block_runs_to_end() {
        let blocks = parse_blocks("<p>done</p><p>dangling").unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].markup, "<p>dangling");
        assert_eq!(blocks[1].inner_markup, "dangling");
    }

    #[test]
    fn test_unclosed_inline_element_ends_with_its_paragraph() {
        let raw = "<p>Passage <span>text</p><p>1. Where?</p><p>A. here</p>";
        let blocks = parse_blocks(raw).unwrap();
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Passage text", "1. Where?", "A. here"]);
        assert_eq!(blocks[0].markup, "<p>Passage <span>text</p>");
        assert_eq!(blocks[0].inner_markup, "Passage <span>text");
    }

    #[test]
    fn test_omitted_paragraph_end_tags() {
        let blocks = parse_blocks("<p>a<p>1. Q<h2>Part B</h2>").unwrap();
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "1. Q", "Part B"]);
        assert_eq!(blocks[0].markup, "<p>a");
        assert_eq!(blocks[1].markup, "<p>1. Q");
        assert_eq!(blocks[2].tag, "h2");
    }

    #[test]
    fn test_block_tag_inside_table_does_not_split_it() {
        let blocks = parse_blocks("<table><tr><td><p>a<p>b</td></tr></table><p>c</p>").unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "ab");
        assert_eq!(blocks[1].text, "c");
    }

    #[test]
    fn test_bare_angle_bracket_is_text() {
        let blocks = parse_blocks("<p>5 < 6 and 7 > 3</p><p>1. Q</p>").unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "5 < 6 and 7 > 3");
        assert_eq!(blocks[0].inner_markup, "5 &lt; 6 and 7 > 3");
        assert_eq!(blocks[1].text, "1. Q");
    }

    #[test]
    fn test_stray_end_tags_are_ignored() {
        let blocks = parse_blocks("<p>a</span>b</p></div><p>c</p>").unwrap();
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", "c"]);
    }

    #[test]
    fn test_body_end_closes_open_block() {
        let blocks = parse_blocks("<html><body><p>a<span>b</body></html>").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].markup, "<p>a<span>b");
    }

    #[test]
    fn test_empty_input_has_no_blocks() {
        assert!(parse_blocks("").unwrap().is_empty());
        assert!(parse_blocks("just text").unwrap().is_empty());
    }

    #[test]
    fn test_paragraph_helper() {
        let block = Block::paragraph("B) The answer is <i>here</i>");
        assert_eq!(block.text, "B) The answer is here");
        assert_eq!(block.inner_markup, "B) The answer is <i>here</i>");
        assert!(!block.has_image);
    }
}
