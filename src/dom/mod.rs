pub mod filter;
pub mod parser;
pub mod protect;

use std::collections::BTreeSet;

/// Tag, id and classes of one element, as seen by the tag scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: BTreeSet::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// A paragraph-like element located in a content buffer.
///
/// Offsets are byte offsets into the scanned buffer: `open_offset` points at
/// the `<` of the opening tag and `close_offset` just past the `>` of the
/// closing tag, so `&content[open_offset..close_offset]` is the whole element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub element: Element,
    /// Ancestors, outermost first.
    pub lineage: Vec<Element>,
    pub open_offset: usize,
    pub close_offset: usize,
}

impl Unit {
    pub fn tag(&self) -> &str {
        &self.element.tag
    }

    pub fn markup<'a>(&self, content: &'a str) -> &'a str {
        content.get(self.open_offset..self.close_offset).unwrap_or("")
    }

    /// Words of visible text inside the unit.
    pub fn word_count(&self, content: &str) -> usize {
        word_count(self.markup(content))
    }
}

/// Count whitespace-separated words in markup, ignoring everything inside tags.
pub fn word_count(markup: &str) -> usize {
    let mut count = 0;
    let mut in_tag = false;
    let mut in_word = false;
    for ch in markup.chars() {
        match ch {
            '<' => {
                in_tag = true;
                in_word = false;
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_whitespace() => in_word = false,
            _ => {
                if !in_word {
                    count += 1;
                    in_word = true;
                }
            }
        }
    }
    count
}
