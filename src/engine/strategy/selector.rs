//! Selector-relative insertion on a parsed document.
//!
//! ```text
//! content ─▶ protect script/style ─▶ parse ─▶ comment anchors at matches
//!         ─▶ serialize ─▶ anchors → fragments ─▶ restore blocks ─▶ length check
//! ```
//!
//! Any failure after protection aborts the whole strategy; the orchestrator
//! then keeps the original buffer.

use scraper::node::Comment;
use scraper::{Html, Node, Selector};

use crate::dom::protect::ProtectedMarkup;
use crate::engine::strategy::{Strategy, StrategyContext, StrategyOutput};
use crate::error::InsertError;
use crate::placement::resolve::EffectiveRule;
use crate::placement::rules::{DisplayMode, DisplayOption};

/// Output below this fraction of the input means the parse went wrong.
const MIN_OUTPUT_RATIO: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// A compiled selector and which side of each match to mark.
pub struct Anchor {
    pub selector: Selector,
    pub side: Side,
}

/// Serialized markup carrying anchor comments, with match counts per anchor.
#[derive(Debug, Clone)]
pub struct MarkedMarkup {
    pub markup: String,
    pub matches: Vec<usize>,
}

fn anchor_comment(idx: usize) -> String {
    format!("placement-anchor-{}", idx)
}

/// Structural parser used by [`SelectorStrategy`].
pub trait DomSplicer {
    /// Parse `markup`, put an anchor comment beside every node matched by
    /// each anchor and serialize the tree back.
    fn mark_anchors(&self, markup: &str, anchors: &[Anchor]) -> Result<MarkedMarkup, InsertError>;
}

/// [`DomSplicer`] backed by `scraper`'s html5ever tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperSplicer;

fn looks_like_document(markup: &str) -> bool {
    let prefix: Vec<u8> = markup
        .trim_start()
        .bytes()
        .take(9)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    prefix.starts_with(b"<!doctype") || prefix.starts_with(b"<html")
}

impl DomSplicer for ScraperSplicer {
    fn mark_anchors(&self, markup: &str, anchors: &[Anchor]) -> Result<MarkedMarkup, InsertError> {
        let is_document = looks_like_document(markup);
        let mut html = if is_document {
            Html::parse_document(markup)
        } else {
            Html::parse_fragment(markup)
        };

        let mut matches = Vec::with_capacity(anchors.len());
        for (idx, anchor) in anchors.iter().enumerate() {
            let ids: Vec<_> = html.select(&anchor.selector).map(|el| el.id()).collect();
            matches.push(ids.len());
            for id in ids {
                let Some(mut node) = html.tree.get_mut(id) else {
                    continue;
                };
                let comment = Node::Comment(Comment {
                    comment: anchor_comment(idx).into(),
                });
                match anchor.side {
                    Side::Before => {
                        node.insert_before(comment);
                    }
                    Side::After => {
                        node.insert_after(comment);
                    }
                }
            }
        }

        let markup = if is_document {
            html.html()
        } else {
            html.root_element().inner_html()
        };
        Ok(MarkedMarkup { markup, matches })
    }
}

pub fn compile_selector(raw: &str) -> Result<Selector, InsertError> {
    Selector::parse(raw).map_err(|e| InsertError::InvalidSelector {
        selector: raw.to_string(),
        reason: format!("{:?}", e),
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorStrategy<S = ScraperSplicer> {
    splicer: S,
}

impl<S: DomSplicer> SelectorStrategy<S> {
    pub fn with_splicer(splicer: S) -> Self {
        Self { splicer }
    }
}

impl<S: DomSplicer> Strategy for SelectorStrategy<S> {
    fn name(&self) -> &'static str {
        "selector"
    }

    fn handles(&self, mode: DisplayMode) -> bool {
        matches!(mode, DisplayMode::BeforeElement | DisplayMode::AfterElement)
    }

    fn size_sensitive(&self) -> bool {
        true
    }

    fn apply(
        &self,
        content: &str,
        rules: &[&EffectiveRule],
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutput, InsertError> {
        let mut anchors = Vec::new();
        let mut anchored: Vec<&EffectiveRule> = Vec::new();

        for &rule in rules {
            let DisplayOption::Selector(raw) = &rule.rule.display_option else {
                continue;
            };
            if !ctx.needs_insert(content, rule) {
                continue;
            }
            match compile_selector(raw) {
                Ok(selector) => {
                    let side = if rule.mode().is_before() {
                        Side::Before
                    } else {
                        Side::After
                    };
                    anchors.push(Anchor { selector, side });
                    anchored.push(rule);
                }
                Err(e) => log::warn!("Skipping placement {}: {}", rule.placement.id, e),
            }
        }

        if anchors.is_empty() {
            return Ok(StrategyOutput::unchanged(content));
        }

        let protected = ProtectedMarkup::protect(content);
        let marked = self.splicer.mark_anchors(&protected.markup, &anchors)?;

        let mut out = marked.markup;
        let mut inserted = Vec::new();
        for (idx, rule) in anchored.iter().enumerate() {
            let token = format!("<!--{}-->", anchor_comment(idx));
            if marked.matches.get(idx).copied().unwrap_or(0) == 0 || !out.contains(&token) {
                log::warn!(
                    "Selector '{}' for placement {} matched nothing",
                    rule.rule.display_option,
                    rule.placement.id
                );
                continue;
            }
            out = out.replace(&token, &ctx.fragment(rule));
            inserted.push(rule.placement.position_id);
        }
        if inserted.is_empty() {
            return Ok(StrategyOutput::unchanged(content));
        }

        let restored = protected.restore(&out)?;
        if restored.len() < content.len() / MIN_OUTPUT_RATIO {
            return Err(InsertError::LengthCollapse {
                original: content.len(),
                produced: restored.len(),
            });
        }

        Ok(StrategyOutput {
            content: restored,
            inserted,
        })
    }
}
