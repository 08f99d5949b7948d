//! Shields `<script>`, `<style>` and comment blocks from a structural parser
//! by swapping them for placeholder comments.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::InsertError;

const PLACEHOLDER_PREFIX: &str = "protected-block-";

/// Every fragile block in one leftmost-first pass, so a script inside a
/// comment stays part of that comment. Conditional comments come first: their
/// bodies may hold an inner `-->`.
static FRAGILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)<!--\[if[^\]]*\]>.*?<!\[endif\]-->",
        r"|<!--.*?-->",
        r"|<script\b[^>]*>.*?</script\s*>",
        r"|<style\b[^>]*>.*?</style\s*>",
    ))
    .expect("fragile block pattern is a valid regex")
});

/// Markup with its fragile blocks swapped out.
#[derive(Debug)]
pub struct ProtectedMarkup {
    pub markup: String,
    /// Placeholder prefix absent from the input, so restoring never hits
    /// text that merely looks like a placeholder.
    prefix: String,
    blocks: Vec<String>,
}

/// First `protected-block-<n>-` prefix that `markup` does not contain. The
/// input holds at most `len` distinct prefixes, so one of `0..=len` is free.
fn unused_prefix(markup: &str) -> String {
    (0..=markup.len())
        .map(|n| format!("{}{}-", PLACEHOLDER_PREFIX, n))
        .find(|prefix| !markup.contains(prefix.as_str()))
        .unwrap_or_else(|| PLACEHOLDER_PREFIX.to_string())
}

impl ProtectedMarkup {
    pub fn protect(markup: &str) -> Self {
        let prefix = unused_prefix(markup);
        let mut blocks = Vec::new();
        let protected = FRAGILE_RE
            .replace_all(markup, |caps: &regex::Captures<'_>| {
                blocks.push(caps[0].to_string());
                format!("<!--{}{}-->", prefix, blocks.len() - 1)
            })
            .into_owned();
        Self {
            markup: protected,
            prefix,
            blocks,
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn placeholder(&self, idx: usize) -> String {
        format!("<!--{}{}-->", self.prefix, idx)
    }

    /// Put the original blocks back into `transformed`.
    pub fn restore(&self, transformed: &str) -> Result<String, InsertError> {
        let mut out = transformed.to_string();
        for (idx, block) in self.blocks.iter().enumerate().rev() {
            let marker = self.placeholder(idx);
            let Some(at) = out.find(&marker) else {
                return Err(InsertError::ProtectionFailed(idx));
            };
            out.replace_range(at..at + marker.len(), block);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_protected_blocks() {
        let html = r#"<p>a</p><script type="text/javascript">if (a < b) { x = "</p>"; }</script><STYLE>p>b{}</STYLE><!--[if IE]><script>ie()</script><![endif]--><p>b</p>"#;
        let protected = ProtectedMarkup::protect(html);
        assert_eq!(protected.block_count(), 3);
        assert!(!protected.markup.contains("<script"));
        assert!(!protected.markup.to_lowercase().contains("<style"));
        assert_eq!(protected.restore(&protected.markup).unwrap(), html);
    }

    #[test]
    fn missing_placeholder_is_a_failure() {
        let protected = ProtectedMarkup::protect("<p>x</p><script>y()</script>");
        let err = protected.restore("<p>x</p>").unwrap_err();
        assert!(matches!(err, InsertError::ProtectionFailed(0)));
    }

    #[test]
    fn plain_markup_is_untouched() {
        let protected = ProtectedMarkup::protect("<p>nothing fragile</p>");
        assert_eq!(protected.block_count(), 0);
        assert_eq!(protected.markup, "<p>nothing fragile</p>");
    }

    #[test]
    fn scripts_inside_comments_stay_in_their_comment() {
        let html = "<!-- <script>x()</script> --><p>a</p><style>p{}</style>";
        let protected = ProtectedMarkup::protect(html);
        assert_eq!(protected.block_count(), 2);
        assert!(protected.markup.starts_with("<!--protected-block-"));
        assert!(protected.markup.ends_with("--><p>a</p><!--protected-block-0-1-->"));
        assert_eq!(protected.restore(&protected.markup).unwrap(), html);
    }

    #[test]
    fn placeholder_lookalikes_in_content_are_left_alone() {
        let html = "<p>see <!--protected-block-0-0--> here</p><script>y()</script>";
        let protected = ProtectedMarkup::protect(html);
        assert_eq!(protected.block_count(), 2);
        assert!(!protected.markup.contains("protected-block-0-"));
        let restored = protected.restore(&protected.markup).unwrap();
        assert_eq!(restored, html);
    }
}
