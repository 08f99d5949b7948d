//! Streaming tag scanner.
//!
//! Finds unit elements (paragraph-like tags) in raw markup without building a
//! document tree. Each unit carries byte offsets usable for direct splicing
//! and the chain of open ancestors at the point it was closed.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Element, Unit};

/// Tags that never have a closing counterpart.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Tags whose bodies are raw text and must not be scanned for markup.
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title", "xmp"];

/// A quote opens a value only right after `=`; elsewhere it is a literal.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^<(/?)([A-Za-z][A-Za-z0-9:_-]*)((?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]*)|[^>=])*)>"#,
    )
    .expect("tag pattern is a valid regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)(id|class)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("attribute pattern is a valid regex")
});

struct OpenElement {
    element: Element,
    open_offset: usize,
}

/// Scan `content` for elements named in `unit_tags`.
///
/// Units come back ordered by opening offset. Unclosed or stray tags are
/// dropped; the scan never fails.
pub fn parse_units<S: AsRef<str>>(content: &str, unit_tags: &[S]) -> Vec<Unit> {
    let wanted: HashSet<String> = unit_tags
        .iter()
        .map(|t| t.as_ref().trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if wanted.is_empty() || content.is_empty() {
        return Vec::new();
    }

    // ASCII lowering keeps byte offsets identical to `content`.
    let lower = content.to_ascii_lowercase();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut units = Vec::new();
    let mut pos = 0;

    while let Some(rel) = content[pos..].find('<') {
        let start = pos + rel;
        let rest = &content[start..];

        if rest.starts_with("<!--") {
            pos = match lower[start + 4..].find("-->") {
                Some(end) => start + 4 + end + 3,
                None => break,
            };
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = match rest.find('>') {
                Some(end) => start + end + 1,
                None => break,
            };
            continue;
        }

        let Some(caps) = TAG_RE.captures(rest) else {
            pos = start + 1;
            continue;
        };
        let end = start + caps[0].len();
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let attrs = caps.get(3).map_or("", |m| m.as_str());

        if closing {
            if let Some(idx) = stack.iter().rposition(|o| o.element.tag == name) {
                // Anything opened after the match was never closed.
                stack.truncate(idx + 1);
                if let Some(open) = stack.pop() {
                    if wanted.contains(&name) {
                        units.push(Unit {
                            element: open.element,
                            lineage: stack.iter().map(|o| o.element.clone()).collect(),
                            open_offset: open.open_offset,
                            close_offset: end,
                        });
                    }
                }
            }
            pos = end;
            continue;
        }

        if RAW_TEXT_TAGS.contains(&name.as_str()) {
            let needle = format!("</{}", name);
            pos = match lower[end..].find(&needle) {
                Some(close) => end + close,
                None => break,
            };
            continue;
        }

        let self_closing = attrs.trim_end().ends_with('/');
        if !self_closing && !VOID_TAGS.contains(&name.as_str()) {
            stack.push(OpenElement {
                element: describe(name, attrs),
                open_offset: start,
            });
        }
        pos = end;
    }

    units.sort_by_key(|u| u.open_offset);
    units
}

fn describe(tag: String, attrs: &str) -> Element {
    let mut element = Element::new(tag);
    for caps in ATTR_RE.captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        if caps[1].eq_ignore_ascii_case("id") {
            if element.id.is_none() && !value.trim().is_empty() {
                element.id = Some(value.trim().to_string());
            }
        } else {
            element
                .classes
                .extend(value.split_whitespace().map(str::to_string));
        }
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_units_with_offsets() {
        let html = "<div id=\"main\"><p>One</p><p class=\"lead x\">Two</p></div>";
        let units = parse_units(html, &["p"]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].markup(html), "<p>One</p>");
        assert_eq!(units[1].markup(html), "<p class=\"lead x\">Two</p>");
        assert!(units[1].element.has_class("lead"));
        assert!(units[1].element.has_class("x"));
        assert_eq!(units[0].lineage.len(), 1);
        assert_eq!(units[0].lineage[0].id.as_deref(), Some("main"));
    }

    #[test]
    fn byte_offsets_survive_multibyte_text() {
        let html = "<p>héllo wörld</p><p>ß</p>";
        let units = parse_units(html, &["p"]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].open_offset, "<p>héllo wörld</p>".len());
        assert_eq!(units[1].markup(html), "<p>ß</p>");
    }

    #[test]
    fn ignores_markup_inside_scripts_and_comments() {
        let html = r#"<p>a</p><script>var s = "<p>fake</p>";</script><!-- <p>old</p> --><p>b</p>"#;
        let units = parse_units(html, &["p"]);
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].markup(html), "<p>b</p>");
    }

    #[test]
    fn drops_unclosed_and_stray_tags() {
        let html = "<div><p>open<span>x</span></div></p><p>ok</p></em>";
        let units = parse_units(html, &["p"]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].markup(html), "<p>ok</p>");
    }

    #[test]
    fn void_and_self_closing_tags_are_not_ancestors() {
        let html = "<section><img src=\"a.png\"><br/><P>x</P></section>";
        let units = parse_units(html, &["p"]);
        assert_eq!(units.len(), 1);
        let lineage: Vec<&str> = units[0].lineage.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(lineage, vec!["section"]);
    }

    #[test]
    fn attribute_values_may_contain_angle_brackets() {
        let html = r#"<p data-x="a>b">text</p>"#;
        let units = parse_units(html, &["p"]);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].close_offset, html.len());
    }

    #[test]
    fn apostrophes_in_unquoted_values_are_literal() {
        let html = "<p class=it's>One</p><p>Two</p><p>It's three</p>";
        let units = parse_units(html, &["p"]);
        assert_eq!(units.len(), 3);
        assert!(units[0].element.has_class("it's"));
        assert_eq!(units[0].markup(html), "<p class=it's>One</p>");
        assert_eq!(units[2].markup(html), "<p>It's three</p>");
    }

    #[test]
    fn empty_or_garbage_input_yields_nothing() {
        assert!(parse_units("", &["p"]).is_empty());
        assert!(parse_units("<<<>>> < p >", &["p"]).is_empty());
        assert!(parse_units("<p>x</p>", &[] as &[&str]).is_empty());
    }
}
