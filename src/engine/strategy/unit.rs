//! Unit-relative insertion: before or after the n-th counted paragraph.

use crate::dom::filter::is_excluded;
use crate::dom::parser::parse_units;
use crate::dom::Unit;
use crate::engine::strategy::{apply_splices, Splice, Strategy, StrategyContext, StrategyOutput};
use crate::error::InsertError;
use crate::placement::resolve::EffectiveRule;
use crate::placement::rules::{DisplayMode, ParserConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnitStrategy;

/// Units that take part in ordinal counting: not under an excluded parent and
/// at or above the minimum word count.
pub fn counted_units(content: &str, config: &ParserConfig) -> Vec<Unit> {
    parse_units(content, &config.unit_tags)
        .into_iter()
        .filter(|u| !is_excluded(u, config.parent_filters.as_slice()))
        .filter(|u| config.min_word_count == 0 || u.word_count(content) >= config.min_word_count)
        .collect()
}

impl Strategy for UnitStrategy {
    fn name(&self) -> &'static str {
        "unit"
    }

    fn handles(&self, mode: DisplayMode) -> bool {
        matches!(mode, DisplayMode::BeforeParagraph | DisplayMode::AfterParagraph)
    }

    fn apply(
        &self,
        content: &str,
        rules: &[&EffectiveRule],
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutput, InsertError> {
        let units = counted_units(content, ctx.parser);
        let mut splices = Vec::new();
        let mut out_of_range = Vec::new();

        for rule in rules {
            let Some(ordinal) = rule.rule.display_option.index() else {
                continue;
            };
            if !ctx.needs_insert(content, rule) {
                continue;
            }
            let Some(unit) = (ordinal as usize).checked_sub(1).and_then(|i| units.get(i)) else {
                out_of_range.push(ordinal);
                continue;
            };
            let offset = if rule.mode().is_before() {
                unit.open_offset
            } else {
                unit.close_offset
            };
            splices.push(Splice {
                offset,
                fragment: ctx.fragment(rule),
                position_id: rule.placement.position_id,
            });
        }

        if !out_of_range.is_empty() {
            log::warn!(
                "Content has {} counted units; skipped placements at ordinals {:?}",
                units.len(),
                out_of_range
            );
        }

        if splices.is_empty() {
            return Ok(StrategyOutput::unchanged(content));
        }
        Ok(apply_splices(content, splices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::strategy::tests::{ctx, effective};
    use crate::engine::tracker::InsertionTracker;
    use crate::placement::rules::ParentFilterSet;
    use crate::placement::PositionId;

    const THREE: &str = "<p>First para.</p><p>Second para.</p><p>Third para.</p>";

    #[test]
    fn inserts_after_second_paragraph() {
        let parser = ParserConfig::default();
        let tracker = InsertionTracker::new();
        let rule = effective(1, 11, "content_paragraph", DisplayMode::AfterParagraph, "2");
        let out = UnitStrategy.apply(THREE, &[&rule], &ctx(&parser, &tracker)).unwrap();

        let fragment = ctx(&parser, &tracker).fragment(&rule);
        let expected = format!(
            "<p>First para.</p><p>Second para.</p>{}<p>Third para.</p>",
            fragment
        );
        assert_eq!(out.content, expected);
        assert_eq!(out.inserted, vec![PositionId(11)]);
    }

    #[test]
    fn before_and_after_with_running_offset() {
        let parser = ParserConfig::default();
        let tracker = InsertionTracker::new();
        let before = effective(1, 1, "content_paragraph_1", DisplayMode::BeforeParagraph, "1");
        let after = effective(2, 2, "content_paragraph_2", DisplayMode::AfterParagraph, "3");
        let out = UnitStrategy
            .apply(THREE, &[&before, &after], &ctx(&parser, &tracker))
            .unwrap();
        assert!(out.content.starts_with("<div id=\"placement-1\""));
        assert!(out.content.ends_with("<div id=\"placement-2\" class=\"placement-slot\" data-position-id=\"2\"></div>"));
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let parser = ParserConfig::default();
        let tracker = InsertionTracker::new();
        let rule = effective(1, 11, "content_paragraph", DisplayMode::AfterParagraph, "1");
        let c = ctx(&parser, &tracker);
        let once = UnitStrategy.apply(THREE, &[&rule], &c).unwrap();
        let twice = UnitStrategy.apply(&once.content, &[&rule], &c).unwrap();
        assert_eq!(twice.content, once.content);
        assert!(twice.inserted.is_empty());
        assert_eq!(twice.content.matches("data-position-id=\"11\"").count(), 1);
    }

    #[test]
    fn out_of_range_ordinal_is_skipped() {
        let parser = ParserConfig::default();
        let tracker = InsertionTracker::new();
        let rule = effective(1, 11, "content_paragraph", DisplayMode::AfterParagraph, "4");
        let out = UnitStrategy.apply(THREE, &[&rule], &ctx(&parser, &tracker)).unwrap();
        assert_eq!(out.content, THREE);
        assert!(out.inserted.is_empty());
    }

    #[test]
    fn excluded_and_short_units_do_not_count() {
        let html = "<blockquote><p>quoted words here</p></blockquote><p>tiny</p><p>long enough paragraph</p>";
        let parser = ParserConfig {
            parent_filters: ParentFilterSet::from(vec!["blockquote".to_string()]),
            min_word_count: 2,
            ..ParserConfig::default()
        };
        let units = counted_units(html, &parser);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].markup(html), "<p>long enough paragraph</p>");

        let tracker = InsertionTracker::new();
        let rule = effective(1, 3, "content_paragraph", DisplayMode::BeforeParagraph, "1");
        let out = UnitStrategy.apply(html, &[&rule], &ctx(&parser, &tracker)).unwrap();
        let at = out.content.find("placement-3").unwrap();
        assert!(at > html.find("<p>tiny</p>").unwrap());
    }
}
