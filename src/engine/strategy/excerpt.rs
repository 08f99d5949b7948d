//! Excerpt-relative insertion.
//!
//! A page may render several excerpts; the caller tells each invocation its
//! 1-based ordinal and only rules configured for that ordinal apply. The
//! anchor is the earliest element among the configured excerpt tags. With no
//! such element the fragment goes to the very start or end of the excerpt.

use crate::dom::parser::parse_units;
use crate::engine::strategy::{apply_splices, Splice, Strategy, StrategyContext, StrategyOutput};
use crate::error::InsertError;
use crate::placement::resolve::EffectiveRule;
use crate::placement::rules::DisplayMode;

#[derive(Debug, Clone, Copy, Default)]
pub struct ExcerptStrategy;

impl Strategy for ExcerptStrategy {
    fn name(&self) -> &'static str {
        "excerpt"
    }

    fn handles(&self, mode: DisplayMode) -> bool {
        matches!(mode, DisplayMode::BeforeExcerpt | DisplayMode::AfterExcerpt)
    }

    fn apply(
        &self,
        content: &str,
        rules: &[&EffectiveRule],
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutput, InsertError> {
        let Some(ordinal) = ctx.excerpt_ordinal else {
            log::debug!("Excerpt strategy called without an ordinal");
            return Ok(StrategyOutput::unchanged(content));
        };

        let anchor = parse_units(content, &ctx.parser.excerpt_tags).into_iter().next();
        let mut splices = Vec::new();

        for rule in rules {
            if rule.rule.display_option.index() != Some(ordinal) || !ctx.needs_insert(content, rule) {
                continue;
            }
            let before = rule.mode().is_before();
            let offset = match &anchor {
                Some(unit) if before => unit.open_offset,
                Some(unit) => unit.close_offset,
                None if before => 0,
                None => content.len(),
            };
            splices.push(Splice {
                offset,
                fragment: ctx.fragment(rule),
                position_id: rule.placement.position_id,
            });
        }

        if splices.is_empty() {
            return Ok(StrategyOutput::unchanged(content));
        }
        Ok(apply_splices(content, splices))
    }
}
