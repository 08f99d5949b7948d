use crate::engine::strategy::{Strategy, StrategyContext, StrategyOutput};
use crate::error::InsertError;
use crate::placement::resolve::EffectiveRule;
use crate::placement::rules::DisplayMode;

/// Whole-content insertion: prepend or append to the entire buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeStrategy;

impl Strategy for NativeStrategy {
    fn name(&self) -> &'static str {
        "native"
    }

    fn handles(&self, mode: DisplayMode) -> bool {
        matches!(mode, DisplayMode::BeforeContent | DisplayMode::AfterContent)
    }

    fn apply(
        &self,
        content: &str,
        rules: &[&EffectiveRule],
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutput, InsertError> {
        let mut head = String::new();
        let mut tail = String::new();
        let mut inserted = Vec::new();

        for rule in rules {
            if !ctx.needs_insert(content, rule) {
                continue;
            }
            let fragment = ctx.fragment(rule);
            if rule.mode() == DisplayMode::BeforeContent {
                head.push_str(&fragment);
            } else {
                tail.push_str(&fragment);
            }
            inserted.push(rule.placement.position_id);
        }

        Ok(StrategyOutput {
            content: format!("{}{}{}", head, content, tail),
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::strategy::tests::{ctx, effective};
    use crate::engine::tracker::InsertionTracker;
    use crate::placement::rules::ParserConfig;

    #[test]
    fn wraps_content() {
        let parser = ParserConfig::default();
        let tracker = InsertionTracker::new();
        let top = effective(1, 1, "native_top", DisplayMode::BeforeContent, "");
        let bottom = effective(2, 2, "native_bottom", DisplayMode::AfterContent, "");
        let out = NativeStrategy
            .apply("<p>body</p>", &[&bottom, &top], &ctx(&parser, &tracker))
            .unwrap();
        let body = out.content.find("<p>body</p>").unwrap();
        assert!(out.content.find("placement-1").unwrap() < body);
        assert!(out.content.find("placement-2").unwrap() > body);
        assert_eq!(out.inserted.len(), 2);
    }
}
