//! Interchangeable insertion algorithms.
//!
//! Every content strategy takes the rules it handles plus the current buffer
//! and returns a new buffer together with the positions it inserted. Nothing
//! is committed to the tracker here; the orchestrator does that once it has
//! accepted the output.

pub mod excerpt;
pub mod native;
pub mod selector;
pub mod slots;
pub mod unit;

use crate::engine::embed::{Embed, EmbedContext};
use crate::engine::tracker::InsertionTracker;
use crate::error::InsertError;
use crate::placement::resolve::EffectiveRule;
use crate::placement::rules::{DisplayMode, ParserConfig};
use crate::placement::{PageType, PositionId};

/// Size ceiling for strategies that need a structural parse.
pub const MAX_STRUCTURAL_BYTES: usize = 2_000_000;

/// Shared, read-only inputs of one strategy invocation.
pub struct StrategyContext<'a> {
    pub page_type: PageType,
    pub parser: &'a ParserConfig,
    pub embed: &'a dyn Embed,
    pub tracker: &'a InsertionTracker,
    pub excerpt_ordinal: Option<u32>,
}

impl StrategyContext<'_> {
    pub fn fragment(&self, rule: &EffectiveRule) -> String {
        self.embed.render(
            &rule.placement,
            &EmbedContext {
                page_type: self.page_type,
                display_mode: rule.mode(),
                ordinal: self.excerpt_ordinal,
            },
        )
    }

    /// Whether `rule`'s placement still needs splicing into `content`.
    pub fn needs_insert(&self, content: &str, rule: &EffectiveRule) -> bool {
        let position_id = rule.placement.position_id;
        if content.contains(&self.embed.marker(position_id)) {
            log::debug!("Position {} already present, skipping", position_id);
            return false;
        }
        if self.tracker.is_inserted(position_id) {
            log::debug!("Position {} lost from re-rendered content, inserting again", position_id);
        }
        true
    }
}

/// Result of a successful strategy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutput {
    pub content: String,
    pub inserted: Vec<PositionId>,
}

impl StrategyOutput {
    pub fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            inserted: Vec::new(),
        }
    }
}

pub trait Strategy {
    fn name(&self) -> &'static str;

    fn handles(&self, mode: DisplayMode) -> bool;

    /// Strategies that parse the whole buffer are skipped above
    /// [`MAX_STRUCTURAL_BYTES`].
    fn size_sensitive(&self) -> bool {
        false
    }

    fn apply(
        &self,
        content: &str,
        rules: &[&EffectiveRule],
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutput, InsertError>;
}

/// Run `strategy` over the rules it handles, keeping `content` whenever the
/// strategy fails or hands back a shorter buffer.
pub fn run_guarded(
    strategy: &dyn Strategy,
    content: &str,
    rules: &[&EffectiveRule],
    ctx: &StrategyContext<'_>,
) -> StrategyOutput {
    let mine: Vec<&EffectiveRule> = rules
        .iter()
        .copied()
        .filter(|r| strategy.handles(r.mode()))
        .collect();
    if content.is_empty() || mine.is_empty() {
        return StrategyOutput::unchanged(content);
    }
    if strategy.size_sensitive() && content.len() > MAX_STRUCTURAL_BYTES {
        log::info!(
            "Skipping {} strategy: {} bytes exceeds the {} byte ceiling",
            strategy.name(),
            content.len(),
            MAX_STRUCTURAL_BYTES
        );
        return StrategyOutput::unchanged(content);
    }

    match strategy.apply(content, &mine, ctx) {
        Ok(out) if out.content.len() >= content.len() => out,
        Ok(out) => {
            log::warn!(
                "{} strategy shrank content from {} to {} bytes; keeping original",
                strategy.name(),
                content.len(),
                out.content.len()
            );
            StrategyOutput::unchanged(content)
        }
        Err(e) => {
            log::warn!("{} strategy failed, keeping original content: {}", strategy.name(), e);
            StrategyOutput::unchanged(content)
        }
    }
}

/// A fragment destined for a byte offset of the original buffer.
#[derive(Debug, Clone)]
pub(crate) struct Splice {
    pub offset: usize,
    pub fragment: String,
    pub position_id: PositionId,
}

/// Apply splices in offset order, shifting each by the bytes already inserted
/// ahead of it.
pub(crate) fn apply_splices(content: &str, mut splices: Vec<Splice>) -> StrategyOutput {
    splices.sort_by_key(|s| s.offset);
    let extra: usize = splices.iter().map(|s| s.fragment.len()).sum();
    let mut out = String::with_capacity(content.len() + extra);
    let mut inserted = Vec::with_capacity(splices.len());
    let mut inserted_len = 0;

    out.push_str(content);
    for splice in splices {
        let at = splice.offset.min(content.len()) + inserted_len;
        out.insert_str(at, &splice.fragment);
        inserted_len += splice.fragment.len();
        inserted.push(splice.position_id);
    }
    StrategyOutput {
        content: out,
        inserted,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::embed::PlaceholderEmbed;
    use crate::placement::rules::PlacementRule;
    use crate::placement::tests::placement;
    use crate::placement::PlacementId;

    pub(crate) fn effective(
        id: u64,
        position_id: u64,
        ty: &str,
        mode: DisplayMode,
        opt: &str,
    ) -> EffectiveRule {
        EffectiveRule {
            rule: PlacementRule::new(PageType::Post, PlacementId(id), mode, opt),
            placement: placement(id, position_id, ty, "p"),
        }
    }

    pub(crate) fn ctx<'a>(parser: &'a ParserConfig, tracker: &'a InsertionTracker) -> StrategyContext<'a> {
        StrategyContext {
            page_type: PageType::Post,
            parser,
            embed: &PlaceholderEmbed,
            tracker,
            excerpt_ordinal: None,
        }
    }

    #[test]
    fn splices_account_for_earlier_insertions() {
        let out = apply_splices(
            "<p>a</p><p>b</p>",
            vec![
                Splice { offset: 16, fragment: "[2]".into(), position_id: PositionId(2) },
                Splice { offset: 8, fragment: "[1]".into(), position_id: PositionId(1) },
                Splice { offset: 0, fragment: "[0]".into(), position_id: PositionId(0) },
            ],
        );
        assert_eq!(out.content, "[0]<p>a</p>[1]<p>b</p>[2]");
        assert_eq!(out.inserted, vec![PositionId(0), PositionId(1), PositionId(2)]);
    }

    struct Shrinking;

    impl Strategy for Shrinking {
        fn name(&self) -> &'static str {
            "shrinking"
        }

        fn handles(&self, mode: DisplayMode) -> bool {
            mode == DisplayMode::AfterContent
        }

        fn size_sensitive(&self) -> bool {
            true
        }

        fn apply(
            &self,
            _content: &str,
            rules: &[&EffectiveRule],
            _ctx: &StrategyContext<'_>,
        ) -> Result<StrategyOutput, InsertError> {
            Ok(StrategyOutput {
                content: String::new(),
                inserted: rules.iter().map(|r| r.placement.position_id).collect(),
            })
        }
    }

    #[test]
    fn guard_rejects_shrinking_output_and_oversized_input() {
        let parser = ParserConfig::default();
        let tracker = InsertionTracker::new();
        let c = ctx(&parser, &tracker);
        let rule = effective(1, 5, "native", DisplayMode::AfterContent, "");

        let out = run_guarded(&Shrinking, "<p>keep me</p>", &[&rule], &c);
        assert_eq!(out.content, "<p>keep me</p>");
        assert!(out.inserted.is_empty());

        let huge = "x".repeat(MAX_STRUCTURAL_BYTES + 1);
        let out = run_guarded(&Shrinking, &huge, &[&rule], &c);
        assert_eq!(out.content.len(), huge.len());

        let other = effective(2, 6, "native", DisplayMode::BeforeContent, "");
        let out = run_guarded(&Shrinking, "<p>x</p>", &[&other], &c);
        assert_eq!(out.content, "<p>x</p>");
    }

    #[test]
    fn marker_presence_blocks_reinsertion() {
        let parser = ParserConfig::default();
        let tracker = InsertionTracker::new();
        let c = ctx(&parser, &tracker);
        let rule = effective(1, 5, "native", DisplayMode::AfterContent, "");
        let fragment = c.fragment(&rule);
        assert!(c.needs_insert("<p>x</p>", &rule));
        assert!(!c.needs_insert(&format!("<p>x</p>{}", fragment), &rule));
    }
}
