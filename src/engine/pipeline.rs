use std::collections::BTreeSet;

use crate::engine::embed::Embed;
use crate::engine::strategy::excerpt::ExcerptStrategy;
use crate::engine::strategy::native::NativeStrategy;
use crate::engine::strategy::selector::{ScraperSplicer, SelectorStrategy};
use crate::engine::strategy::slots::{SlotList, SlotStrategy};
use crate::engine::strategy::unit::UnitStrategy;
use crate::engine::strategy::{run_guarded, Strategy, StrategyContext, StrategyOutput};
use crate::engine::tracker::InsertionTracker;
use crate::placement::resolve::{resolve, EffectiveRule};
use crate::placement::rules::{ParserConfig, RuleStore};
use crate::placement::{PageType, PlacementCatalog, PlacementSelection, PositionId};

/// Progress of one render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleStage {
    NotStarted,
    RulesResolved,
    UnitsParsed,
    StrategiesApplied,
    Done,
}

/// Everything a render cycle reads but never changes.
#[derive(Clone, Copy)]
pub struct RenderInputs<'a> {
    pub catalog: &'a PlacementCatalog,
    pub rules: &'a RuleStore,
    pub selection: &'a PlacementSelection,
    pub parser: &'a ParserConfig,
}

/// The insertion engine for one page render:
/// Resolve rules (once) → Selector → Unit → Native, each behind one guard.
///
/// A cycle owns its tracker; build one per request and drop it afterwards.
pub struct RenderCycle<'a> {
    page_type: PageType,
    inputs: RenderInputs<'a>,
    embed: &'a dyn Embed,
    tracker: InsertionTracker,
    /// Positions spliced into main content. Excerpt and slot insertions
    /// never show up in a content buffer, so they stay out of this set.
    content_positions: BTreeSet<PositionId>,
    effective: Option<Vec<EffectiveRule>>,
    stage: CycleStage,
    /// Content strategies in the order they run.
    content_chain: Vec<Box<dyn Strategy>>,
}

impl<'a> RenderCycle<'a> {
    pub fn new(page_type: PageType, inputs: RenderInputs<'a>, embed: &'a dyn Embed) -> Self {
        Self {
            page_type,
            inputs,
            embed,
            tracker: InsertionTracker::new(),
            content_positions: BTreeSet::new(),
            effective: None,
            stage: CycleStage::NotStarted,
            content_chain: vec![
                Box::new(SelectorStrategy::<ScraperSplicer>::default()),
                Box::new(UnitStrategy),
                Box::new(NativeStrategy),
            ],
        }
    }

    /// Replace the content strategy chain.
    pub fn with_content_chain(mut self, chain: Vec<Box<dyn Strategy>>) -> Self {
        self.content_chain = chain;
        self
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    pub fn stage(&self) -> CycleStage {
        self.stage
    }

    pub fn tracker(&self) -> &InsertionTracker {
        &self.tracker
    }

    /// Effective rules for this page, resolved on first use.
    pub fn effective_rules(&mut self) -> &[EffectiveRule] {
        self.ensure_resolved();
        self.effective.as_deref().unwrap_or(&[])
    }

    fn ensure_resolved(&mut self) {
        if self.effective.is_some() {
            return;
        }
        let rules = resolve(
            self.page_type,
            self.inputs.rules,
            self.inputs.catalog,
            self.inputs.selection.mode,
            &self.inputs.selection.active,
        );
        log::debug!(
            "Resolved {} effective rules for '{}' page",
            rules.len(),
            self.page_type
        );
        self.effective = Some(rules);
        self.advance(CycleStage::RulesResolved);
    }

    fn advance(&mut self, stage: CycleStage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }

    /// Whether every placement this cycle spliced into content is still
    /// marked in `content`, meaning this is a duplicate pass.
    fn already_satisfied(&self, content: &str) -> bool {
        !self.content_positions.is_empty()
            && self
                .content_positions
                .iter()
                .all(|id| content.contains(&self.embed.marker(*id)))
    }

    fn commit(&mut self, output: &StrategyOutput) {
        for id in &output.inserted {
            self.tracker.mark_inserted(*id);
        }
    }

    /// Splice placements into the main content of the page.
    pub fn filter_content(&mut self, content: &str) -> String {
        self.ensure_resolved();
        if content.is_empty() || self.already_satisfied(content) {
            return content.to_string();
        }
        if self.effective.as_ref().map_or(true, |r| r.is_empty()) {
            return content.to_string();
        }
        self.advance(CycleStage::UnitsParsed);

        let rules: Vec<&EffectiveRule> = self.effective.iter().flatten().collect();

        let ctx = StrategyContext {
            page_type: self.page_type,
            parser: self.inputs.parser,
            embed: self.embed,
            tracker: &self.tracker,
            excerpt_ordinal: None,
        };
        let mut current = content.to_string();
        let mut inserted = Vec::new();
        for strategy in &self.content_chain {
            let out = run_guarded(strategy.as_ref(), &current, &rules, &ctx);
            current = out.content;
            inserted.extend(out.inserted);
        }

        let result = if current.len() < content.len() {
            log::warn!("Content shrank during insertion; returning it unmodified");
            StrategyOutput::unchanged(content)
        } else {
            StrategyOutput {
                content: current,
                inserted,
            }
        };
        self.commit(&result);
        self.content_positions.extend(result.inserted.iter().copied());
        self.advance(CycleStage::StrategiesApplied);
        result.content
    }

    /// Splice placements into the `ordinal`-th excerpt (1-based) of the page.
    pub fn filter_excerpt(&mut self, excerpt: &str, ordinal: u32) -> String {
        self.ensure_resolved();
        let rules: Vec<&EffectiveRule> = self.effective.iter().flatten().collect();
        let ctx = StrategyContext {
            page_type: self.page_type,
            parser: self.inputs.parser,
            embed: self.embed,
            tracker: &self.tracker,
            excerpt_ordinal: Some(ordinal),
        };
        let out = run_guarded(&ExcerptStrategy, excerpt, &rules, &ctx);
        self.commit(&out);
        self.advance(CycleStage::StrategiesApplied);
        out.content
    }

    /// Interleave placement references into a widget container's slots.
    pub fn filter_slots(&mut self, list: &SlotList) -> Vec<String> {
        self.ensure_resolved();
        let rules: Vec<&EffectiveRule> = self.effective.iter().flatten().collect();
        let out = SlotStrategy.apply(list, &rules);
        for id in &out.inserted {
            self.tracker.mark_inserted(*id);
        }
        self.advance(CycleStage::StrategiesApplied);
        out.slots
    }

    /// End the cycle, handing back what was inserted.
    pub fn finish(mut self) -> InsertionTracker {
        self.advance(CycleStage::Done);
        log::debug!(
            "Render cycle for '{}' done with {} placements",
            self.page_type,
            self.tracker.len()
        );
        self.tracker
    }
}
