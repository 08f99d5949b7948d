//! Rule resolution.
//!
//! Turns the configured rules for one page type into the effective rule set
//! of a render:
//!
//! ```text
//! RuleStore ──▶ page type filter ──▶ catalog lookup ──▶ active exclusivity
//!           ──▶ dedup by placement ──▶ ordinal sort ──▶ Vec<EffectiveRule>
//! ```
//!
//! Bad rules are skipped one at a time with a warning; resolution never fails.

use std::collections::HashSet;

use crate::placement::rules::{DisplayMode, PlacementRule, RuleStore};
use crate::placement::{
    ActivePlacementMap, PageType, PlacementCatalog, PlacementDefinition, SelectionMode,
};

/// A rule paired with the placement it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRule {
    pub rule: PlacementRule,
    pub placement: PlacementDefinition,
}

impl EffectiveRule {
    pub fn mode(&self) -> DisplayMode {
        self.rule.display_mode
    }
}

pub fn resolve(
    page_type: PageType,
    rules: &RuleStore,
    catalog: &PlacementCatalog,
    mode: SelectionMode,
    active: &ActivePlacementMap,
) -> Vec<EffectiveRule> {
    let mut seen_placements = HashSet::new();
    let mut seen_positions = HashSet::new();
    let mut effective = Vec::new();

    for rule in rules.for_page_type(page_type) {
        if rule.display_mode == DisplayMode::Disabled {
            continue;
        }
        if rule.display_option.is_malformed() {
            log::warn!(
                "Skipping placement {} on '{}': option '{}' does not fit {:?}",
                rule.placement_id,
                page_type,
                rule.display_option,
                rule.display_mode
            );
            continue;
        }
        let Some(placement) = catalog.get(rule.placement_id) else {
            log::warn!(
                "Skipping rule for placement {}: not in catalog",
                rule.placement_id
            );
            continue;
        };

        // An active id, whether chosen by the operator or inherited, always
        // leaves a single winner for its position type.
        if let Some(active_id) = active.get(&placement.position_type) {
            if placement.position_id != active_id {
                log::debug!(
                    "Placement {} loses '{}' to active position {} ({:?})",
                    placement.id,
                    placement.position_type,
                    active_id,
                    mode
                );
                continue;
            }
        }

        if !seen_placements.insert(placement.id) || !seen_positions.insert(placement.position_id) {
            log::debug!("Dropping duplicate rule for placement {}", placement.id);
            continue;
        }

        effective.push(EffectiveRule {
            rule: rule.clone(),
            placement: placement.clone(),
        });
    }

    // Ordinal rules ascend; everything else keeps its configured order ahead of them.
    effective.sort_by_key(|e| match e.rule.display_option.index() {
        Some(n) if e.rule.display_mode.is_indexed() => (1, n),
        _ => (0, 0),
    });
    effective
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::tests::placement;
    use crate::placement::{PlacementId, PositionId};

    fn catalog() -> PlacementCatalog {
        PlacementCatalog::new(vec![
            placement(1, 100, "content_paragraph_1", "p1"),
            placement(2, 101, "content_paragraph_2", "p2"),
            placement(3, 500, "sidebar", "side_a"),
            placement(4, 501, "sidebar", "side_b"),
            placement(5, 600, "native", "native"),
        ])
    }

    fn rule(page: PageType, id: u64, mode: DisplayMode, opt: &str) -> PlacementRule {
        PlacementRule::new(page, PlacementId(id), mode, opt)
    }

    #[test]
    fn active_placement_wins_its_position_type() {
        let rules = RuleStore::from(vec![
            rule(PageType::Page, 3, DisplayMode::AfterWidget, "1"),
            rule(PageType::Page, 4, DisplayMode::AfterWidget, "2"),
        ]);
        let mut active = ActivePlacementMap::new();
        active.set("sidebar", PositionId(501));

        let out = resolve(PageType::Page, &rules, &catalog(), SelectionMode::Exclusive, &active);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].placement.position_id, PositionId(501));

        let implicit = resolve(PageType::Page, &rules, &catalog(), SelectionMode::Implicit, &active);
        assert_eq!(implicit, out);
    }

    #[test]
    fn no_active_id_keeps_every_candidate() {
        let rules = RuleStore::from(vec![
            rule(PageType::Page, 3, DisplayMode::AfterWidget, "1"),
            rule(PageType::Page, 4, DisplayMode::AfterWidget, "2"),
        ]);
        let out = resolve(
            PageType::Page,
            &rules,
            &catalog(),
            SelectionMode::Implicit,
            &ActivePlacementMap::new(),
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn filters_page_type_missing_and_malformed() {
        let rules = RuleStore::from(vec![
            rule(PageType::Post, 1, DisplayMode::AfterParagraph, "3"),
            rule(PageType::Post, 2, DisplayMode::AfterParagraph, "abc"),
            rule(PageType::Post, 99, DisplayMode::AfterParagraph, "1"),
            rule(PageType::Post, 5, DisplayMode::Disabled, ""),
            rule(PageType::Page, 2, DisplayMode::AfterParagraph, "1"),
        ]);
        let out = resolve(
            PageType::Post,
            &rules,
            &catalog(),
            SelectionMode::Implicit,
            &ActivePlacementMap::new(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].placement.id, PlacementId(1));
    }

    #[test]
    fn ordinal_rules_sort_ascending_after_others() {
        let rules = RuleStore::from(vec![
            rule(PageType::Post, 1, DisplayMode::AfterParagraph, "5"),
            rule(PageType::Post, 5, DisplayMode::AfterContent, ""),
            rule(PageType::Post, 2, DisplayMode::BeforeParagraph, "2"),
            rule(PageType::Post, 3, DisplayMode::BeforeElement, "h2"),
        ]);
        let out = resolve(
            PageType::Post,
            &rules,
            &catalog(),
            SelectionMode::Implicit,
            &ActivePlacementMap::new(),
        );
        let ids: Vec<u64> = out.iter().map(|e| e.placement.id.0).collect();
        assert_eq!(ids, vec![5, 3, 2, 1]);
    }

    #[test]
    fn empty_catalog_yields_nothing() {
        let rules = RuleStore::from(vec![rule(PageType::Post, 1, DisplayMode::AfterParagraph, "1")]);
        let out = resolve(
            PageType::Post,
            &rules,
            &PlacementCatalog::default(),
            SelectionMode::Exclusive,
            &ActivePlacementMap::new(),
        );
        assert!(out.is_empty());
    }
}
