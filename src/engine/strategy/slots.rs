//! Slot-list insertion: interleaves placement references into an ordered
//! list of widget slots instead of touching markup.

use std::collections::HashSet;

use crate::placement::resolve::EffectiveRule;
use crate::placement::rules::{DisplayMode, DisplayOption};
use crate::placement::PositionId;

/// Prefix of references this strategy generates.
pub const SYNTHETIC_SLOT_PREFIX: &str = "placement-slot-";

/// Prefix of references an operator placed by hand as a widget.
pub const MANUAL_SLOT_PREFIX: &str = "placement-widget-";

/// Position types allowed to land past the last existing slot.
pub const APPENDABLE_POSITION_TYPES: &[&str] = &["sidebar_bottom", "sidebar_floating"];

pub fn synthetic_slot(position_id: PositionId) -> String {
    format!("{}{}", SYNTHETIC_SLOT_PREFIX, position_id)
}

fn manual_position(slot: &str) -> Option<PositionId> {
    slot.strip_prefix(MANUAL_SLOT_PREFIX)?
        .parse::<u64>()
        .ok()
        .map(PositionId)
}

/// Ordered slot references of one named container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotList {
    pub container: String,
    pub slots: Vec<String>,
}

impl SlotList {
    pub fn new(container: impl Into<String>, slots: Vec<String>) -> Self {
        Self {
            container: container.into(),
            slots,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOutput {
    pub slots: Vec<String>,
    pub inserted: Vec<PositionId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlotStrategy;

impl SlotStrategy {
    pub fn handles(&self, mode: DisplayMode) -> bool {
        mode == DisplayMode::AfterWidget
    }

    pub fn apply(&self, list: &SlotList, rules: &[&EffectiveRule]) -> SlotOutput {
        // Earlier passes' references are recomputed from scratch.
        let base: Vec<&String> = list
            .slots
            .iter()
            .filter(|s| !s.starts_with(SYNTHETIC_SLOT_PREFIX))
            .collect();
        let manual: HashSet<PositionId> = base.iter().filter_map(|s| manual_position(s)).collect();

        // after[i] holds references going right after base slot i; index
        // base.len() collects appended ones.
        let mut after: Vec<Vec<String>> = vec![Vec::new(); base.len() + 1];
        let mut placed = HashSet::new();
        let mut inserted = Vec::new();

        for rule in rules.iter().filter(|r| self.handles(r.mode())) {
            let DisplayOption::Slot { container, position } = &rule.rule.display_option else {
                continue;
            };
            if container.as_deref().is_some_and(|c| c != list.container) {
                continue;
            }
            let position_id = rule.placement.position_id;
            if manual.contains(&position_id) {
                log::debug!(
                    "Position {} already placed as a widget in '{}'",
                    position_id,
                    list.container
                );
                continue;
            }
            if !placed.insert(position_id) {
                continue;
            }

            let appendable = APPENDABLE_POSITION_TYPES.contains(&rule.placement.position_type.as_str());
            let anchor = match *position {
                Some(n) if n >= 1 && (n as usize) <= base.len() => n as usize - 1,
                _ if appendable => base.len(),
                Some(n) => {
                    log::warn!(
                        "Container '{}' has {} slots; position {} skipped for placement {}",
                        list.container,
                        base.len(),
                        n,
                        rule.placement.id
                    );
                    continue;
                }
                None => {
                    log::debug!(
                        "Placement {} has no slot position and cannot append",
                        rule.placement.id
                    );
                    continue;
                }
            };
            after[anchor].push(synthetic_slot(position_id));
            inserted.push(position_id);
        }

        let appended = after.pop().unwrap_or_default();
        let mut slots = Vec::with_capacity(base.len() + inserted.len());
        for (slot, extra) in base.into_iter().zip(after) {
            slots.push(slot.clone());
            slots.extend(extra);
        }
        slots.extend(appended);

        SlotOutput { slots, inserted }
    }
}
