use std::collections::BTreeSet;

use crate::placement::PositionId;

/// Positions already spliced during one render cycle.
///
/// One tracker belongs to one request; it is never shared between renders.
#[derive(Debug, Clone, Default)]
pub struct InsertionTracker {
    inserted: BTreeSet<PositionId>,
}

impl InsertionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_inserted(&self, position_id: PositionId) -> bool {
        self.inserted.contains(&position_id)
    }

    pub fn mark_inserted(&mut self, position_id: PositionId) {
        if self.inserted.insert(position_id) {
            log::debug!("Position {} inserted", position_id);
        }
    }

    pub fn reset(&mut self) {
        self.inserted.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = PositionId> + '_ {
        self.inserted.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.inserted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
    }
}
