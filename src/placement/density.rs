//! Automatic placement density.
//!
//! Each level maps to a fixed sequence of zero-based unit indices. The
//! sequences are a contract, pinned by golden tests below.

use serde::{Deserialize, Serialize};

/// Indices stop below this bound at every level.
pub const MAX_UNIT_INDEX: usize = 102;

/// Density level 1 (sparsest) to 5 (densest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct DensityLevel(u8);

impl DensityLevel {
    pub const LOWEST: DensityLevel = DensityLevel(1);
    pub const MODERATE: DensityLevel = DensityLevel(3);
    pub const HIGHEST: DensityLevel = DensityLevel(5);

    /// Out-of-range input falls back to the moderate level.
    pub fn new(level: i64) -> Self {
        match level {
            1..=5 => DensityLevel(level as u8),
            _ => Self::MODERATE,
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based unit indices for this level.
    pub fn indices(self) -> Vec<usize> {
        match self.0 {
            5 => (0..MAX_UNIT_INDEX).collect(),
            4 => (0..MAX_UNIT_INDEX).step_by(2).collect(),
            2 => [0, 2, 5]
                .into_iter()
                .chain((8..MAX_UNIT_INDEX).step_by(4))
                .collect(),
            1 => (0..MAX_UNIT_INDEX).step_by(5).collect(),
            _ => [0, 2, 4]
                .into_iter()
                .chain((6..MAX_UNIT_INDEX).step_by(3))
                .collect(),
        }
    }
}

impl Default for DensityLevel {
    fn default() -> Self {
        Self::MODERATE
    }
}

impl From<i64> for DensityLevel {
    fn from(level: i64) -> Self {
        DensityLevel::new(level)
    }
}

impl From<DensityLevel> for i64 {
    fn from(level: DensityLevel) -> Self {
        level.0 as i64
    }
}

/// Unit indices for a raw level; see [`DensityLevel::indices`].
pub fn density_indices(level: i64) -> Vec<usize> {
    DensityLevel::new(level).indices()
}
