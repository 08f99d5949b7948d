//! Error types shared across the engine.

use thiserror::Error;

use crate::placement::{PlacementId, PositionId};

/// Failure inside a single insertion strategy.
///
/// None of these escape a render cycle: the orchestrator converts every
/// variant into "keep the content as it was" plus a diagnostic.
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("protected block placeholder {0} was lost during structural parsing")]
    ProtectionFailed(usize),

    #[error("structural output collapsed from {original} to {produced} bytes")]
    LengthCollapse { original: usize, produced: usize },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Failure loading, validating or persisting placement configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown placement position {0}")]
    UnknownPosition(PositionId),

    #[error("unknown placement {0}")]
    UnknownPlacement(PlacementId),

    #[error("position {position_id} belongs to '{actual}', not '{expected}'")]
    PositionTypeMismatch {
        position_id: PositionId,
        expected: String,
        actual: String,
    },
}

/// Failure fetching the placement catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(String),

    #[error("catalog endpoint answered with status {0}")]
    Status(u16),

    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
