//! Placement splicing engine: decides which ad placements a page gets and
//! splices their markup into rendered HTML without breaking it.

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod net;
pub mod placement;

pub use config::{ConfigStore, JsonFileStore, MemoryStore, PlacementConfig};
pub use engine::{Embed, PlaceholderEmbed, PlacementSession, RenderCycle};
pub use error::{CatalogError, ConfigError, InsertError};
pub use placement::{PageType, PlacementId, PositionId};
