//! Insertion engine: the render cycle, its strategies and the per-request
//! session that feeds it.

pub mod embed;
pub mod pipeline;
pub mod session;
pub mod strategy;
pub mod tracker;

pub use embed::{Embed, EmbedContext, PlaceholderEmbed};
pub use pipeline::{CycleStage, RenderCycle, RenderInputs};
pub use session::PlacementSession;
