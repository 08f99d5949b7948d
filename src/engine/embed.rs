//! Template seam producing the opaque markup spliced for a placement.

use crate::placement::rules::DisplayMode;
use crate::placement::{PageType, PlacementDefinition, PositionId};

/// Where a fragment is about to be rendered.
#[derive(Debug, Clone, Copy)]
pub struct EmbedContext {
    pub page_type: PageType,
    pub display_mode: DisplayMode,
    /// Excerpt ordinal for excerpt-relative insertion.
    pub ordinal: Option<u32>,
}

/// Marker substring identifying a placement's fragment inside a buffer.
pub fn position_marker(position_id: PositionId) -> String {
    format!("data-position-id=\"{}\"", position_id)
}

/// Produces embed markup for a placement.
///
/// The engine treats the output as opaque apart from looking for
/// [`Embed::marker`] in the buffer, so every fragment must contain it.
pub trait Embed {
    fn render(&self, placement: &PlacementDefinition, ctx: &EmbedContext) -> String;

    fn marker(&self, position_id: PositionId) -> String {
        position_marker(position_id)
    }
}

impl<F> Embed for F
where
    F: Fn(&PlacementDefinition, &EmbedContext) -> String,
{
    fn render(&self, placement: &PlacementDefinition, ctx: &EmbedContext) -> String {
        self(placement, ctx)
    }
}

/// Empty container element a client-side loader fills in later.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEmbed;

impl Embed for PlaceholderEmbed {
    fn render(&self, placement: &PlacementDefinition, _ctx: &EmbedContext) -> String {
        let kind = if placement.is_video { " placement-video" } else { "" };
        format!(
            "<div id=\"placement-{id}\" class=\"placement-slot{kind}\" {marker}></div>",
            id = placement.position_id,
            kind = kind,
            marker = position_marker(placement.position_id),
        )
    }
}
