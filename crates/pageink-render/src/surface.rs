//! Surface abstraction for per-page annotation layers.

use kurbo::Point;
use pageink_core::{OverlayPlacement, PageIndex, StrokeStyle, ToolMode};
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Surface unavailable: {0}")]
    SurfaceUnavailable(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// A raster layer covering one page, in page-local pixels.
///
/// Implementations paint non-eraser strokes with source-over blending and
/// erasers with destination-out at full opacity, both with round caps and joins.
pub trait StrokeSurface {
    /// Current size in pixels.
    fn size(&self) -> (u32, u32);

    /// Resize the layer. Contents are discarded.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;

    /// Make every pixel transparent.
    fn clear(&mut self);

    /// Stroke a polyline through `points` with `style`.
    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) -> RenderResult<()>;
}

/// Creates and positions the surfaces of a host.
pub trait SurfaceProvider {
    type Surface: StrokeSurface;

    /// Create the surface for a newly discovered page.
    fn create(&mut self, page: PageIndex) -> RenderResult<Self::Surface>;

    /// Move a surface to its viewport placement and show it.
    fn place(&mut self, _surface: &mut Self::Surface, _placement: &OverlayPlacement) {}

    /// Hide the surface of a page that currently has no geometry.
    fn hide(&mut self, _page: PageIndex, _surface: &mut Self::Surface) {}

    /// Adapt the surface to a tool mode; only drawing modes receive pointer input.
    fn set_mode(&mut self, _surface: &mut Self::Surface, _mode: ToolMode) {}
}
