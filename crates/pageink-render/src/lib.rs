//! PageInk Render Library
//!
//! Per-page annotation surfaces and the compositing that keeps them in
//! step with a session's history. The default surface rasterizes with
//! tiny-skia; hosts plug in their own through [`SurfaceProvider`].

mod compositor;
mod overlay;
mod pixmap;
mod surface;

pub use compositor::PageCompositor;
pub use overlay::AnnotationOverlay;
pub use pixmap::{PixmapProvider, PixmapSurface};
pub use surface::{RenderResult, RendererError, StrokeSurface, SurfaceProvider};
