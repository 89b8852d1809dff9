//! Viewport-anchored canvases, one per page.

use crate::error::AppResult;
use kurbo::Point;
use pageink_core::{OverlayPlacement, PageIndex, StrokeStyle, ToolMode};
use pageink_render::{RenderResult, RendererError, StrokeSurface, SurfaceProvider};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, PointerEvent};

/// Kind of pointer input received by a page canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Leave,
}

/// Pointer input queued for the frame loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub page: PageIndex,
    pub kind: PointerKind,
    /// Viewport coordinates.
    pub client: Point,
}

/// A page layer drawn through a 2D canvas context.
pub struct Canvas2dSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    // Store closures to prevent them from being dropped
    _listeners: Vec<Closure<dyn Fn(PointerEvent)>>,
}

impl Canvas2dSurface {
    fn style(&self, property: &str, value: &str) {
        if let Err(err) = self.canvas.style().set_property(property, value) {
            log::warn!("Failed to set canvas {}: {:?}", property, err);
        }
    }
}

impl StrokeSurface for Canvas2dSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RendererError::InvalidSize { width, height });
        }
        // Setting the size also clears the canvas.
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        Ok(())
    }

    fn clear(&mut self) {
        if let Err(err) = self.ctx.set_global_composite_operation("source-over") {
            log::warn!("Failed to reset canvas composite operation: {:?}", err);
        }
        self.ctx
            .clear_rect(0.0, 0.0, f64::from(self.canvas.width()), f64::from(self.canvas.height()));
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) -> RenderResult<()> {
        let [first, rest @ ..] = points else {
            return Ok(());
        };
        let operation = if style.is_eraser { "destination-out" } else { "source-over" };
        self.ctx
            .set_global_composite_operation(operation)
            .map_err(|err| RendererError::RenderFailed(format!("{:?}", err)))?;
        self.ctx.set_global_alpha(style.effective_opacity());
        self.ctx.set_stroke_style_str(style.color.as_str());
        self.ctx.set_line_width(style.line_width);
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");

        self.ctx.begin_path();
        self.ctx.move_to(first.x, first.y);
        for point in rest {
            self.ctx.line_to(point.x, point.y);
        }
        self.ctx.stroke();
        Ok(())
    }
}

/// Creates one fixed-position canvas per page on top of the document.
pub struct DomSurfaceProvider {
    document: Document,
    host: HtmlElement,
    inputs: Rc<RefCell<Vec<PointerInput>>>,
}

impl DomSurfaceProvider {
    pub fn new(document: Document) -> AppResult<Self> {
        let host = document
            .body()
            .ok_or_else(|| crate::error::AppError::Dom("document has no body".to_string()))?;
        Ok(Self {
            document,
            host,
            inputs: Rc::new(RefCell::new(Vec::new())),
        })
    }

    /// Take queued pointer input in arrival order.
    pub fn poll_inputs(&self) -> Vec<PointerInput> {
        std::mem::take(&mut *self.inputs.borrow_mut())
    }

    fn listen(
        &self,
        canvas: &HtmlCanvasElement,
        page: PageIndex,
        event: &str,
        kind: PointerKind,
    ) -> RenderResult<Closure<dyn Fn(PointerEvent)>> {
        let inputs = self.inputs.clone();
        let callback = Closure::wrap(Box::new(move |e: PointerEvent| {
            if kind == PointerKind::Down {
                e.prevent_default();
            }
            inputs.borrow_mut().push(PointerInput {
                page,
                kind,
                client: Point::new(f64::from(e.client_x()), f64::from(e.client_y())),
            });
        }) as Box<dyn Fn(PointerEvent)>);
        canvas
            .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            .map_err(|err| RendererError::SurfaceUnavailable(format!("{:?}", err)))?;
        Ok(callback)
    }
}

impl SurfaceProvider for DomSurfaceProvider {
    type Surface = Canvas2dSurface;

    fn create(&mut self, page: PageIndex) -> RenderResult<Canvas2dSurface> {
        let unavailable = |err: JsValue| RendererError::SurfaceUnavailable(format!("{:?}", err));
        let canvas = self
            .document
            .create_element("canvas")
            .map_err(unavailable)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| RendererError::SurfaceUnavailable("not a canvas".to_string()))?;
        let ctx = canvas
            .get_context("2d")
            .map_err(unavailable)?
            .ok_or_else(|| RendererError::SurfaceUnavailable("no 2d context".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RendererError::SurfaceUnavailable("not a 2d context".to_string()))?;

        let listeners = vec![
            self.listen(&canvas, page, "pointerdown", PointerKind::Down)?,
            self.listen(&canvas, page, "pointermove", PointerKind::Move)?,
            self.listen(&canvas, page, "pointerup", PointerKind::Up)?,
            self.listen(&canvas, page, "pointerleave", PointerKind::Leave)?,
        ];

        self.host.append_child(&canvas).map_err(unavailable)?;
        let surface = Canvas2dSurface {
            canvas,
            ctx,
            _listeners: listeners,
        };
        surface.style("position", "fixed");
        surface.style("touch-action", "none");
        surface.style("z-index", "10");
        log::debug!("Created canvas for page {}", page);
        Ok(surface)
    }

    fn place(&mut self, surface: &mut Canvas2dSurface, placement: &OverlayPlacement) {
        let rect = placement.rect;
        surface.style("left", &format!("{}px", rect.x0));
        surface.style("top", &format!("{}px", rect.y0));
        surface.style("width", &format!("{}px", rect.width()));
        surface.style("height", &format!("{}px", rect.height()));
        surface.style("display", "block");
    }

    fn hide(&mut self, page: PageIndex, surface: &mut Canvas2dSurface) {
        let shown = surface
            .canvas
            .style()
            .get_property_value("display")
            .map_or(true, |display| display != "none");
        if shown {
            log::debug!("Hiding canvas for page {}", page);
            surface.style("display", "none");
        }
    }

    fn set_mode(&mut self, surface: &mut Canvas2dSurface, mode: ToolMode) {
        surface.style("pointer-events", if mode.draws() { "auto" } else { "none" });
        surface.style("cursor", mode.cursor());
    }
}

impl Drop for Canvas2dSurface {
    fn drop(&mut self) {
        self.canvas.remove();
    }
}
