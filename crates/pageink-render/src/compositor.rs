//! Per-page compositing from history.

use crate::surface::{RenderResult, StrokeSurface};
use kurbo::{Point, Rect};
use pageink_core::{PageIndex, StrokeHistory, StrokeStyle};

/// Owns one page's surface and redraws it from history.
#[derive(Debug)]
pub struct PageCompositor<S> {
    page: PageIndex,
    surface: S,
    /// Document-space rectangle; `None` while the page has no usable geometry.
    geometry: Option<Rect>,
}

impl<S: StrokeSurface> PageCompositor<S> {
    pub fn new(page: PageIndex, surface: S) -> Self {
        Self {
            page,
            surface,
            geometry: None,
        }
    }

    pub fn page(&self) -> PageIndex {
        self.page
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn geometry(&self) -> Option<Rect> {
        self.geometry
    }

    /// Adopt new page geometry, resizing the surface to match.
    ///
    /// Losing geometry clears the surface. Returns whether the page needs a redraw.
    pub fn sync_geometry(&mut self, geometry: Option<Rect>) -> RenderResult<bool> {
        if geometry == self.geometry {
            return Ok(false);
        }
        match geometry {
            Some(rect) => {
                let width = rect.width().ceil().max(1.0) as u32;
                let height = rect.height().ceil().max(1.0) as u32;
                if self.surface.size() != (width, height) {
                    log::debug!("Resizing page {} surface to {}x{}", self.page, width, height);
                    self.surface.resize(width, height)?;
                }
            }
            None => {
                log::debug!("Page {} lost its geometry", self.page);
                self.surface.clear();
            }
        }
        self.geometry = geometry;
        Ok(true)
    }

    /// Clear and repaint every active stroke of this page in commit order.
    ///
    /// Returns how many strokes were drawn. Pages without geometry are left blank.
    pub fn redraw(&mut self, history: &StrokeHistory) -> RenderResult<usize> {
        self.surface.clear();
        if self.geometry.is_none() {
            return Ok(0);
        }
        let mut drawn = 0;
        for stroke in history.page_strokes(self.page) {
            if !stroke.is_drawable() {
                continue;
            }
            self.surface.stroke_polyline(stroke.points(), stroke.style())?;
            drawn += 1;
        }
        Ok(drawn)
    }

    /// Paint the newest segment of a stroke in progress.
    pub fn draw_segment(&mut self, from: Point, to: Point, style: &StrokeStyle) -> RenderResult<()> {
        if self.geometry.is_none() {
            return Ok(());
        }
        self.surface.stroke_polyline(&[from, to], style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixmap::PixmapSurface;
    use pageink_core::{BrushColor, StrokeId};

    fn style(color: &str, width: f64, is_eraser: bool) -> StrokeStyle {
        StrokeStyle {
            color: BrushColor::parse(color).unwrap(),
            line_width: width,
            opacity: 1.0,
            is_eraser,
        }
    }

    fn commit(history: &mut StrokeHistory, page: PageIndex, y: f64, style: StrokeStyle) -> StrokeId {
        let mut handle = history.begin_stroke(Point::new(10.0, y), page, style);
        history.append_point(&mut handle, Point::new(90.0, y));
        history.commit_stroke(handle).map(|s| s.id()).unwrap()
    }

    fn compositor(page: PageIndex) -> PageCompositor<PixmapSurface> {
        let mut compositor = PageCompositor::new(page, PixmapSurface::new());
        compositor.sync_geometry(Some(Rect::new(100.0, 16.0, 200.0, 116.0))).unwrap();
        compositor
    }

    fn red_at(compositor: &PageCompositor<PixmapSurface>, x: u32, y: u32) -> (u8, u8) {
        let pixel = compositor.surface().pixmap().unwrap().pixel(x, y).unwrap().demultiply();
        (pixel.red(), pixel.alpha())
    }

    #[test]
    fn test_sync_geometry_resizes() {
        let mut compositor = PageCompositor::new(0, PixmapSurface::new());
        assert!(compositor.sync_geometry(Some(Rect::new(0.0, 0.0, 99.5, 40.0))).unwrap());
        assert_eq!(compositor.surface().size(), (100, 40));
        assert!(!compositor.sync_geometry(Some(Rect::new(0.0, 0.0, 99.5, 40.0))).unwrap());
        // Moving without resizing still needs a redraw.
        assert!(compositor.sync_geometry(Some(Rect::new(0.0, 10.0, 99.5, 50.0))).unwrap());
        assert_eq!(compositor.surface().size(), (100, 40));
    }

    #[test]
    fn test_eraser_after_paint_then_paint_again() {
        // A pencil, B eraser over A, C pencil over both: C shows.
        let mut history = StrokeHistory::new();
        commit(&mut history, 0, 50.0, style("#0000ff", 10.0, false));
        commit(&mut history, 0, 50.0, style("#000000", 20.0, true));
        commit(&mut history, 0, 50.0, style("#ff0000", 10.0, false));

        let mut compositor = compositor(0);
        assert_eq!(compositor.redraw(&history).unwrap(), 3);
        assert_eq!(red_at(&compositor, 50, 50), (255, 255));
    }

    #[test]
    fn test_eraser_last_erases_everything_below() {
        // A pencil, C pencil, B eraser: nothing left.
        let mut history = StrokeHistory::new();
        commit(&mut history, 0, 50.0, style("#0000ff", 10.0, false));
        commit(&mut history, 0, 50.0, style("#ff0000", 10.0, false));
        commit(&mut history, 0, 50.0, style("#000000", 20.0, true));

        let mut compositor = compositor(0);
        compositor.redraw(&history).unwrap();
        assert_eq!(red_at(&compositor, 50, 50).1, 0);
    }

    #[test]
    fn test_undo_of_eraser_restores_ink() {
        let mut history = StrokeHistory::new();
        commit(&mut history, 0, 50.0, style("#ff0000", 10.0, false));
        commit(&mut history, 0, 50.0, style("#000000", 20.0, true));
        let mut compositor = compositor(0);
        compositor.redraw(&history).unwrap();
        assert_eq!(red_at(&compositor, 50, 50).1, 0);

        history.undo();
        compositor.redraw(&history).unwrap();
        assert_eq!(red_at(&compositor, 50, 50), (255, 255));
    }

    #[test]
    fn test_only_own_page_is_drawn() {
        let mut history = StrokeHistory::new();
        commit(&mut history, 0, 20.0, style("#ff0000", 4.0, false));
        commit(&mut history, 1, 60.0, style("#ff0000", 4.0, false));
        // An eraser on another page must not touch this one.
        commit(&mut history, 1, 20.0, style("#000000", 30.0, true));

        let mut compositor = compositor(0);
        assert_eq!(compositor.redraw(&history).unwrap(), 1);
        assert_eq!(red_at(&compositor, 50, 20).1, 255);
        assert_eq!(red_at(&compositor, 50, 60).1, 0);
    }

    #[test]
    fn test_no_geometry_no_render() {
        let mut history = StrokeHistory::new();
        commit(&mut history, 0, 20.0, StrokeStyle::default());
        let mut compositor = PageCompositor::new(0, PixmapSurface::new());
        assert_eq!(compositor.redraw(&history).unwrap(), 0);
        assert!(
            compositor
                .draw_segment(Point::ZERO, Point::new(5.0, 5.0), &StrokeStyle::default())
                .is_ok()
        );
    }

    #[test]
    fn test_losing_geometry_clears_surface() {
        let mut history = StrokeHistory::new();
        commit(&mut history, 0, 50.0, style("#ff0000", 10.0, false));
        let mut compositor = compositor(0);
        compositor.redraw(&history).unwrap();
        assert_eq!(red_at(&compositor, 50, 50).1, 255);

        assert!(compositor.sync_geometry(None).unwrap());
        assert_eq!(red_at(&compositor, 50, 50).1, 0);
        assert_eq!(compositor.redraw(&history).unwrap(), 0);
        assert_eq!(red_at(&compositor, 50, 50).1, 0);
    }

    #[test]
    fn test_draw_segment() {
        let mut compositor = compositor(0);
        compositor
            .draw_segment(Point::new(10.0, 30.0), Point::new(50.0, 30.0), &style("#ff0000", 6.0, false))
            .unwrap();
        assert_eq!(red_at(&compositor, 30, 30), (255, 255));
    }
}
