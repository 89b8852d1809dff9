//! Document ↔ viewport projection for overlay placement.

use crate::geometry::GeometryTracker;
use crate::stroke::PageIndex;
use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Where a page's overlay surface goes on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    pub page: PageIndex,
    /// Viewport-relative rectangle.
    pub rect: Rect,
    /// Whether enough of the page is on screen to count as intersecting.
    pub visible: bool,
}

/// Maps between document space (scroll independent) and the viewport.
///
/// The projection is a pure translation by the scroll offset, so it must be
/// refreshed on every scroll and resize even when page geometry is unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportProjector {
    scroll: Vec2,
    viewport: Size,
    threshold: f64,
}

impl Default for ViewportProjector {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl ViewportProjector {
    /// Create a projector; `threshold` is the visible fraction needed by [`Self::is_visible`].
    pub fn new(threshold: f64) -> Self {
        Self {
            scroll: Vec2::ZERO,
            viewport: Size::ZERO,
            threshold,
        }
    }

    pub fn update(&mut self, scroll: Vec2, viewport: Size) {
        self.scroll = scroll;
        self.viewport = viewport;
    }

    pub fn scroll(&self) -> Vec2 {
        self.scroll
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Document to viewport.
    pub fn transform(&self) -> Affine {
        Affine::translate(-self.scroll)
    }

    /// Viewport to document.
    pub fn inverse_transform(&self) -> Affine {
        Affine::translate(self.scroll)
    }

    pub fn document_to_viewport(&self, point: Point) -> Point {
        self.transform() * point
    }

    pub fn viewport_to_document(&self, point: Point) -> Point {
        self.inverse_transform() * point
    }

    /// Viewport-relative rectangle of a document-space rectangle.
    pub fn project_rect(&self, document_rect: Rect) -> Rect {
        document_rect - self.scroll
    }

    /// The viewport itself, in viewport coordinates.
    pub fn viewport_rect(&self) -> Rect {
        self.viewport.to_rect()
    }

    /// Whether at least `threshold` of the rectangle's area lies in the viewport.
    pub fn is_visible(&self, document_rect: Rect) -> bool {
        let area = document_rect.area();
        if area <= 0.0 {
            return false;
        }
        let overlap = self.project_rect(document_rect).intersect(self.viewport_rect()).area();
        overlap > 0.0 && overlap / area >= self.threshold
    }

    /// Page-local point for a viewport point, given the page's document rectangle.
    pub fn viewport_to_page(&self, point: Point, page_rect: Rect) -> Point {
        let doc = self.viewport_to_document(point);
        Point::new(doc.x - page_rect.x0, doc.y - page_rect.y0)
    }

    /// Viewport point for a page-local point.
    pub fn page_to_viewport(&self, point: Point, page_rect: Rect) -> Point {
        self.document_to_viewport(Point::new(point.x + page_rect.x0, point.y + page_rect.y0))
    }

    /// Placement of every page whose geometry is known.
    pub fn placements(&self, tracker: &GeometryTracker) -> Vec<OverlayPlacement> {
        tracker
            .pages()
            .iter()
            .enumerate()
            .filter_map(|(page, rect)| {
                rect.map(|rect| OverlayPlacement {
                    page,
                    rect: self.project_rect(rect),
                    visible: self.is_visible(rect),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projector(scroll_y: f64) -> ViewportProjector {
        let mut projector = ViewportProjector::new(0.1);
        projector.update(Vec2::new(0.0, scroll_y), Size::new(800.0, 600.0));
        projector
    }

    #[test]
    fn test_project_rect_subtracts_scroll() {
        let projector = projector(250.0);
        let rect = projector.project_rect(Rect::new(100.0, 300.0, 700.0, 1100.0));
        assert_eq!(rect, Rect::new(100.0, 50.0, 700.0, 850.0));
    }

    #[test]
    fn test_roundtrip_conversion() {
        let projector = projector(123.0);
        let original = Point::new(42.0, 17.0);
        let back = projector.document_to_viewport(projector.viewport_to_document(original));
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_viewport_to_page() {
        let projector = projector(500.0);
        let page = Rect::new(100.0, 816.0, 700.0, 1616.0);
        let local = projector.viewport_to_page(Point::new(110.0, 326.0), page);
        assert!((local.x - 10.0).abs() < f64::EPSILON);
        assert!((local.y - 10.0).abs() < f64::EPSILON);

        let back = projector.page_to_viewport(local, page);
        assert!((back.y - 326.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_visibility_threshold() {
        let projector = projector(0.0);
        // 1000 tall, 50 on screen: 5%.
        assert!(!projector.is_visible(Rect::new(0.0, 550.0, 600.0, 1550.0)));
        // 200 on screen: 20%.
        assert!(projector.is_visible(Rect::new(0.0, 400.0, 600.0, 1400.0)));
        assert!(!projector.is_visible(Rect::new(0.0, 700.0, 600.0, 900.0)));
        assert!(!projector.is_visible(Rect::new(0.0, 0.0, 0.0, 100.0)));
    }

    #[test]
    fn test_placements_skip_unmeasured_pages() {
        use crate::geometry::LayoutSignal;
        use crate::layout::StackedPages;
        use crate::timing::{Duration, Instant};

        let layout = StackedPages::new(Size::new(800.0, 600.0))
            .with_page(Size::new(600.0, 0.0))
            .with_page(Size::new(600.0, 400.0));
        let mut tracker = GeometryTracker::new(Duration::ZERO, Duration::from_millis(50));
        let now = Instant::now();
        tracker.notify(LayoutSignal::MarkupInjected, now);
        tracker.poll(&layout, now);

        let placements = projector(0.0).placements(&tracker);
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].page, 1);
        assert!(placements[0].visible);
    }
}
