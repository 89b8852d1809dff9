//! Wires a session to one compositor per page.

use crate::compositor::PageCompositor;
use crate::surface::{RenderResult, SurfaceProvider};
use pageink_core::{AnnotationSession, Instant, LayoutProbe, PageIndex, SessionEvent};
use std::collections::BTreeSet;

/// A session together with the surfaces that display it.
pub struct AnnotationOverlay<P: LayoutProbe, R: SurfaceProvider> {
    session: AnnotationSession<P>,
    provider: R,
    compositors: Vec<PageCompositor<R::Surface>>,
}

impl<P: LayoutProbe, R: SurfaceProvider> AnnotationOverlay<P, R> {
    pub fn new(session: AnnotationSession<P>, provider: R) -> Self {
        Self {
            session,
            provider,
            compositors: Vec::new(),
        }
    }

    pub fn session(&self) -> &AnnotationSession<P> {
        &self.session
    }

    /// Controls and input go through the session; call [`Self::flush`] afterwards.
    pub fn session_mut(&mut self) -> &mut AnnotationSession<P> {
        &mut self.session
    }

    pub fn provider(&self) -> &R {
        &self.provider
    }

    pub fn compositor(&self, page: PageIndex) -> Option<&PageCompositor<R::Surface>> {
        self.compositors.get(page)
    }

    pub fn compositors(&self) -> &[PageCompositor<R::Surface>] {
        &self.compositors
    }

    /// Advance the session's timers, then apply everything it produced.
    pub fn pump(&mut self, now: Instant) -> RenderResult<()> {
        self.session.tick(now);
        self.flush()
    }

    /// Apply pending session events to the surfaces and re-place them.
    pub fn flush(&mut self) -> RenderResult<()> {
        let mut dirty = BTreeSet::new();

        for event in self.session.drain_events() {
            match event {
                SessionEvent::Segment { page, from, to, style } => {
                    if let Some(compositor) = self.compositors.get_mut(page) {
                        compositor.draw_segment(from, to, &style)?;
                    }
                }
                SessionEvent::Invalidated { pages } => dirty.extend(pages),
                SessionEvent::GeometryChanged(update) => {
                    self.ensure_compositors(update.page_count)?;
                    for (page, compositor) in self.compositors.iter_mut().enumerate() {
                        let rect = self.session.tracker().page_rect(page);
                        if compositor.sync_geometry(rect)? {
                            dirty.insert(page);
                        }
                    }
                }
                SessionEvent::ModeChanged(mode) => {
                    for compositor in &mut self.compositors {
                        self.provider.set_mode(compositor.surface_mut(), mode);
                    }
                }
                // Followed by an invalidation of its page.
                SessionEvent::StrokeAdded(_) => {}
            }
        }

        for page in dirty {
            if let Some(compositor) = self.compositors.get_mut(page) {
                compositor.redraw(self.session.history())?;
            }
        }

        for placement in self.session.overlay_placements() {
            if let Some(compositor) = self.compositors.get_mut(placement.page) {
                self.provider.place(compositor.surface_mut(), &placement);
            }
        }
        for compositor in &mut self.compositors {
            if compositor.geometry().is_none() {
                let page = compositor.page();
                self.provider.hide(page, compositor.surface_mut());
            }
        }
        Ok(())
    }

    fn ensure_compositors(&mut self, count: usize) -> RenderResult<()> {
        let mode = self.session.tools().mode();
        while self.compositors.len() < count {
            let page = self.compositors.len();
            let mut surface = self.provider.create(page)?;
            self.provider.set_mode(&mut surface, mode);
            self.compositors.push(PageCompositor::new(page, surface));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixmap::{PixmapProvider, PixmapSurface};
    use crate::surface::StrokeSurface;
    use kurbo::{Point, Size};
    use pageink_core::{Duration, LayoutSignal, OverlayPlacement, SessionConfig, StackedPages, StrokeId, ToolMode};

    type Overlay<R = PixmapProvider> = AnnotationOverlay<StackedPages, R>;

    /// Records which pages were placed and hidden, and the modes applied.
    #[derive(Debug, Default)]
    struct TrackingProvider {
        placed: Vec<PageIndex>,
        hidden: Vec<PageIndex>,
        modes: Vec<ToolMode>,
    }

    impl SurfaceProvider for TrackingProvider {
        type Surface = PixmapSurface;

        fn create(&mut self, _page: PageIndex) -> RenderResult<PixmapSurface> {
            Ok(PixmapSurface::new())
        }

        fn place(&mut self, _surface: &mut PixmapSurface, placement: &OverlayPlacement) {
            self.placed.push(placement.page);
        }

        fn hide(&mut self, page: PageIndex, _surface: &mut PixmapSurface) {
            self.hidden.push(page);
        }

        fn set_mode(&mut self, _surface: &mut PixmapSurface, mode: ToolMode) {
            self.modes.push(mode);
        }
    }

    fn settled(pages: usize) -> (Overlay, Instant) {
        settled_with(pages, PixmapProvider)
    }

    fn settled_with<R: SurfaceProvider>(pages: usize, provider: R) -> (Overlay<R>, Instant) {
        let mut layout = StackedPages::new(Size::new(800.0, 600.0));
        for _ in 0..pages {
            layout.push_page(Size::new(200.0, 200.0));
        }
        let mut overlay = AnnotationOverlay::new(AnnotationSession::new(layout, SessionConfig::default()), provider);
        let start = Instant::now();
        overlay.session_mut().markup_injected(start);
        let now = start + Duration::from_millis(500);
        overlay.pump(now).unwrap();
        (overlay, now)
    }

    /// Horizontal stroke across `page` at page-local height `y`.
    fn draw<R: SurfaceProvider>(overlay: &mut Overlay<R>, page: PageIndex, y: f64, now: Instant) -> Option<StrokeId> {
        let rect = overlay.session().tracker().page_rect(page).unwrap();
        let projector = *overlay.session().projector();
        let session = overlay.session_mut();
        session.pointer_down(page, projector.page_to_viewport(Point::new(20.0, y), rect), now);
        session.pointer_move(page, projector.page_to_viewport(Point::new(100.0, y), rect), now);
        session.pointer_move(page, projector.page_to_viewport(Point::new(180.0, y), rect), now);
        let id = session.pointer_up(page);
        overlay.flush().unwrap();
        id
    }

    fn alpha<R: SurfaceProvider<Surface = PixmapSurface>>(overlay: &Overlay<R>, page: PageIndex, x: u32, y: u32) -> u8 {
        overlay.compositor(page).map_or(0, |c| c.surface().alpha_at(x, y))
    }

    fn resize_page<R: SurfaceProvider>(overlay: &mut Overlay<R>, page: PageIndex, size: Size, now: Instant) {
        overlay.session_mut().probe_mut().set_page_size(page, size);
        overlay.session_mut().notify(LayoutSignal::Resize, now);
        overlay.pump(now).unwrap();
    }

    #[test]
    fn test_surfaces_follow_pages() {
        let (overlay, _) = settled(3);
        assert_eq!(overlay.compositors().len(), 3);
        for compositor in overlay.compositors() {
            assert_eq!(compositor.surface().size(), (200, 200));
        }
    }

    #[test]
    fn test_stroke_renders_on_its_page_only() {
        let (mut overlay, now) = settled(2);
        draw(&mut overlay, 1, 50.0, now).unwrap();
        assert_eq!(alpha(&overlay, 1, 100, 50), 255);
        assert_eq!(alpha(&overlay, 0, 100, 50), 0);
    }

    #[test]
    fn test_undo_redo_clear_redraw() {
        let (mut overlay, now) = settled(2);
        draw(&mut overlay, 0, 50.0, now);
        draw(&mut overlay, 1, 80.0, now);

        overlay.session_mut().undo();
        overlay.flush().unwrap();
        assert_eq!(alpha(&overlay, 1, 100, 80), 0);
        assert_eq!(alpha(&overlay, 0, 100, 50), 255);

        overlay.session_mut().redo();
        overlay.flush().unwrap();
        assert_eq!(alpha(&overlay, 1, 100, 80), 255);

        overlay.session_mut().clear();
        overlay.flush().unwrap();
        assert_eq!(alpha(&overlay, 0, 100, 50), 0);
        assert_eq!(alpha(&overlay, 1, 100, 80), 0);
    }

    #[test]
    fn test_interleaved_pages_scenario() {
        let (mut overlay, now) = settled(2);
        let ids: Vec<StrokeId> = [0, 1, 0, 1, 0]
            .into_iter()
            .enumerate()
            .map(|(i, page)| draw(&mut overlay, page, 20.0 + 30.0 * i as f64, now).unwrap())
            .collect();
        assert_eq!(ids, (0..5).map(StrokeId).collect::<Vec<_>>());

        overlay.session_mut().undo();
        overlay.session_mut().undo();
        overlay.flush().unwrap();

        let history = overlay.session().history();
        assert_eq!(history.cursor(), Some(2));
        let chrono: Vec<StrokeId> = history.chronological().map(|e| e.id).collect();
        assert_eq!(chrono, vec![StrokeId(0), StrokeId(1), StrokeId(2)]);
        let page0: Vec<StrokeId> = history.page_strokes(0).map(|s| s.id()).collect();
        assert_eq!(page0, vec![StrokeId(0), StrokeId(2)]);

        // Strokes 0 and 2 on page 0, stroke 4 undone.
        assert_eq!(alpha(&overlay, 0, 100, 20), 255);
        assert_eq!(alpha(&overlay, 0, 100, 80), 255);
        assert_eq!(alpha(&overlay, 0, 100, 140), 0);
        // Stroke 3 undone on page 1.
        assert_eq!(alpha(&overlay, 1, 100, 110), 0);

        assert_eq!(overlay.session_mut().redo(), Some(StrokeId(3)));
        overlay.flush().unwrap();
        assert_eq!(alpha(&overlay, 1, 100, 110), 255);
    }

    #[test]
    fn test_eraser_through_session() {
        let (mut overlay, now) = settled(1);
        draw(&mut overlay, 0, 50.0, now);
        overlay.session_mut().set_line_width(20.0).unwrap();
        overlay.session_mut().set_mode(ToolMode::Eraser);
        draw(&mut overlay, 0, 50.0, now);
        assert_eq!(alpha(&overlay, 0, 100, 50), 0);

        overlay.session_mut().undo();
        overlay.flush().unwrap();
        assert_eq!(alpha(&overlay, 0, 100, 50), 255);
    }

    #[test]
    fn test_page_resize_redraws() {
        let (mut overlay, now) = settled(1);
        draw(&mut overlay, 0, 50.0, now);

        resize_page(&mut overlay, 0, Size::new(300.0, 250.0), now + Duration::from_millis(100));

        let surface: &PixmapSurface = overlay.compositor(0).unwrap().surface();
        assert_eq!(surface.size(), (300, 250));
        assert_eq!(surface.alpha_at(100, 50), 255);
    }

    #[test]
    fn test_mode_changes_reach_every_surface() {
        let (mut overlay, _) = settled_with(2, TrackingProvider::default());
        assert_eq!(overlay.provider().modes, vec![ToolMode::Pencil, ToolMode::Pencil]);

        overlay.session_mut().set_mode(ToolMode::Cursor);
        overlay.flush().unwrap();
        assert_eq!(&overlay.provider().modes[2..], &[ToolMode::Cursor, ToolMode::Cursor]);
    }

    #[test]
    fn test_page_losing_geometry_is_cleared_and_hidden() {
        let (mut overlay, now) = settled_with(2, TrackingProvider::default());
        draw(&mut overlay, 0, 50.0, now).unwrap();
        assert_eq!(alpha(&overlay, 0, 100, 50), 255);
        assert!(overlay.provider().hidden.is_empty());

        // A zero-area container has no usable geometry.
        resize_page(&mut overlay, 0, Size::new(200.0, 0.0), now + Duration::from_millis(100));
        assert!(overlay.compositor(0).unwrap().geometry().is_none());
        assert_eq!(alpha(&overlay, 0, 100, 50), 0);
        assert_eq!(overlay.provider().hidden, vec![0]);
        assert_eq!(overlay.session().history().page_strokes(0).count(), 1);

        overlay.session_mut().undo();
        overlay.flush().unwrap();
        overlay.session_mut().redo();
        overlay.flush().unwrap();
        assert_eq!(alpha(&overlay, 0, 100, 50), 0);

        // Geometry coming back repaints the page and places it again.
        let placed_before = overlay.provider().placed.iter().filter(|page| **page == 0).count();
        resize_page(&mut overlay, 0, Size::new(200.0, 200.0), now + Duration::from_millis(200));
        assert_eq!(alpha(&overlay, 0, 100, 50), 255);
        let placed_after = overlay.provider().placed.iter().filter(|page| **page == 0).count();
        assert!(placed_after > placed_before);
    }
}
