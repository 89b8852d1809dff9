//! Annotation session: the owner of history, geometry and capture.
//!
//! A session is driven entirely by its host: layout signals and pointer
//! input go in through `&mut self` methods stamped with the current
//! [`Instant`], and everything a renderer must react to comes out as
//! [`SessionEvent`]s collected by [`AnnotationSession::drain_events`].

use crate::capture::PageCapture;
use crate::config::SessionConfig;
use crate::geometry::{GeometryTracker, GeometryUpdate, LayoutProbe, LayoutSignal};
use crate::history::StrokeHistory;
use crate::projection::{OverlayPlacement, ViewportProjector};
use crate::stroke::{InvalidColor, PageIndex, Stroke, StrokeId, StrokeStyle};
use crate::timing::Instant;
use crate::tool::{ToolMode, ToolSettings};
use kurbo::Point;
use thiserror::Error;

/// Rejected control input. Settings are left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Line width {value} outside [{min}, {max}]")]
    LineWidthOutOfRange { value: f64, min: f64, max: f64 },
    #[error("Opacity {value} outside [{min}, {max}]")]
    OpacityOutOfRange { value: f64, min: f64, max: f64 },
    #[error(transparent)]
    Color(#[from] InvalidColor),
}

/// Result type for session controls.
pub type SessionResult<T> = Result<T, SessionError>;

/// Something the renderer has to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A stroke was committed.
    StrokeAdded(Stroke),
    /// Newest segment of a stroke in progress, in page-local coordinates.
    Segment {
        page: PageIndex,
        from: Point,
        to: Point,
        style: StrokeStyle,
    },
    /// These pages must be fully redrawn from history.
    Invalidated { pages: Vec<PageIndex> },
    /// Page geometry was recomputed and something changed.
    GeometryChanged(GeometryUpdate),
    ModeChanged(ToolMode),
}

/// One annotated document.
pub struct AnnotationSession<P: LayoutProbe> {
    probe: P,
    config: SessionConfig,
    history: StrokeHistory,
    tracker: GeometryTracker,
    projector: ViewportProjector,
    captures: Vec<PageCapture>,
    tools: ToolSettings,
    events: Vec<SessionEvent>,
}

impl<P: LayoutProbe> AnnotationSession<P> {
    pub fn new(probe: P, config: SessionConfig) -> Self {
        let tools = ToolSettings::new(config.brush.clone(), config.line_width_range, config.opacity_range);
        let mut projector = ViewportProjector::new(config.intersection_threshold);
        projector.update(probe.scroll_offset(), probe.viewport_size());
        Self {
            tracker: GeometryTracker::from_config(&config),
            probe,
            config,
            history: StrokeHistory::new(),
            projector,
            captures: Vec::new(),
            tools,
            events: Vec::new(),
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Mutable access to the layout source; follow up with [`Self::notify`].
    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &StrokeHistory {
        &self.history
    }

    pub fn tracker(&self) -> &GeometryTracker {
        &self.tracker
    }

    pub fn projector(&self) -> &ViewportProjector {
        &self.projector
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    /// Markup was (re)injected: page geometry restarts settling.
    pub fn markup_injected(&mut self, now: Instant) {
        for page in 0..self.captures.len() {
            self.finish_capture(page);
        }
        self.captures.clear();
        self.tracker.notify(LayoutSignal::MarkupInjected, now);
    }

    /// Feed a layout signal from the host.
    pub fn notify(&mut self, signal: LayoutSignal, now: Instant) {
        self.tracker.notify(signal, now);
    }

    /// Advance timers. Call once per frame.
    ///
    /// The projector is refreshed on every tick so overlays follow scrolling
    /// even when no page moved in document space.
    pub fn tick(&mut self, now: Instant) -> Option<GeometryUpdate> {
        let update = self.tracker.poll(&self.probe, now);
        self.refresh_projector();
        let update = update.filter(|update| !update.is_empty())?;
        self.apply_geometry(update.clone());
        Some(update)
    }

    pub fn set_mode(&mut self, mode: ToolMode) {
        if self.tools.mode() == mode {
            return;
        }
        if !mode.draws() {
            for page in 0..self.captures.len() {
                self.finish_capture(page);
            }
        }
        self.tools.set_mode(mode);
        log::info!("Mode set to {}", mode.name());
        self.events.push(SessionEvent::ModeChanged(mode));
    }

    pub fn set_color(&mut self, token: &str) -> SessionResult<()> {
        self.tools.set_color(token).inspect_err(|err| log::warn!("{}", err))
    }

    pub fn set_line_width(&mut self, width: f64) -> SessionResult<()> {
        self.tools.set_line_width(width).inspect_err(|err| log::warn!("{}", err))
    }

    pub fn set_opacity(&mut self, opacity: f64) -> SessionResult<()> {
        self.tools.set_opacity(opacity).inspect_err(|err| log::warn!("{}", err))
    }

    /// Undo the most recent active stroke. Returns its id.
    pub fn undo(&mut self) -> Option<StrokeId> {
        let (id, page) = self.history.undo().map(|stroke| (stroke.id(), stroke.page()))?;
        log::debug!("Undo stroke {} on page {}", id, page);
        self.events.push(SessionEvent::Invalidated { pages: vec![page] });
        Some(id)
    }

    /// Redo the next stroke of the redoable tail. Returns its id.
    pub fn redo(&mut self) -> Option<StrokeId> {
        let (id, page) = self.history.redo().map(|stroke| (stroke.id(), stroke.page()))?;
        log::debug!("Redo stroke {} on page {}", id, page);
        self.events.push(SessionEvent::Invalidated { pages: vec![page] });
        Some(id)
    }

    /// Remove every stroke from every page.
    pub fn clear(&mut self) {
        let highest = self.history.strokes().iter().map(|stroke| stroke.page() + 1).max().unwrap_or(0);
        let pages: Vec<PageIndex> = (0..highest.max(self.tracker.page_count())).collect();
        self.history.clear();
        log::info!("Cleared annotations");
        self.events.push(SessionEvent::Invalidated { pages });
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Pointer pressed on `page` at a viewport point. Returns whether a stroke began.
    ///
    /// Geometry is re-measured first so the stroke origin matches the page as
    /// currently laid out. Pages without geometry ignore input.
    pub fn pointer_down(&mut self, page: PageIndex, client: Point, now: Instant) -> bool {
        let Some(style) = self.tools.stroke_style() else {
            return false;
        };
        if !self.tracker.is_observing() {
            log::debug!("Ignoring pointer down on page {} before geometry settled", page);
            return false;
        }

        let update = self.tracker.force_measure(&self.probe, now);
        self.refresh_projector();
        if !update.is_empty() {
            self.apply_geometry(update);
        }

        let Some(rect) = self.tracker.page_rect(page) else {
            log::debug!("Page {} has no geometry, ignoring input", page);
            return false;
        };
        let local = self.projector.viewport_to_page(client, rect);
        self.ensure_captures(page + 1);
        self.captures[page].start(&mut self.history, local, rect.size(), style)
    }

    /// Pointer moved. Extends the stroke on `page` if one is in progress.
    pub fn pointer_move(&mut self, page: PageIndex, client: Point, now: Instant) {
        self.tracker.notify(LayoutSignal::PointerMove, now);
        let capturing = self.captures.get(page).is_some_and(PageCapture::is_capturing);
        if !capturing {
            return;
        }
        let Some(rect) = self.tracker.page_rect(page) else {
            return;
        };
        self.refresh_projector();
        let local = self.projector.viewport_to_page(client, rect);
        let capture = &mut self.captures[page];
        if let Some((from, to)) = capture.extend(&self.history, local) {
            let style = capture.in_progress().map(|handle| handle.style().clone()).unwrap_or_default();
            self.events.push(SessionEvent::Segment { page, from, to, style });
        }
    }

    /// Pointer released. Returns the committed stroke's id.
    pub fn pointer_up(&mut self, page: PageIndex) -> Option<StrokeId> {
        self.finish_capture(page)
    }

    /// Pointer left the page; finalizes the stroke exactly like [`Self::pointer_up`].
    pub fn pointer_leave(&mut self, page: PageIndex) -> Option<StrokeId> {
        self.finish_capture(page)
    }

    /// Where each measured page's overlay goes right now.
    pub fn overlay_placements(&self) -> Vec<OverlayPlacement> {
        self.projector.placements(&self.tracker)
    }

    /// Page under a viewport point.
    pub fn page_at(&self, client: Point) -> Option<PageIndex> {
        self.overlay_placements()
            .into_iter()
            .find(|placement| placement.rect.contains(client))
            .map(|placement| placement.page)
    }

    /// Take all events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn finish_capture(&mut self, page: PageIndex) -> Option<StrokeId> {
        let stroke = self.captures.get_mut(page)?.finish(&mut self.history)?;
        let id = stroke.id();
        self.events.push(SessionEvent::StrokeAdded(stroke));
        self.events.push(SessionEvent::Invalidated { pages: vec![page] });
        Some(id)
    }

    fn refresh_projector(&mut self) {
        self.projector.update(self.probe.scroll_offset(), self.probe.viewport_size());
    }

    fn ensure_captures(&mut self, count: usize) {
        while self.captures.len() < count {
            self.captures.push(PageCapture::new(self.captures.len()));
        }
    }

    fn apply_geometry(&mut self, update: GeometryUpdate) {
        self.ensure_captures(update.page_count);
        self.events.push(SessionEvent::GeometryChanged(update));
    }
}
